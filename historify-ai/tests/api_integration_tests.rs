//! Integration tests for historify-ai API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use helpers::{create_test_app, png_bytes};
use historify_ai::models::AnalysisRecord;

const BOUNDARY: &str = "historify-test-boundary";

fn multipart_body(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn moon_response() -> Value {
    json!({
        "title": "Apollo 11 Moon Landing",
        "event": "Apollo 11",
        "location_name": "Sea of Tranquility, Moon",
        "year": 1969,
        "ai_generated_probability": 90
    })
}

#[tokio::test]
async fn test_health_reports_backend() {
    let (app, _state, _dir) = create_test_app(vec![]).await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "historify-ai");
    assert_eq!(body["backend"], "SQLite");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_analyze_then_browse() {
    let (app, _state, _dir) = create_test_app(vec![moon_response()]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(&[
            ("moon.png", png_bytes(40, 30)),
            ("notes.txt", b"not an image".to_vec()),
        ])))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let items = body_json(response).await;
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["image_index"], 1);
    assert_eq!(items[0]["image_name"], "moon.png");
    assert_eq!(items[0]["title"], "Apollo 11 Moon Landing");
    assert_eq!(items[0]["year"], 1969);
    assert!(items[0]["image_url"].as_str().unwrap().starts_with("https://storage.test/Analysis/"));
    assert_eq!(items[1]["title"], "Analysis Error");
    assert_eq!(items[1]["year"], "Unknown");

    let id = items[0]["database_id"].as_i64().unwrap();

    let history = body_json(get(&app, "/history").await).await;
    assert_eq!(history.as_array().unwrap().len(), 2);

    let hits = body_json(get(&app, "/search?q=tranquility").await).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["id"], id);

    let record = body_json(get(&app, &format!("/records/{}", id)).await).await;
    assert_eq!(record["event"], "Apollo 11");

    let stats = body_json(get(&app, "/stats").await).await;
    assert_eq!(stats["database_type"], "SQLite");
    assert_eq!(stats["total_records"], 2);
    assert_eq!(stats["likely_ai_generated"], 1);
    assert_eq!(stats["records_by_year"]["1969"], 1);
}

#[tokio::test]
async fn test_analyze_keeps_empty_upload_as_error_item() {
    let (app, _state, _dir) = create_test_app(vec![moon_response()]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(&[
            ("a.png", png_bytes(16, 16)),
            ("empty.jpg", Vec::new()),
            ("c.png", png_bytes(16, 16)),
        ])))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let items = body_json(response).await;
    let items = items.as_array().unwrap();
    let names: Vec<&str> = items.iter().map(|i| i["image_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["a.png", "empty.jpg", "c.png"]);

    assert_eq!(items[1]["image_index"], 2);
    assert_eq!(items[1]["title"], "Analysis Error");
    assert!(items[1]["image_url"].is_null());
    assert_eq!(items[0]["title"], "Apollo 11 Moon Landing");
    assert_eq!(items[2]["title"], "Apollo 11 Moon Landing");
}

#[tokio::test]
async fn test_analyze_without_files_is_bad_request() {
    let (app, _state, _dir) = create_test_app(vec![]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(&[])))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_blank_search_is_bad_request() {
    let (app, _state, _dir) = create_test_app(vec![]).await;

    assert_eq!(get(&app, "/search?q=%20%20").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, "/search").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let (app, _state, _dir) = create_test_app(vec![]).await;

    let response = get(&app, "/records/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    assert_eq!(get(&app, "/records/999/export").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_export_is_attachment() {
    let (app, state, _dir) = create_test_app(vec![]).await;
    let id = state
        .persistence
        .save(&AnalysisRecord::default(), "plain.jpg", None)
        .await
        .unwrap();

    let response = get(&app, &format!("/records/{}/export", id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        disposition,
        format!("attachment; filename=\"historical_analysis_{}.json\"", id)
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("\n  \"title\": \"Historical Event\""));
}

#[tokio::test]
async fn test_batch_export_roundtrips_items() {
    let (app, _state, _dir) = create_test_app(vec![]).await;

    let items = json!([{
        "image_index": 1,
        "image_name": "a.jpg",
        "image_url": null,
        "database_id": 4,
        "title": "Moon Landing",
        "event": "Apollo 11",
        "description": "d",
        "location_name": "Moon",
        "year": 1969,
        "exact_date": "1969-07-20",
        "confidence": {"year": 90, "location": 90, "event": 90, "exact_date": 90},
        "ai_generated_probability": 0,
        "ai_analysis": "none",
        "extracted_text": "none",
        "visual_elements": [],
        "prompt": "Unknown",
        "celebrity": false,
        "celebrity_name": null
    }]);

    let request = Request::builder()
        .method("POST")
        .uri("/export")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(items.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"historical_analysis_"));

    let exported = body_json(response).await;
    assert_eq!(exported[0]["title"], "Moon Landing");
    assert_eq!(exported[0]["database_id"], 4);
}

#[tokio::test]
async fn test_infer_returns_unpersisted_record() {
    let (app, state, _dir) = create_test_app(vec![moon_response()]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/infer")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "caption": "astronaut standing on grey dust beside a flag",
                "extracted_text": "",
                "detected_objects": ["person", "flag"]
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = body_json(response).await;
    assert_eq!(record["title"], "Apollo 11 Moon Landing");
    assert_eq!(record["confidence"]["exact_date"], 0);

    assert!(state.persistence.history(10).await.is_empty());
}

#[tokio::test]
async fn test_infer_requires_some_metadata() {
    let (app, _state, _dir) = create_test_app(vec![]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/infer")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
