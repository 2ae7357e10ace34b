//! Minimal in-process PostgREST stand-in for the Supabase backend
//!
//! Serves one table on `127.0.0.1:0` and records every request it sees.

use axum::{
    extract::{Query, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Id assigned to every inserted row
pub const INSERTED_ID: i64 = 11;

/// Id whose `raw_result` is served as a JSON-encoded string
pub const STORED_ID: i64 = 7;

#[derive(Default)]
pub struct PostgrestLog {
    pub inserts: Mutex<Vec<Value>>,
    pub queries: Mutex<Vec<HashMap<String, String>>>,
}

/// Running fake; `url` is the value for `SupabaseSettings::url`
pub struct FakePostgrest {
    pub url: String,
    pub log: Arc<PostgrestLog>,
}

impl FakePostgrest {
    /// Bind and serve `table` until the test runtime shuts down
    pub async fn start(table: &str) -> Self {
        let log = Arc::new(PostgrestLog::default());
        let app = Router::new()
            .route(&format!("/rest/v1/{}", table), get(select_rows).post(insert_row))
            .with_state(Arc::clone(&log));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake PostgREST");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake PostgREST");
        });

        Self {
            url: format!("http://{}", addr),
            log,
        }
    }

    /// Last recorded query string parameters
    pub fn last_query(&self) -> HashMap<String, String> {
        self.log
            .queries
            .lock()
            .expect("lock queries")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

fn with_content_range(body: Value, total: u32) -> Response {
    let mut response = Json(body).into_response();
    response.headers_mut().insert(
        HeaderName::from_static("content-range"),
        HeaderValue::from_str(&format!("*/{}", total)).expect("header value"),
    );
    response
}

async fn select_rows(
    State(log): State<Arc<PostgrestLog>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    log.queries.lock().expect("lock queries").push(params.clone());

    let authorized = headers.get("apikey").is_some()
        && headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Bearer "));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing api key").into_response();
    }

    let counting = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("count=exact"));
    if counting {
        let total = if params.contains_key("ai_generated_probability") { 1 } else { 3 };
        return with_content_range(json!([{"id": 1}]), total);
    }

    let select = params.get("select").map(String::as_str).unwrap_or("");
    let body = match select {
        "id" => json!([{"id": 1}]),
        "year" => json!([{"year": 1969}, {"year": 1944}, {"year": 1969}]),
        "raw_result" => {
            if params.get("id") == Some(&format!("eq.{}", STORED_ID)) {
                let raw = json!({
                    "title": "Moon Landing",
                    "event": "Apollo 11",
                    "year": 1969,
                    "confidence": {"year": 250}
                });
                json!([{"raw_result": raw.to_string()}])
            } else {
                json!([])
            }
        }
        _ => json!([
            {
                "id": STORED_ID,
                "image_name": "moon.jpg",
                "title": "Moon Landing",
                "event": "Apollo 11",
                "location_name": "Sea of Tranquility",
                "year": 1969,
                "exact_date": "1969-07-20",
                "ai_generated_probability": 3,
                "created_at": "2024-05-06T07:08:09.000000+00:00"
            },
            {
                "id": 3,
                "image_name": null,
                "title": null,
                "event": null,
                "location_name": null,
                "year": null,
                "exact_date": null,
                "ai_generated_probability": null,
                "created_at": "2024-05-05 10:00:00"
            }
        ]),
    };

    Json(body).into_response()
}

async fn insert_row(
    State(log): State<Arc<PostgrestLog>>,
    headers: HeaderMap,
    Json(row): Json<Value>,
) -> Response {
    let wants_rows = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"));

    log.inserts.lock().expect("lock inserts").push(row);

    if !wants_rows {
        return StatusCode::CREATED.into_response();
    }
    (StatusCode::CREATED, Json(json!([{"id": INSERTED_ID}]))).into_response()
}
