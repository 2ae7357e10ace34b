//! Vision analysis via an OpenAI-compatible chat completions API
//!
//! Two entry points share one response path:
//! - [`VisionAnalyzer::analyze_image`] sends the prepared JPEG as a data URL
//! - [`VisionAnalyzer::infer_from_metadata`] sends caller-supplied caption,
//!   extracted text and detected objects to the text model
//!
//! Both request `json_object` output, decode the message content and hand
//! it to [`ResultValidator`].

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::AnalysisRecord;
use crate::validators::ResultValidator;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

const REQUEST_TIMEOUT_SECS: u64 = 120;
const TEMPERATURE: f32 = 0.3;
const IMAGE_MAX_TOKENS: u32 = 1500;
const METADATA_MAX_TOKENS: u32 = 1000;

const SYSTEM_PROMPT: &str = "You are a world-class historian and image analyst specializing in \
identifying historical events from photographs.

Your task is to analyze the evidence and determine the exact historical event shown. Provide \
detailed, accurate historical information with confidence scores for your analysis.

Always respond with valid JSON containing all required fields. Be specific about events: avoid \
generic descriptions like \"a historical photo\" or \"people gathering\". Identify the actual \
historical event if possible. If you cannot, provide the most likely historical context based on \
visual clues (time period, location, type of event).";

const RESPONSE_FIELDS: &str = "Provide your analysis in JSON format with these exact fields:
- \"title\": Brief, specific title of the event
- \"event\": Name of the historical event
- \"description\": 3-4 sentence detailed description of what's happening
- \"location_name\": Precise location (e.g., \"Brandenburg Gate, Berlin, Germany\")
- \"year\": Year when this occurred (numeric)
- \"exact_date\": Exact date as YYYY-MM-DD if known, otherwise \"Unknown\"
- \"confidence\": Object with \"year\", \"location\", \"event\" and \"exact_date\" scores (0-100)
- \"ai_generated_probability\": Likelihood (0-100) that the image is AI-generated or manipulated
- \"ai_analysis\": Short explanation of the AI-generation assessment
- \"extracted_text\": Any visible text you can see in the image
- \"visual_elements\": Key visual elements that helped with identification
- \"prompt\": If the image looks AI-generated, a plausible prompt that produced it, else \"Unknown\"
- \"celebrity\": true if a well-known person is recognizable
- \"celebrity_name\": Name of that person, or null

Be as specific as possible. If you can't identify the exact event, provide the most likely \
historical context based on the evidence.";

const IMAGE_PROMPT_INTRO: &str = "Analyze this historical image and identify the specific event. Consider:
- Time period indicators (clothing, vehicles, architecture, technology)
- Location clues (landmarks, signs, geographic features)
- Event type (political, military, social, cultural)
- Historical context and significance
- Any visible text or signs
- Signs of AI generation or digital manipulation";

/// Vision analysis errors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Vision API key not configured")]
    NotConfigured,

    #[error("Vision request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Malformed response: {0}")]
    ParseError(String),
}

/// Metadata supplied by the caller for the inference-only path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub detected_objects: Vec<String>,
}

/// Produces a validated record from an image or its metadata
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze_image(&self, jpeg: &[u8]) -> Result<AnalysisRecord, VisionError>;

    async fn infer_from_metadata(&self, metadata: &ImageMetadata) -> Result<AnalysisRecord, VisionError>;
}

/// Vision client settings
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    response_format: Value,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible vision client
pub struct OpenAiVisionAnalyzer {
    http_client: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiVisionAnalyzer {
    pub fn new(settings: OpenAiSettings) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| VisionError::NetworkError(e.to_string()))?;

        if settings.api_key.is_none() {
            tracing::warn!("OpenAI API key not configured, analysis requests will fail");
        }

        Ok(Self {
            http_client,
            settings: OpenAiSettings {
                base_url: settings.base_url.trim_end_matches('/').to_string(),
                ..settings
            },
        })
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    async fn complete(&self, user_content: Value, max_tokens: u32) -> Result<AnalysisRecord, VisionError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(VisionError::NotConfigured)?;

        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                json!({"role": "system", "content": SYSTEM_PROMPT}),
                json!({"role": "user", "content": user_content}),
            ],
            response_format: json!({"type": "json_object"}),
            temperature: TEMPERATURE,
            max_tokens,
        };

        let url = format!("{}/chat/completions", self.settings.base_url);

        debug!(model = %self.settings.model, max_tokens, "Sending vision request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VisionError::Timeout
                } else {
                    VisionError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VisionError::ApiError(status.as_u16(), error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::ParseError(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VisionError::ParseError("response has no message content".to_string()))?;

        let raw = decode_content(&content)?;
        let record = ResultValidator::validate(&raw);

        info!(
            title = %record.title,
            event = %record.event,
            year = %record.year,
            "Vision analysis complete"
        );

        Ok(record)
    }
}

/// Decode the message content, tolerating a surrounding Markdown code fence
pub fn decode_content(content: &str) -> Result<Value, VisionError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim()).map_err(|e| VisionError::ParseError(e.to_string()))
}

/// User prompt for the inference-only path
pub fn metadata_prompt(metadata: &ImageMetadata) -> String {
    let objects = if metadata.detected_objects.is_empty() {
        "None detected".to_string()
    } else {
        metadata.detected_objects.join(", ")
    };
    let text = if metadata.extracted_text.trim().is_empty() {
        "No text detected"
    } else {
        metadata.extracted_text.as_str()
    };

    format!(
        "Given this image metadata, determine the exact historical event shown:\n\n\
         VISUAL DESCRIPTION: {}\n\n\
         DETECTED TEXT: {}\n\n\
         DETECTED OBJECTS: {}\n\n{}",
        metadata.caption, text, objects, RESPONSE_FIELDS
    )
}

#[async_trait]
impl VisionAnalyzer for OpenAiVisionAnalyzer {
    async fn analyze_image(&self, jpeg: &[u8]) -> Result<AnalysisRecord, VisionError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);
        let content = json!([
            {"type": "text", "text": format!("{}\n\n{}", IMAGE_PROMPT_INTRO, RESPONSE_FIELDS)},
            {"type": "image_url", "image_url": {"url": format!("data:image/jpeg;base64,{}", encoded)}}
        ]);

        self.complete(content, IMAGE_MAX_TOKENS).await
    }

    async fn infer_from_metadata(&self, metadata: &ImageMetadata) -> Result<AnalysisRecord, VisionError> {
        self.complete(Value::String(metadata_prompt(metadata)), METADATA_MAX_TOKENS)
            .await
    }
}
