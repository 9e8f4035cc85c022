//! Image analysis adapter: one outbound multimodal-model call that turns an
//! uploaded photo into a short damage description.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const INSPECTOR_PROMPT: &str = "You are a maintenance inspector. Analyze this image and provide a brief 2-3 sentence summary of any maintenance issues. Focus on: fans, lights, furniture, or electronics. If damaged: state the item and specific problem (e.g., 'Ceiling fan blade is severely bent and broken'). If no issues: respond with exactly 'No maintenance issues detected'. Keep your response concise and under 100 words.";

#[derive(Debug, Clone, Error)]
pub enum VisionError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api key: ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,
}

/// Contract for the analysis stage of the ticket pipeline. The pipeline only
/// needs a description string; everything else stays behind this seam.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn describe(&self, image: &[u8], media_type: &str) -> Result<String, VisionError>;
}

#[derive(Debug, Serialize)]
struct VisionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessagePayload>,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentPart {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

/// Content block in response
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    content: Vec<ContentBlock>,
}

impl VisionResponse {
    fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
        })
    }
}

/// Client for the multimodal model endpoint. One call per ticket; failures
/// surface to the caller and the upload must be resubmitted — no retries.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: Client,
    api_key: String,
    model: String,
}

impl VisionClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a new client using the ANTHROPIC_API_KEY environment variable
    pub fn from_env() -> Result<Self, VisionError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| VisionError::MissingApiKey)?;
        Self::new(api_key, None)
    }

    pub fn new(api_key: String, model: Option<String>) -> Result<Self, VisionError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("maintenance-reporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    async fn send_request(&self, request: &VisionRequest) -> Result<VisionResponse, VisionError> {
        let res = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<VisionResponse>()
                .await
                .map_err(|e| VisionError::Serde(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(VisionError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(VisionError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(VisionError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl ImageAnalyzer for VisionClient {
    async fn describe(&self, image: &[u8], media_type: &str) -> Result<String, VisionError> {
        let request = VisionRequest {
            model: self.model.clone(),
            max_tokens: 512,
            messages: vec![MessagePayload {
                role: "user",
                content: vec![
                    ContentPart::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: media_type.to_string(),
                            data: BASE64.encode(image),
                        },
                    },
                    ContentPart::Text {
                        text: INSPECTOR_PROMPT.to_string(),
                    },
                ],
            }],
        };

        let response = self.send_request(&request).await?;
        let text = response
            .text()
            .ok_or_else(|| VisionError::Serde("no text content in response".to_string()))?;
        Ok(text.trim().to_string())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> VisionError {
    if e.is_timeout() {
        VisionError::Timeout
    } else {
        VisionError::Transport(e.to_string())
    }
}
