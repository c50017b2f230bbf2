//! Anthropic Messages API completion adapter.
//!
//! Maps resource tiers to configured models and HTTP failures onto the
//! completion error taxonomy the retry layer keys on.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::errors::EngineError;
use crate::domain::models::{CompletionSettings, ResourceTier};
use crate::domain::ports::{CompletionError, CompletionRequest, CompletionService};

const API_VERSION: &str = "2023-06-01";
const HTTP_TIMEOUT_SECS: u64 = 300;

pub struct AnthropicCompletionService {
    settings: CompletionSettings,
    client: Client,
}

impl AnthropicCompletionService {
    pub fn new(settings: CompletionSettings) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                EngineError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { settings, client })
    }

    /// API key from settings, falling back to the environment.
    fn api_key(&self) -> Option<String> {
        if self.settings.api_key.trim().is_empty() {
            std::env::var("ANTHROPIC_API_KEY").ok()
        } else {
            Some(self.settings.api_key.clone())
        }
    }

    fn model_for(&self, tier: ResourceTier) -> &str {
        match tier {
            ResourceTier::Basic => &self.settings.model_basic,
            ResourceTier::Standard => &self.settings.model_standard,
            ResourceTier::Powerful => &self.settings.model_powerful,
        }
    }
}

#[async_trait]
impl CompletionService for AnthropicCompletionService {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self.api_key().ok_or(CompletionError::AuthenticationFailed)?;

        let api_request = MessagesRequest {
            model: self.model_for(request.tier),
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: MessageRole::User,
                content: vec![ContentBlock::Text {
                    text: request.prompt,
                }],
            }],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.settings.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &api_key)
            .header("anthropic-version", API_VERSION)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout {
                        seconds: HTTP_TIMEOUT_SECS,
                    }
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(classify_status(status.as_u16(), message));
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        if result.stop_reason.as_deref() == Some("max_tokens") {
            warn!(model = %result.model, "Completion truncated at max_tokens");
        }
        debug!(
            model = %result.model,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            "Completion finished"
        );

        let text = result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(CompletionError::MalformedResponse(
                "response contained no text blocks".to_string(),
            ));
        }
        Ok(text)
    }
}

fn classify_status(status: u16, message: String) -> CompletionError {
    match status {
        401 => CompletionError::AuthenticationFailed,
        403 => CompletionError::Forbidden(message),
        429 => CompletionError::RateLimited,
        s if s >= 500 => CompletionError::ServerError { status: s, message },
        _ => CompletionError::InvalidRequest(message),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
enum MessageRole {
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct Message {
    role: MessageRole,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
