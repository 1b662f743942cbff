//! AI chat adapter
//!
//! OpenAI-compatible chat-completions client that answers health questions
//! with a pharmacist-assistant system prompt. Product recommendations are
//! resolved separately against the catalog from keywords in the question.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiConfig;

const SYSTEM_PROMPT: &str = "You are a helpful pharmacist assistant for an Indonesian \
    health e-commerce store. Answer health and medication questions briefly and clearly. \
    Recommend consulting a doctor for anything serious. Never diagnose.";
const DEFAULT_MAX_TOKENS: u32 = 512;

/// Errors that can occur when talking to the AI API.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error body.
    #[error("API error ({error_type}): {message}")]
    Api {
        /// Error type from the API.
        error_type: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No API key was configured.
    #[error("AI API key is not configured")]
    MissingApiKey,

    /// Failed to parse the response.
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// API error response body.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

/// AI chat client.
#[derive(Clone)]
pub struct AiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    has_key: bool,
}

impl AiClient {
    /// Create a new AI client from configuration.
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref api_key) = config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| anyhow::anyhow!("AI_API_KEY contains invalid header characters"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            has_key: config.api_key.is_some(),
        })
    }

    /// Ask a single question and get the assistant's answer.
    pub async fn ask(&self, question: &str) -> Result<String, AiError> {
        if !self.has_key {
            return Err(AiError::MissingApiKey);
        }

        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: question.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<String, AiError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Err(AiError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Unauthorized(body));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(parsed) => Err(AiError::Api {
                    error_type: parsed.error.error_type,
                    message: parsed.error.message,
                }),
                Err(_) => Err(AiError::Api {
                    error_type: format!("http_{}", status.as_u16()),
                    message: body,
                }),
            };
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AiError::Parse("response carried no choices".to_string()))
    }
}

/// Pull catalog search keywords out of a free-form question.
///
/// Short filler words are skipped; at most five keywords are kept.
pub fn extract_keywords(question: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in question.split(|c: char| !c.is_alphanumeric()) {
        if word.len() < 4 {
            continue;
        }
        let lowered = word.to_lowercase();
        if !keywords.contains(&lowered) {
            keywords.push(lowered);
        }
        if keywords.len() == 5 {
            break;
        }
    }
    keywords
}
