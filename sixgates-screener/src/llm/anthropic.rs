//! Anthropic Messages API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use sixgates_common::config::LlmConfig;
use sixgates_common::util::{sanitize_for_log, truncate_with_ellipsis};

use super::{LlmError, TextGenerator};

/// Anthropic API client with bounded linear-backoff retry.
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_attempts: u32,
    backoff: Duration,
}

impl AnthropicClient {
    /// Create from config; fails when no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&config.api_version)
                .unwrap_or_else(|_| HeaderValue::from_static("2023-06-01")),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        })
    }

    /// Send one request without retrying.
    async fn try_generate(&self, request: &MessagesRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Network(sanitize_for_log(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_with_ellipsis(&response.text().await.unwrap_or_default(), 200);
            if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::Client {
                    status: status.as_u16(),
                    body,
                });
            }
            return Err(LlmError::Network(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        Ok(parsed
            .content
            .into_iter()
            .find(|block| block.content_type == "text")
            .map(|block| block.text)
            .unwrap_or_default())
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: user_prompt,
            }],
        };

        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.try_generate(&request).await {
                Ok(text) => {
                    debug!(model = %self.model, attempt, chars = text.len(), "Text generated");
                    return Ok(text);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(
                        model = %self.model,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Text generation failed, retrying..."
                    );
                    last_error = Some(e);

                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        Err(LlmError::Exhausted {
            attempts: self.max_attempts,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

// ============================================================================
// Tests
// ============================================================================
