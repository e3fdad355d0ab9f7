//! Text-generation collaborator.
//!
//! The engine only needs "system prompt + user prompt in, text out". Retries
//! live here, never in the gate pipeline.

mod anthropic;

pub use anthropic::AnthropicClient;

use async_trait::async_trait;
use thiserror::Error;

/// Text-generation failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    /// Non-retryable 4xx (anything but 429)
    #[error("Text generation rejected: HTTP {status}: {body}")]
    Client { status: u16, body: String },

    #[error("Text generation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// Retryable transport or server failure
    #[error("Text generation transport error: {0}")]
    Network(String),

    #[error("Failed to decode text generation response: {0}")]
    Decode(String),

    #[error("No API key configured for text generation")]
    MissingApiKey,
}

impl LlmError {
    /// 429, 5xx and connection failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Blocking-style text generation: one prompt pair in, one text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}
