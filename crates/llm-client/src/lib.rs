//! Language model client for the recommendation service.
//!
//! This crate defines the boundary the recommendation engine talks to when
//! it needs a free-text answer from a hosted model, plus one implementation
//! for OpenAI-compatible chat-completions endpoints. It handles:
//! - Building the two-message (system + user) request
//! - Sending it with bearer auth and a bounded timeout
//! - Telling provider quota exhaustion apart from every other failure
//!
//! There are no retries here. A failed call is reported once, as is.

use async_trait::async_trait;
use thiserror::Error;

pub mod openai;

pub use openai::{OpenAiClient, OpenAiConfig};

/// Errors that can occur when calling the language model
#[derive(Error, Debug)]
pub enum LlmError {
    /// Provider reports the account has no quota left
    #[error("Model provider quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Model request timed out")]
    Timeout,

    #[error("Failed to reach model provider: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Model provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from model provider: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// True when the provider itself is out of quota
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, LlmError::QuotaExceeded(_))
    }
}

/// Everything one model invocation needs
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The model's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Unstructured free text
    pub narrative: String,
}

/// A hosted language model that turns instructions into free text.
///
/// `Send + Sync` so the engine can hold it as `Arc<dyn LanguageModel>`
/// and share it across concurrent requests.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Run one completion
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}
