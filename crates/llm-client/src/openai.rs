//! OpenAI-compatible chat-completions client.
//!
//! Wire format (request):
//! `{ model, messages: [{role: "system"}, {role: "user"}], max_completion_tokens, temperature }`
//!
//! The narrative is `choices[0].message.content`. Provider errors come back
//! as `{ "error": { "message", "type", "code" } }`; a code or type of
//! `insufficient_quota` means the account is out of quota.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{Completion, CompletionRequest, LanguageModel, LlmError};

const INSUFFICIENT_QUOTA: &str = "insufficient_quota";

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// e.g. "https://api.openai.com/v1"
    pub base_url: String,
    pub model: String,
    /// Upper bound on a whole request, connect to last byte
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for a chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_completion_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAiClient {
    /// Build a client; no network traffic happens until `complete`.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        info!("Model client configured for {} ({})", endpoint, config.model);

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key,
            model: config.model,
        })
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_error(status: u16, body: &str) -> LlmError {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let ErrorBody {
                    message,
                    kind,
                    code,
                } = envelope.error;
                let message = message.unwrap_or_else(|| format!("HTTP {status}"));
                let out_of_quota = code.as_deref() == Some(INSUFFICIENT_QUOTA)
                    || kind.as_deref() == Some(INSUFFICIENT_QUOTA);
                if out_of_quota {
                    LlmError::QuotaExceeded(message)
                } else {
                    LlmError::Api { status, message }
                }
            }
            Err(_) => LlmError::Api {
                status,
                message: body.chars().take(200).collect(),
            },
        }
    }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(e)
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            "Sending completion request ({} system chars, {} user chars)",
            request.system_instruction.len(),
            request.user_prompt.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let err = Self::classify_error(status.as_u16(), &text);
            error!("Model provider error: {}", err);
            return Err(err);
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let narrative = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no message content".into()))?;

        debug!("Received narrative of {} chars", narrative.len());
        Ok(Completion { narrative })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let client =
            OpenAiClient::new(OpenAiConfig::new("key").with_base_url("http://localhost:9999/v1/"))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_classify_insufficient_quota() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        assert!(OpenAiClient::classify_error(429, body).is_quota_exhausted());
    }

    #[test]
    fn test_classify_rate_limit_is_not_quota() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#;
        match OpenAiClient::classify_error(429, body) {
            LlmError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classify_non_json_body() {
        match OpenAiClient::classify_error(502, "Bad Gateway") {
            LlmError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
