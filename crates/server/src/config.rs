//! Process-wide configuration, read once at startup.
//!
//! Every setting comes from an environment variable and falls back to a
//! logged default. Malformed values are reported as errors instead of being
//! silently replaced.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use llm_client::{OpenAiClient, OpenAiConfig};
use tracing::{info, warn};

use crate::auth::TokenAuthenticator;
use crate::error::ConfigError;
use crate::orchestrator::{ModelSettings, ReconcileOrder};

pub const DEFAULT_MAX_REQUESTS: u32 = 250;

pub struct ServerConfig {
    pub port: u16,
    pub catalog_path: PathBuf,
    pub max_requests: u32,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub model: ModelSettings,
    pub recommendation_count: usize,
    pub reconcile_order: ReconcileOrder,
    pub authenticator: TokenAuthenticator,
    pub cors_origin: String,
}

impl ServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs: u64 = try_load(&lookup, "MODEL_TIMEOUT_SECS", "30")?;
        let recommendation_count: usize = try_load(&lookup, "RECOMMENDATION_COUNT", "3")?;
        if recommendation_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RECOMMENDATION_COUNT".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", "5001")?,
            catalog_path: try_load(&lookup, "CATALOG_PATH", "data/catalog.json")?,
            max_requests: try_load(&lookup, "MAX_RECOMMENDATION_REQUESTS", "250")?,
            openai_api_key: lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()),
            openai_base_url: try_load(&lookup, "OPENAI_BASE_URL", "https://api.openai.com/v1")?,
            openai_model: try_load(&lookup, "OPENAI_MODEL", "gpt-4o-mini")?,
            model: ModelSettings {
                max_tokens: try_load(&lookup, "MODEL_MAX_TOKENS", "800")?,
                temperature: try_load(&lookup, "MODEL_TEMPERATURE", "0.7")?,
                timeout: Duration::from_secs(timeout_secs),
            },
            recommendation_count,
            reconcile_order: try_load(&lookup, "RECONCILE_ORDER", "catalog")?,
            authenticator: TokenAuthenticator::parse(&lookup("AUTH_TOKENS").unwrap_or_default())?,
            cors_origin: try_load(&lookup, "CORS_ORIGIN", "http://localhost:5174")?,
        })
    }

    /// Build the chat-completions client these settings describe
    pub fn model_client(&self) -> Result<OpenAiClient, anyhow::Error> {
        let api_key = self
            .openai_api_key
            .clone()
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let config = OpenAiConfig::new(api_key)
            .with_base_url(self.openai_base_url.clone())
            .with_model(self.openai_model.clone())
            .with_timeout(self.model.timeout);

        Ok(OpenAiClient::new(config)?)
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}
