//! Error types for the recommendation service.
//!
//! `RecommendError` is what the engine returns; every variant is a distinct,
//! terminal outcome. `ApiError` is the HTTP-facing shape and owns the
//! status code mapping. `ConfigError` covers startup.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog::CatalogError;
use llm_client::LlmError;
use serde_json::json;
use thiserror::Error;

use crate::quota::QuotaSnapshot;

/// Terminal failures of one recommendation request
#[derive(Error, Debug)]
pub enum RecommendError {
    /// Empty or whitespace-only prompt; no quota used
    #[error("Please provide a prompt")]
    InvalidRequest,

    /// Local ceiling reached; no model call, no quota used
    #[error("Recommendation request limit reached ({}/{})", .0.used, .0.limit)]
    QuotaExceeded(QuotaSnapshot),

    /// Catalog fetch failed; no model call, no quota used
    #[error("Course catalog unavailable: {0}")]
    StoreUnavailable(#[source] CatalogError),

    /// Provider is out of quota; the local slot stays consumed
    #[error("Model provider quota exceeded: {0}")]
    UpstreamQuotaExceeded(#[source] LlmError),

    /// Any other model failure; the local slot stays consumed
    #[error("Model invocation failed: {0}")]
    Upstream(#[source] LlmError),
}

impl From<LlmError> for RecommendError {
    fn from(err: LlmError) -> Self {
        if err.is_quota_exhausted() {
            RecommendError::UpstreamQuotaExceeded(err)
        } else {
            RecommendError::Upstream(err)
        }
    }
}

/// Invalid or missing startup configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required setting {0}")]
    Missing(&'static str),
}

/// Errors surfaced by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Not authorized, {0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("API request limit reached. Please try again later.")]
    QuotaExceeded(QuotaSnapshot),

    #[error("Model provider quota exceeded. Please try again later.")]
    UpstreamQuotaExceeded,

    #[error("Course catalog is temporarily unavailable")]
    StoreUnavailable,

    #[error("Failed to generate recommendations")]
    Upstream,
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::InvalidRequest => {
                ApiError::InvalidRequest(RecommendError::InvalidRequest.to_string())
            }
            RecommendError::QuotaExceeded(snapshot) => ApiError::QuotaExceeded(snapshot),
            RecommendError::StoreUnavailable(_) => ApiError::StoreUnavailable,
            RecommendError::UpstreamQuotaExceeded(_) => ApiError::UpstreamQuotaExceeded,
            RecommendError::Upstream(_) => ApiError::Upstream,
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(_: CatalogError) -> Self {
        ApiError::StoreUnavailable
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::QuotaExceeded(_) | ApiError::UpstreamQuotaExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::QuotaExceeded(snapshot) => json!({
                "message": self.to_string(),
                "usage": snapshot.used,
                "limit": snapshot.limit,
            }),
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
