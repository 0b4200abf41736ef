//! Course recommendation service.
//!
//! [`RecommendationEngine`] is the core: it owns the quota, builds the
//! prompt, calls the model and reconciles the answer. The [`http`] module
//! puts it behind an axum router with bearer-token auth.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod quota;

pub use auth::{Principal, Role, TokenAuthenticator};
pub use config::ServerConfig;
pub use error::{ApiError, ConfigError, RecommendError};
pub use http::{AppState, router, serve};
pub use orchestrator::{
    ModelSettings, ReconcileOrder, RecommendationEngine, RecommendationRequest,
    RecommendationResult,
};
pub use quota::{QuotaSnapshot, QuotaTracker, Reservation};
