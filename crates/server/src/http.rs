//! HTTP surface.
//!
//! Everything is mounted under `/api`. Authentication happens in the
//! extractors from [`crate::auth`], so a handler that names `Student` never
//! runs for anyone else.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use catalog::{CatalogStore, Course, InstructorRef, Level};
use llm_client::LanguageModel;
use pipeline::PromptBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::auth::{Principal, Student, TokenAuthenticator};
use crate::config::ServerConfig;
use crate::error::{ApiError, ConfigError};
use crate::orchestrator::{RecommendationEngine, RecommendationRequest};
use crate::quota::{QuotaSnapshot, QuotaTracker};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub catalog: Arc<dyn CatalogStore>,
    pub authenticator: Arc<TokenAuthenticator>,
}

impl AppState {
    pub fn new(
        engine: RecommendationEngine,
        catalog: Arc<dyn CatalogStore>,
        authenticator: TokenAuthenticator,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            catalog,
            authenticator: Arc::new(authenticator),
        }
    }

    /// Wire the engine exactly as the configuration describes it
    pub fn from_config(
        config: &ServerConfig,
        catalog: Arc<dyn CatalogStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let engine = RecommendationEngine::new(
            catalog.clone(),
            model,
            Arc::new(QuotaTracker::new(config.max_requests)),
        )
        .with_prompt_builder(
            PromptBuilder::new().with_recommendation_count(config.recommendation_count),
        )
        .with_reconciler(config.reconcile_order.reconciler())
        .with_settings(config.model);

        Self::new(engine, catalog, config.authenticator.clone())
    }
}

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub current_usage: u32,
    pub max_limit: u32,
    pub remaining: u32,
}

impl From<QuotaSnapshot> for UsageResponse {
    fn from(snapshot: QuotaSnapshot) -> Self {
        Self {
            current_usage: snapshot.used,
            max_limit: snapshot.limit,
            remaining: snapshot.remaining,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiUsage {
    pub current: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl From<QuotaSnapshot> for ApiUsage {
    fn from(snapshot: QuotaSnapshot) -> Self {
        Self {
            current: snapshot.used,
            limit: snapshot.limit,
            remaining: snapshot.remaining,
        }
    }
}

/// Course as shown next to a recommendation; course content stays out
#[derive(Debug, Serialize)]
pub struct RecommendedCourse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub category: Option<String>,
    pub duration: Option<String>,
    pub instructor: InstructorRef,
}

impl From<Course> for RecommendedCourse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            level: course.level,
            category: course.category,
            duration: course.duration,
            instructor: course.instructor,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub success: bool,
    pub prompt: String,
    pub ai_response: String,
    pub recommended_courses: Vec<RecommendedCourse>,
    pub api_usage: ApiUsage,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let courses = state.catalog.fetch_all_courses().await?;

    Ok(Json(json!({
        "success": true,
        "count": courses.len(),
        "courses": courses,
    })))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course = state
        .catalog
        .get_course(&id)
        .await?
        .ok_or(ApiError::NotFound("Course"))?;

    Ok(Json(json!({ "success": true, "course": course })))
}

async fn usage(State(state): State<AppState>, _principal: Principal) -> Json<UsageResponse> {
    Json(state.engine.usage().into())
}

async fn recommend(
    State(state): State<AppState>,
    Student(student): Student,
    payload: Result<Json<RecommendBody>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let request = RecommendationRequest::new(body.prompt.unwrap_or_default());

    info!("Recommendation requested by {}", student.user_id);
    let result = state.engine.recommend(&request).await?;

    Ok(Json(RecommendResponse {
        success: true,
        prompt: request.prompt,
        ai_response: result.narrative,
        recommended_courses: result
            .matched_courses
            .into_iter()
            .map(RecommendedCourse::from)
            .collect(),
        api_usage: result.quota.into(),
    }))
}

// =============================================================================
// Server
// =============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/courses", get(list_courses))
        .route("/api/courses/{id}", get(get_course))
        .route("/api/ai/usage", get(usage))
        .route("/api/ai/recommend", post(recommend))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let origin = HeaderValue::from_str(origin).map_err(|e| ConfigError::InvalidValue {
        key: "CORS_ORIGIN".to_string(),
        reason: e.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60)))
}

/// Bind, serve until a shutdown signal, then return
pub async fn serve(state: AppState, port: u16, cors_origin: &str) -> anyhow::Result<()> {
    let app = router(state).layer(cors_layer(cors_origin)?);

    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
