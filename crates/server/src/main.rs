//! Course recommendation HTTP server.
//!
//! Reads its configuration from the environment, loads the seed catalog and
//! serves the API until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog::InMemoryCatalog;
use server::{AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,pipeline=debug")),
        )
        .init();

    info!("Starting course recommendation server");

    let config = ServerConfig::from_env().context("Invalid server configuration")?;

    info!("Loading catalog from {}", config.catalog_path.display());
    let catalog = InMemoryCatalog::load_from_file(&config.catalog_path)
        .with_context(|| format!("Failed to load catalog from {}", config.catalog_path.display()))?;
    info!("Catalog loaded: {} courses", catalog.len());

    let model = config.model_client()?;
    info!(
        "Model client ready: {} via {}",
        config.openai_model,
        model.endpoint()
    );

    if config.authenticator.is_empty() {
        info!("AUTH_TOKENS is empty; every /api/ai request will be rejected");
    }

    let state = AppState::from_config(&config, Arc::new(catalog), Arc::new(model));
    server::serve(state, config.port, &config.cors_origin).await
}
