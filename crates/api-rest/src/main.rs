//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API with an in-memory metadata repository, so no database is needed.
//!
//! ## Intended use
//! Development and debugging of clients and the Swagger UI. Records are lost on restart; blobs
//! still land under `STORAGE_ROOT`. The workspace's main `omstorage-run` binary uses Postgres.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omstorage_core::{AppConfig, InMemoryFileRepository};

/// Main entry point for the standalone REST API server
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration in the environment is invalid,
/// - the storage root cannot be prepared, or
/// - the server fails to bind or while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("omstorage=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::warn!("-- Using in-memory metadata; records will not survive a restart");

    let state = api_rest::bootstrap(&config, Arc::new(InMemoryFileRepository::new())).await?;
    api_rest::serve(&config, state).await
}
