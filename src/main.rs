use std::sync::Arc;

use omstorage_core::{AppConfig, PgFileRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the omstorage service
///
/// Serves the REST upload API with file metadata kept in Postgres.
///
/// The connection pool is lazy, so the server comes up even when the database is down.
/// Uploads still store their blobs in that case and report the metadata failure as a warning.
///
/// # Environment Variables
/// - `STORAGE_ROOT`: directory blobs are written to (default: "./uploads")
/// - `PUBLIC_URL_PREFIX`: URL prefix stored files are served under (default: "/storage")
/// - `SERVER_PORT`: REST port (default: 8080)
/// - `MAX_UPLOAD_BYTES`: request body limit for upload routes
/// - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_SSLMODE`, `DB_TIMEZONE`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("omstorage=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(database = ?config.database, "metadata store");

    let repository = PgFileRepository::connect_lazy(&config.database);
    if let Err(e) = repository.migrate().await {
        tracing::error!("Metadata schema migration failed: {}", e);
    }

    let state = api_rest::bootstrap(&config, Arc::new(repository)).await?;
    api_rest::serve(&config, state).await
}
