use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use moodwatch_media::{HttpFetcher, ImageProxy, MediaFetcher, MediaStore};

mod config;
mod enrich;
mod error;
mod routes;
mod state;

use config::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations applied");

    let fetcher: Arc<dyn MediaFetcher> = Arc::new(HttpFetcher::new()?);
    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("Failed to create media root {}", config.media_root.display()))?;

    let state = AppState {
        pool,
        media: MediaStore::new(&config.media_root, fetcher.clone())
            .with_timeout(config.mirror_timeout),
        proxy: ImageProxy::new(fetcher).with_timeout(config.proxy_timeout),
    };

    let app = routes::build_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.host, config.port);
    info!(media_root = %config.media_root.display(), "Moodwatch server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
