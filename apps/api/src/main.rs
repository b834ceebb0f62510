mod config;
mod db;
mod errors;
mod jobs;
mod models;
mod resumes;
mod routes;
mod state;
mod storage;
mod text;
mod users;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::matching::{KeywordMatchScorer, MatchScorer};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::build_s3_client;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL (runs pending migrations)
    let db = create_pool(&config.database_url).await?;

    // Redis (activity feed)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // S3 / MinIO (resume files)
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let match_scorer: Arc<dyn MatchScorer> = Arc::new(KeywordMatchScorer::default());
    info!("Match scorer: {}", match_scorer.backend());

    let state = AppState {
        db,
        redis,
        s3,
        config: config.clone(),
        match_scorer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
