use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::jobs::matching::MatchScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Backs the per-user recent-activity feed.
    pub redis: RedisClient,
    pub s3: S3Client,
    pub config: Config,
    /// Pluggable match scorer. Default: KeywordMatchScorer.
    pub match_scorer: Arc<dyn MatchScorer>,
}
