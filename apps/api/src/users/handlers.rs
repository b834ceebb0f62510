use axum::{
    extract::{Query, State},
    Json,
};
use tracing::warn;

use crate::errors::AppError;
use crate::models::activity::{Activity, DashboardStats};
use crate::routes::UserQuery;
use crate::state::AppState;
use crate::users::activity::recent_activity;
use crate::users::stats::load_dashboard_stats;

/// GET /api/v1/users/dashboard-stats
pub async fn handle_dashboard_stats(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = load_dashboard_stats(&state.db, params.user_id).await?;
    Ok(Json(stats))
}

/// GET /api/v1/users/recent-activity
///
/// Degrades to an empty feed when Redis is unavailable.
pub async fn handle_recent_activity(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Json<Vec<Activity>> {
    match recent_activity(&state.redis, params.user_id, state.config.activity_feed_limit).await {
        Ok(feed) => Json(feed),
        Err(e) => {
            warn!("Recent activity unavailable for user {}: {e}", params.user_id);
            Json(Vec::new())
        }
    }
}
