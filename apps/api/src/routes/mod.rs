pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::jobs::handlers as jobs;
use crate::resumes::handlers as resumes;
use crate::state::AppState;
use crate::users::handlers as users;

/// Headroom for multipart boundaries and the `name` field on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// `?userId=` carried by every user-scoped endpoint.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // Users
        .route("/users/dashboard-stats", get(users::handle_dashboard_stats))
        .route("/users/recent-activity", get(users::handle_recent_activity))
        // Resumes
        .route(
            "/resumes",
            get(resumes::handle_list_resumes)
                .post(resumes::handle_upload_resume)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route(
            "/resumes/:id",
            get(resumes::handle_get_resume).delete(resumes::handle_delete_resume),
        )
        .route("/resumes/:id/primary", post(resumes::handle_set_primary))
        .route("/resumes/:id/rescore", post(resumes::handle_rescore))
        // Jobs
        .route("/jobs", get(jobs::handle_list_jobs).post(jobs::handle_create_job))
        .route("/jobs/recommended", get(jobs::handle_recommended_jobs))
        .route("/jobs/:id", get(jobs::handle_get_job))
        .route("/jobs/:id/match", get(jobs::handle_match_job))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1", api_routes(state.config.max_upload_bytes))
        .with_state(state)
}
