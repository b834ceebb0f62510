//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::matching::rank;
use crate::jobs::store::{self, JobFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::models::activity::{Activity, ActivityKind};
use crate::models::job::{Job, JobMatch, JobRecommendation, NewJob};
use crate::models::resume::ResumeRow;
use crate::resumes::store as resume_store;
use crate::state::AppState;
use crate::users::activity;

/// Newest postings considered when building recommendations.
const RECOMMENDATION_POOL: i64 = 200;
const DEFAULT_RECOMMENDATIONS: usize = 10;
const MAX_RECOMMENDATIONS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub q: Option<String>,
    pub skill: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListJobsQuery {
    fn into_filter(self) -> JobFilter {
        JobFilter {
            query: self.q,
            skill: self.skill,
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

/// `resumeId` alone is enough; `userId` is needed to fall back to the primary resume.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    pub user_id: Option<Uuid>,
    pub resume_id: Option<Uuid>,
}

/// Which resume a match request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumeSelector {
    /// A specific resume, optionally restricted to its owner.
    ById { resume_id: Uuid, user_id: Option<Uuid> },
    Primary { user_id: Uuid },
}

impl MatchQuery {
    fn selector(&self) -> Result<ResumeSelector, AppError> {
        match (self.resume_id, self.user_id) {
            (Some(resume_id), user_id) => Ok(ResumeSelector::ById { resume_id, user_id }),
            (None, Some(user_id)) => Ok(ResumeSelector::Primary { user_id }),
            (None, None) => Err(AppError::Validation(
                "Either resumeId or userId is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedQuery {
    pub user_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub limit: Option<usize>,
}

fn validate_new_job(job: &NewJob) -> Result<(), AppError> {
    if job.title.trim().is_empty() {
        return Err(AppError::Validation("Job title must not be empty".to_string()));
    }
    if let (Some(min), Some(max)) = (job.salary_min, job.salary_max) {
        if min > max {
            return Err(AppError::Validation(format!(
                "salaryMin ({min}) must not exceed salaryMax ({max})"
            )));
        }
    }
    if job.salary_min.is_some_and(|s| s < 0) || job.salary_max.is_some_and(|s| s < 0) {
        return Err(AppError::Validation("Salaries must not be negative".to_string()));
    }
    Ok(())
}

/// The requested resume, or the user's primary one when none is named.
async fn resolve_resume(state: &AppState, selector: ResumeSelector) -> Result<ResumeRow, AppError> {
    let found = match selector {
        ResumeSelector::ById {
            resume_id,
            user_id: Some(user_id),
        } => resume_store::get_resume(&state.db, user_id, resume_id).await?,
        ResumeSelector::ById {
            resume_id,
            user_id: None,
        } => resume_store::get_resume_by_id(&state.db, resume_id).await?,
        ResumeSelector::Primary { user_id } => {
            return resume_store::get_primary_resume(&state.db, user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("No primary resume to match with".to_string()));
        }
    };
    found.ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let rows = store::list_jobs(&state.db, &params.into_filter()).await?;
    Ok(Json(rows.into_iter().map(Job::from).collect()))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let row = store::get_job(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    Ok(Json(row.into()))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(body): Json<NewJob>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    validate_new_job(&body)?;
    let posted_at = body.posted_at.unwrap_or_else(Utc::now);
    let row = store::insert_job(&state.db, &body, posted_at).await?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /api/v1/jobs/:id/match
pub async fn handle_match_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<MatchQuery>,
) -> Result<Json<JobMatch>, AppError> {
    let selector = params.selector()?;
    let job: Job = store::get_job(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?
        .into();
    let resume = resolve_resume(&state, selector).await?;

    let job_match = state
        .match_scorer
        .score(resume.id, &resume.structured_data.0, &job, Utc::now())
        .await?;

    info!(
        "Matched resume {} against job {job_id}: {}",
        resume.id, job_match.score
    );
    activity::record(
        &state.redis,
        resume.user_id,
        Activity::now(
            ActivityKind::JobMatched,
            format!("'{}' scored {} against {}", resume.name, job_match.score, job.title),
            Some(job_id),
        ),
    )
    .await;

    Ok(Json(job_match))
}

/// GET /api/v1/jobs/recommended
///
/// Scores the newest postings against the resume and returns the best matches.
pub async fn handle_recommended_jobs(
    State(state): State<AppState>,
    Query(params): Query<RecommendedQuery>,
) -> Result<Json<Vec<JobRecommendation>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECOMMENDATIONS)
        .clamp(1, MAX_RECOMMENDATIONS);
    let selector = match params.resume_id {
        Some(resume_id) => ResumeSelector::ById {
            resume_id,
            user_id: Some(params.user_id),
        },
        None => ResumeSelector::Primary {
            user_id: params.user_id,
        },
    };
    let resume = resolve_resume(&state, selector).await?;
    let jobs = store::recent_jobs(&state.db, RECOMMENDATION_POOL).await?;
    let now = Utc::now();

    let mut recommendations = Vec::with_capacity(jobs.len());
    for row in jobs {
        let job = Job::from(row);
        let job_match = state
            .match_scorer
            .score(resume.id, &resume.structured_data.0, &job, now)
            .await?;
        recommendations.push(JobRecommendation { job, job_match });
    }

    Ok(Json(rank(recommendations, limit)))
}
