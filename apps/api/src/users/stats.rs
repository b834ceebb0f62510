//! Dashboard statistics aggregated from resumes and jobs.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::activity::DashboardStats;

#[derive(Debug, Clone, Default, FromRow)]
pub struct ResumeAggregates {
    pub total: i64,
    pub scored: i64,
    pub average: Option<f64>,
    pub best: Option<i32>,
    pub primary_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct JobAggregates {
    pub total: i64,
    pub posted_this_week: i64,
}

pub async fn load_dashboard_stats(pool: &PgPool, user_id: Uuid) -> Result<DashboardStats, sqlx::Error> {
    let resumes = sqlx::query_as::<_, ResumeAggregates>(
        r#"
        SELECT COUNT(*)                                  AS total,
               COUNT(ats_score)                          AS scored,
               AVG(ats_score)::FLOAT8                    AS average,
               MAX(ats_score)                            AS best,
               (ARRAY_AGG(id) FILTER (WHERE is_primary))[1] AS primary_id
        FROM resumes
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let jobs = sqlx::query_as::<_, JobAggregates>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE posted_at >= NOW() - INTERVAL '7 days') AS posted_this_week
        FROM jobs
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(build_stats(&resumes, &jobs))
}

pub fn build_stats(resumes: &ResumeAggregates, jobs: &JobAggregates) -> DashboardStats {
    DashboardStats {
        total_resumes: resumes.total,
        scored_resumes: resumes.scored,
        average_ats_score: resumes
            .average
            .map(|a| a.round().clamp(0.0, 100.0) as u32)
            .unwrap_or(0),
        best_ats_score: resumes.best.map(|b| b.clamp(0, 100) as u32).unwrap_or(0),
        primary_resume_id: resumes.primary_id,
        jobs_available: jobs.total,
        new_jobs_this_week: jobs.posted_this_week,
    }
}
