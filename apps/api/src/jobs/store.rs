//! Postgres access for job postings.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::models::job::{JobRow, NewJob};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Listing filters for `GET /jobs`.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Case-insensitive substring of title or description.
    pub query: Option<String>,
    /// Required skill, compared case-insensitively.
    pub skill: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Escapes `%`, `_` and `\` so user input is matched literally by ILIKE.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn build_list_query(filter: &JobFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT * FROM jobs WHERE TRUE");

    if let Some(q) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", escape_like(q));
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(skill) = filter.skill.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(required_skills) AS s WHERE lower(s) = lower(")
            .push_bind(skill.to_string())
            .push("))");
    }

    builder
        .push(" ORDER BY posted_at DESC, id LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);
    builder
}

pub async fn list_jobs(pool: &PgPool, filter: &JobFilter) -> Result<Vec<JobRow>, sqlx::Error> {
    build_list_query(filter)
        .build_query_as::<JobRow>()
        .fetch_all(pool)
        .await
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await
}

/// The newest `limit` postings, used as the candidate pool for recommendations.
pub async fn recent_jobs(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY posted_at DESC LIMIT $1")
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn insert_job(
    pool: &PgPool,
    job: &NewJob,
    posted_at: DateTime<Utc>,
) -> Result<JobRow, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, title, company, location, description, required_skills,
             salary_min, salary_max, posted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job.title.trim())
    .bind(job.company.as_deref())
    .bind(job.location.as_deref())
    .bind(&job.description)
    .bind(&job.required_skills)
    .bind(job.salary_min)
    .bind(job.salary_max)
    .bind(posted_at)
    .fetch_one(pool)
    .await?;

    info!("Inserted job {} ({})", row.id, row.title);
    Ok(row)
}
