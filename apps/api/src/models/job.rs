use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub required_skills: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub posted_at: DateTime<Utc>,
}

/// Job posting as returned by the REST API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub required_skills: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub posted_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            title: row.title,
            company: row.company,
            location: row.location,
            description: row.description,
            required_skills: row.required_skills,
            salary_min: row.salary_min,
            salary_max: row.salary_max,
            posted_at: row.posted_at,
        }
    }
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Match sub-scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBreakdown {
    pub skill_match: u32,
    pub keyword_score: u32,
    pub experience_score: u32,
    pub recency_score: u32,
}

/// Computed compatibility between one resume and one job. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatch {
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub score: u32,
    pub breakdown: MatchBreakdown,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// A ranked recommendation: the job plus its match against the resume.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecommendation {
    pub job: Job,
    #[serde(rename = "match")]
    pub job_match: JobMatch,
}
