use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ResumeUploaded,
    ResumeDeleted,
    PrimaryChanged,
    ResumeRescored,
    JobMatched,
}

/// One entry of a user's recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub kind: ActivityKind,
    pub message: String,
    pub resource_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl Activity {
    pub fn now(kind: ActivityKind, message: impl Into<String>, resource_id: Option<Uuid>) -> Self {
        Activity {
            kind,
            message: message.into(),
            resource_id,
            occurred_at: Utc::now(),
        }
    }
}

/// Aggregates shown on the dashboard landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_resumes: i64,
    pub scored_resumes: i64,
    pub average_ats_score: u32,
    pub best_ats_score: u32,
    pub primary_resume_id: Option<Uuid>,
    pub jobs_available: i64,
    pub new_jobs_this_week: i64,
}
