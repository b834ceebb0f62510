use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub title: String,
    pub company: Option<String>,
    pub start_year: Option<i32>,
    /// `None` means the position is current.
    pub end_year: Option<i32>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub name: String,
    pub tech_stack: Vec<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub institution: String,
    pub degree: Option<String>,
    pub year: Option<i32>,
}

/// Sections a parsed resume can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Summary,
    Experience,
    Projects,
    Education,
    Skills,
}

/// Structured view of a resume, produced by `resumes::parser`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredResume {
    pub contact: Contact,
    pub summary: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub education: Vec<EducationEntry>,
    /// Section headings found in the source document, in order.
    pub sections: Vec<SectionKind>,
}

impl StructuredResume {
    /// Every bullet across experience and projects.
    pub fn bullets(&self) -> impl Iterator<Item = &str> {
        self.experience
            .iter()
            .flat_map(|e| e.bullets.iter())
            .chain(self.projects.iter().flat_map(|p| p.bullets.iter()))
            .map(String::as_str)
    }

    /// Lowercased text of everything a recruiter could match keywords against.
    pub fn corpus(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(self.skills.iter().map(String::as_str));
        if let Some(summary) = &self.summary {
            parts.push(summary);
        }
        for entry in &self.experience {
            parts.push(&entry.title);
            if let Some(company) = &entry.company {
                parts.push(company);
            }
            parts.extend(entry.bullets.iter().map(String::as_str));
        }
        for project in &self.projects {
            parts.push(&project.name);
            parts.extend(project.tech_stack.iter().map(String::as_str));
            parts.extend(project.bullets.iter().map(String::as_str));
        }
        parts.join("\n").to_lowercase()
    }
}

/// ATS sub-scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub skill_match: u32,
    pub project_strength: u32,
    pub experience_relevance: u32,
    pub resume_structure: u32,
    pub keyword_density: u32,
    pub action_verbs: u32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub version: i32,
    pub is_primary: bool,
    pub file_key: String,
    pub content_type: String,
    pub raw_text: String,
    pub structured_data: Json<StructuredResume>,
    pub ats_score: Option<i32>,
    pub score_breakdown: Option<Json<ScoreBreakdown>>,
    pub suggestions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Resume as returned by the REST API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub version: i32,
    pub is_primary: bool,
    pub file_key: String,
    pub content_type: String,
    pub structured_data: StructuredResume,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ats_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,
    pub suggestions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ResumeRow> for Resume {
    fn from(row: ResumeRow) -> Self {
        Resume {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            version: row.version,
            is_primary: row.is_primary,
            file_key: row.file_key,
            content_type: row.content_type,
            structured_data: row.structured_data.0,
            ats_score: row.ats_score.map(|s| s.clamp(0, 100) as u32),
            score_breakdown: row.score_breakdown.map(|b| b.0),
            suggestions: row.suggestions,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ats_score: Option<i32>) -> ResumeRow {
        ResumeRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "resume".to_string(),
            version: 1,
            is_primary: true,
            file_key: "resumes/x.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            raw_text: String::new(),
            structured_data: Json(StructuredResume::default()),
            ats_score,
            score_breakdown: ats_score.map(|_| Json(ScoreBreakdown::default())),
            suggestions: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unscored_resume_omits_ats_fields() {
        let json = serde_json::to_value(Resume::from(row(None))).unwrap();
        assert!(json.get("atsScore").is_none());
        assert!(json.get("scoreBreakdown").is_none());
        assert_eq!(json["isPrimary"], true);
        assert_eq!(json["fileKey"], "resumes/x.pdf");
        assert_eq!(json["contentType"], "application/pdf");
        assert!(json.get("rawText").is_none());
    }

    #[test]
    fn test_scored_resume_uses_camel_case_breakdown() {
        let json = serde_json::to_value(Resume::from(row(Some(72)))).unwrap();
        assert_eq!(json["atsScore"], 72);
        assert!(json["scoreBreakdown"].get("experienceRelevance").is_some());
        assert!(json["structuredData"].get("skills").is_some());
    }

    #[test]
    fn test_corpus_includes_skills_and_bullets() {
        let resume = StructuredResume {
            skills: vec!["Rust".to_string()],
            experience: vec![ExperienceEntry {
                title: "Engineer".to_string(),
                bullets: vec!["Shipped Kafka consumers".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let corpus = resume.corpus();
        assert!(corpus.contains("rust"));
        assert!(corpus.contains("kafka consumers"));
        assert_eq!(resume.bullets().count(), 1);
    }
}
