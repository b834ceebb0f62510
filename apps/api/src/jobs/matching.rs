//! Match Scoring — pluggable, trait-based scorer that measures a resume against a job.
//!
//! Default: `KeywordMatchScorer` (pure-Rust, deterministic, fully testable).
//!
//! `AppState` holds an `Arc<dyn MatchScorer>`, chosen at startup.

use std::collections::HashSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JobMatch, JobRecommendation, MatchBreakdown};
use crate::models::resume::StructuredResume;
use crate::text::{contains_term, normalize_skill, top_keywords};

/// Number of description keywords checked against the resume.
pub const KEYWORD_LIMIT: usize = 25;

/// Job postings lose half their recency score every 14 days.
pub const RECENCY_HALF_LIFE_DAYS: f64 = 14.0;

// ────────────────────────────────────────────────────────────────────────────
// Weights
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MatchWeights {
    pub skill_match: f64,
    pub keyword: f64,
    pub experience: f64,
    pub recency: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            skill_match: 0.5,
            keyword: 0.2,
            experience: 0.2,
            recency: 0.1,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Scores a resume snapshot against a job snapshot. Implement this to swap
/// backends without touching handlers.
///
/// Carried in `AppState` as `Arc<dyn MatchScorer>`.
#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn score(
        &self,
        resume_id: Uuid,
        resume: &StructuredResume,
        job: &Job,
        now: DateTime<Utc>,
    ) -> Result<JobMatch, AppError>;

    /// Short backend label, logged at startup.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordMatchScorer
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic skill/keyword scorer.
///
/// Algorithm:
/// 1. skill_match = matched required skills / required skills (100 when none are listed)
/// 2. keyword_score = share of the top description keywords found in the resume text
/// 3. experience_score = 0.6 × years-of-experience coverage + 0.4 × share of relevant roles
/// 4. recency_score = 0.5 ^ (posting age in days / 14)
/// 5. score = weighted mean of the four sub-scores
#[derive(Debug, Clone, Default)]
pub struct KeywordMatchScorer {
    pub weights: MatchWeights,
}

#[async_trait]
impl MatchScorer for KeywordMatchScorer {
    async fn score(
        &self,
        resume_id: Uuid,
        resume: &StructuredResume,
        job: &Job,
        now: DateTime<Utc>,
    ) -> Result<JobMatch, AppError> {
        Ok(compute_match(resume_id, resume, job, now, &self.weights))
    }

    fn backend(&self) -> &'static str {
        "keyword"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core algorithm
// ────────────────────────────────────────────────────────────────────────────

pub fn compute_match(
    resume_id: Uuid,
    resume: &StructuredResume,
    job: &Job,
    now: DateTime<Utc>,
    weights: &MatchWeights,
) -> JobMatch {
    let (matched_skills, missing_skills) = partition_skills(&resume.skills, &job.required_skills);
    let required_count = matched_skills.len() + missing_skills.len();
    let skill_match = if required_count == 0 {
        100
    } else {
        percent(matched_skills.len() as f64 / required_count as f64)
    };

    let keywords = top_keywords(&job.description, KEYWORD_LIMIT);
    let corpus = resume.corpus();
    let keyword_score = if keywords.is_empty() {
        0
    } else {
        let found = keywords.iter().filter(|k| contains_term(&corpus, k)).count();
        percent(found as f64 / keywords.len() as f64)
    };

    let mut relevance_terms: Vec<String> = job
        .required_skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .collect();
    relevance_terms.extend(keywords);

    let breakdown = MatchBreakdown {
        skill_match,
        keyword_score,
        experience_score: experience_score(resume, &job.description, &relevance_terms, now),
        recency_score: recency_score(job.posted_at, now),
    };

    JobMatch {
        job_id: job.id,
        resume_id,
        score: composite(&breakdown, weights),
        breakdown,
        matched_skills,
        missing_skills,
    }
}

/// Splits the job's required skills into those the resume lists and those it lacks.
///
/// Comparison is on `normalize_skill` forms; duplicates in `required` are
/// collapsed (first spelling wins) so the two lists never overlap and their
/// union is exactly the de-duplicated requirement set.
pub fn partition_skills(resume_skills: &[String], required: &[String]) -> (Vec<String>, Vec<String>) {
    let have: HashSet<String> = resume_skills.iter().map(|s| normalize_skill(s)).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for skill in required {
        let key = normalize_skill(skill);
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        let display = skill.trim().to_string();
        if have.contains(&key) {
            matched.push(display);
        } else {
            missing.push(display);
        }
    }

    (matched, missing)
}

fn required_years_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years|yrs)\b").expect("years pattern is valid")
    })
}

/// Largest "N years" / "N+ years" figure stated in a job description.
pub fn required_years(description: &str) -> Option<u32> {
    required_years_re()
        .captures_iter(description)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
}

/// Sum of role durations in whole years. Current roles run until `now`.
pub fn candidate_years(resume: &StructuredResume, now: DateTime<Utc>) -> u32 {
    resume
        .experience
        .iter()
        .filter_map(|e| {
            let start = e.start_year?;
            let end = e.end_year.unwrap_or(now.year());
            Some((end - start).max(0) as u32)
        })
        .sum()
}

fn experience_score(
    resume: &StructuredResume,
    description: &str,
    relevance_terms: &[String],
    now: DateTime<Utc>,
) -> u32 {
    let years = match required_years(description) {
        Some(required) if required > 0 => {
            (candidate_years(resume, now) as f64 / required as f64).min(1.0)
        }
        _ if resume.experience.is_empty() => 0.0,
        _ => 1.0,
    };

    let relevance = if resume.experience.is_empty() {
        0.0
    } else {
        let relevant = resume
            .experience
            .iter()
            .filter(|entry| {
                let text = format!("{}\n{}", entry.title, entry.bullets.join("\n")).to_lowercase();
                relevance_terms.iter().any(|t| contains_term(&text, t))
            })
            .count();
        relevant as f64 / resume.experience.len() as f64
    };

    percent(0.6 * years + 0.4 * relevance)
}

/// Exponential decay on posting age. Postings dated in the future count as fresh.
pub fn recency_score(posted_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let age_days = (now - posted_at).num_seconds() as f64 / 86_400.0;
    if age_days <= 0.0 {
        return 100;
    }
    percent(0.5_f64.powf(age_days / RECENCY_HALF_LIFE_DAYS))
}

/// Weighted mean of the breakdown, rounded and clamped to [0, 100].
pub fn composite(breakdown: &MatchBreakdown, weights: &MatchWeights) -> u32 {
    let total = weights.skill_match + weights.keyword + weights.experience + weights.recency;
    if total <= 0.0 {
        return 0;
    }
    let weighted = weights.skill_match * breakdown.skill_match as f64
        + weights.keyword * breakdown.keyword_score as f64
        + weights.experience * breakdown.experience_score as f64
        + weights.recency * breakdown.recency_score as f64;
    (weighted / total).round().clamp(0.0, 100.0) as u32
}

/// Orders recommendations best-first; ties go to the more recent posting.
pub fn rank(mut recommendations: Vec<JobRecommendation>, limit: usize) -> Vec<JobRecommendation> {
    recommendations.sort_by(|a, b| {
        b.job_match
            .score
            .cmp(&a.job_match.score)
            .then(b.job.posted_at.cmp(&a.job.posted_at))
    });
    recommendations.truncate(limit);
    recommendations
}

fn percent(fraction: f64) -> u32 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::ExperienceEntry;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn make_job(required: &[&str], description: &str, age_days: i64) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            company: None,
            location: None,
            description: description.to_string(),
            required_skills: required.iter().map(|s| s.to_string()).collect(),
            salary_min: None,
            salary_max: None,
            posted_at: now() - Duration::days(age_days),
        }
    }

    fn make_resume(skills: &[&str], experience: Vec<ExperienceEntry>) -> StructuredResume {
        StructuredResume {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience,
            ..Default::default()
        }
    }

    fn role(start: i32, end: Option<i32>, bullets: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            title: "Engineer".to_string(),
            company: Some("Acme".to_string()),
            start_year: Some(start),
            end_year: end,
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_partition_is_case_insensitive_and_disjoint() {
        let resume = vec!["rust".to_string(), "  PostgreSQL ".to_string()];
        let required = vec![
            "Rust".to_string(),
            "Kafka".to_string(),
            "postgresql".to_string(),
            "RUST".to_string(),
        ];
        let (matched, missing) = partition_skills(&resume, &required);
        assert_eq!(matched, vec!["Rust", "postgresql"]);
        assert_eq!(missing, vec!["Kafka"]);

        let matched_keys: HashSet<String> = matched.iter().map(|s| normalize_skill(s)).collect();
        let missing_keys: HashSet<String> = missing.iter().map(|s| normalize_skill(s)).collect();
        assert!(matched_keys.is_disjoint(&missing_keys));
        let union: HashSet<String> = matched_keys.union(&missing_keys).cloned().collect();
        let required_keys: HashSet<String> = required.iter().map(|s| normalize_skill(s)).collect();
        assert_eq!(union, required_keys);
    }

    #[test]
    fn test_no_required_skills_is_full_skill_match() {
        let job = make_job(&[], "", 0);
        let m = compute_match(Uuid::new_v4(), &make_resume(&[], vec![]), &job, now(), &MatchWeights::default());
        assert_eq!(m.breakdown.skill_match, 100);
        assert!(m.matched_skills.is_empty());
        assert!(m.missing_skills.is_empty());
    }

    #[test]
    fn test_recency_half_life() {
        assert_eq!(recency_score(now(), now()), 100);
        assert_eq!(recency_score(now() - Duration::days(14), now()), 50);
        assert_eq!(recency_score(now() - Duration::days(28), now()), 25);
        assert_eq!(recency_score(now() + Duration::days(3), now()), 100);
    }

    #[test]
    fn test_required_years_takes_largest_figure() {
        assert_eq!(required_years("3+ years of Go, 5 years of Rust"), Some(5));
        assert_eq!(required_years("Senior engineer"), None);
    }

    #[test]
    fn test_candidate_years_counts_current_roles_until_now() {
        let resume = make_resume(&[], vec![role(2019, None, &[]), role(2015, Some(2018), &[])]);
        assert_eq!(candidate_years(&resume, now()), 8);
    }

    #[test]
    fn test_experience_meets_stated_requirement() {
        let job = make_job(&["Rust"], "5+ years building Rust services", 0);
        let resume = make_resume(&["Rust"], vec![role(2018, None, &["Built Rust services"])]);
        let m = compute_match(Uuid::new_v4(), &resume, &job, now(), &MatchWeights::default());
        assert_eq!(m.breakdown.experience_score, 100);
    }

    #[test]
    fn test_experience_partial_years_and_no_relevance() {
        let job = make_job(&["Kafka"], "10 years required", 0);
        let resume = make_resume(&[], vec![role(2019, Some(2024), &["Wrote docs"])]);
        let m = compute_match(Uuid::new_v4(), &resume, &job, now(), &MatchWeights::default());
        // 0.6 × 5/10 + 0.4 × 0 = 0.3
        assert_eq!(m.breakdown.experience_score, 30);
    }

    #[test]
    fn test_keyword_score_counts_description_terms_in_resume() {
        let job = make_job(&[], "Kafka Kafka Terraform", 0);
        let resume = make_resume(&["Kafka"], vec![]);
        let m = compute_match(Uuid::new_v4(), &resume, &job, now(), &MatchWeights::default());
        assert_eq!(m.breakdown.keyword_score, 50);
    }

    #[test]
    fn test_empty_description_has_zero_keyword_score() {
        let job = make_job(&["Rust"], "", 0);
        let m = compute_match(Uuid::new_v4(), &make_resume(&["Rust"], vec![]), &job, now(), &MatchWeights::default());
        assert_eq!(m.breakdown.keyword_score, 0);
    }

    #[test]
    fn test_composite_is_weighted_sum() {
        let job = make_job(&["Rust", "Kafka"], "", 14);
        let resume = make_resume(&["rust"], vec![role(2020, None, &["Built Kafka consumers"])]);
        let m = compute_match(Uuid::new_v4(), &resume, &job, now(), &MatchWeights::default());
        assert_eq!(m.breakdown.skill_match, 50);
        assert_eq!(m.breakdown.keyword_score, 0);
        assert_eq!(m.breakdown.experience_score, 100);
        assert_eq!(m.breakdown.recency_score, 50);
        // 0.5×50 + 0.2×0 + 0.2×100 + 0.1×50 = 50
        assert_eq!(m.score, 50);
    }

    #[test]
    fn test_scores_always_bounded() {
        let jobs = [
            make_job(&[], "", 0),
            make_job(&["Rust", "Go", "Kafka"], "20+ years of Rust Go Kafka", 400),
            make_job(&["Rust"], "Rust rust RUST", -10),
        ];
        let resumes = [
            make_resume(&[], vec![]),
            make_resume(&["Rust", "Go", "Kafka"], vec![role(1990, None, &["Rust Go Kafka"])]),
        ];
        for job in &jobs {
            for resume in &resumes {
                let m = compute_match(Uuid::new_v4(), resume, job, now(), &MatchWeights::default());
                for v in [
                    m.score,
                    m.breakdown.skill_match,
                    m.breakdown.keyword_score,
                    m.breakdown.experience_score,
                    m.breakdown.recency_score,
                ] {
                    assert!(v <= 100);
                }
            }
        }
    }

    #[test]
    fn test_custom_weights_are_normalized() {
        let breakdown = MatchBreakdown {
            skill_match: 100,
            keyword_score: 0,
            experience_score: 0,
            recency_score: 0,
        };
        let weights = MatchWeights {
            skill_match: 2.0,
            keyword: 2.0,
            experience: 0.0,
            recency: 0.0,
        };
        assert_eq!(composite(&breakdown, &weights), 50);
    }

    #[test]
    fn test_rank_orders_by_score_then_recency() {
        let older = make_job(&[], "", 10);
        let newer = make_job(&[], "", 1);
        let best = make_job(&[], "", 30);
        let rec = |job: &Job, score: u32| JobRecommendation {
            job: job.clone(),
            job_match: JobMatch {
                job_id: job.id,
                resume_id: Uuid::nil(),
                score,
                breakdown: MatchBreakdown::default(),
                matched_skills: vec![],
                missing_skills: vec![],
            },
        };
        let ranked = rank(vec![rec(&older, 60), rec(&best, 90), rec(&newer, 60)], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].job.id, best.id);
        assert_eq!(ranked[1].job.id, newer.id);
    }

    #[tokio::test]
    async fn test_keyword_scorer_backend() {
        let scorer = KeywordMatchScorer::default();
        assert_eq!(scorer.backend(), "keyword");
        let job = make_job(&["Rust"], "", 0);
        let m = scorer
            .score(Uuid::nil(), &make_resume(&["RUST"], vec![]), &job, now())
            .await
            .unwrap();
        assert_eq!(m.matched_skills, vec!["Rust"]);
        assert_eq!(m.job_id, job.id);
    }

    #[tokio::test]
    async fn test_keyword_scorer_uses_its_weights() {
        let scorer = KeywordMatchScorer {
            weights: MatchWeights {
                skill_match: 1.0,
                keyword: 0.0,
                experience: 0.0,
                recency: 0.0,
            },
        };
        let job = make_job(&["Rust", "Go"], "", 300);
        let m = scorer
            .score(Uuid::nil(), &make_resume(&["Rust"], vec![]), &job, now())
            .await
            .unwrap();
        assert_eq!(m.score, 50);
    }
}
