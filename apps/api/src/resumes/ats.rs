//! ATS Scoring — rates how well a parsed resume will survive an applicant tracking system.
//!
//! Pure, deterministic, no I/O. Six sub-scores in [0, 100] are combined with
//! fixed weights into `atsScore`:
//!
//! | sub-score             | weight |
//! |-----------------------|--------|
//! | skill_match           | 0.25   |
//! | project_strength      | 0.15   |
//! | experience_relevance  | 0.25   |
//! | resume_structure      | 0.15   |
//! | keyword_density       | 0.10   |
//! | action_verbs          | 0.10   |

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::resume::{ScoreBreakdown, SectionKind, StructuredResume};
use crate::text::{count_term, is_quantified, normalize_skill, tokenize};

/// Distinct skills needed for a full skill-breadth score.
const TARGET_SKILL_COUNT: f64 = 12.0;

/// Keyword density band (own skills per word) that earns a full score.
const DENSITY_FLOOR: f64 = 0.015;
const DENSITY_CEILING: f64 = 0.06;
/// Density at which keyword stuffing scores zero.
const DENSITY_STUFFED: f64 = 0.15;

/// Sub-scores under this value produce a suggestion.
const SUGGESTION_THRESHOLD: u32 = 60;

const ACTION_VERBS: &[&str] = &[
    "accelerated", "achieved", "architected", "automated", "built", "championed", "configured",
    "created", "cut", "debugged", "delivered", "deployed", "designed", "developed", "directed",
    "drove", "eliminated", "engineered", "established", "expanded", "implemented", "improved",
    "increased", "integrated", "introduced", "launched", "led", "managed", "mentored",
    "migrated", "optimized", "orchestrated", "owned", "pioneered", "reduced", "refactored",
    "resolved", "scaled", "shipped", "spearheaded", "streamlined", "tested", "trained",
    "transformed", "wrote",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsWeights {
    pub skill_match: f64,
    pub project_strength: f64,
    pub experience_relevance: f64,
    pub resume_structure: f64,
    pub keyword_density: f64,
    pub action_verbs: f64,
}

impl Default for AtsWeights {
    fn default() -> Self {
        Self {
            skill_match: 0.25,
            project_strength: 0.15,
            experience_relevance: 0.25,
            resume_structure: 0.15,
            keyword_density: 0.10,
            action_verbs: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsReport {
    pub ats_score: u32,
    pub breakdown: ScoreBreakdown,
    pub suggestions: Vec<String>,
}

/// Scores a parsed resume. `raw_text` is the extracted document text, used for density.
pub fn score_resume(resume: &StructuredResume, raw_text: &str) -> AtsReport {
    let breakdown = ScoreBreakdown {
        skill_match: skill_breadth(resume),
        project_strength: project_strength(resume),
        experience_relevance: experience_relevance(resume),
        resume_structure: resume_structure(resume),
        keyword_density: keyword_density(resume, raw_text),
        action_verbs: action_verbs(resume),
    };

    AtsReport {
        ats_score: composite(&breakdown, &AtsWeights::default()),
        suggestions: build_suggestions(&breakdown),
        breakdown,
    }
}

/// Weighted aggregate of the breakdown, rounded and clamped to [0, 100].
pub fn composite(breakdown: &ScoreBreakdown, weights: &AtsWeights) -> u32 {
    let total_weight = weights.skill_match
        + weights.project_strength
        + weights.experience_relevance
        + weights.resume_structure
        + weights.keyword_density
        + weights.action_verbs;
    if total_weight <= 0.0 {
        return 0;
    }
    let weighted = weights.skill_match * breakdown.skill_match as f64
        + weights.project_strength * breakdown.project_strength as f64
        + weights.experience_relevance * breakdown.experience_relevance as f64
        + weights.resume_structure * breakdown.resume_structure as f64
        + weights.keyword_density * breakdown.keyword_density as f64
        + weights.action_verbs * breakdown.action_verbs as f64;
    (weighted / total_weight).round().clamp(0.0, 100.0) as u32
}

fn percent(fraction: f64) -> u32 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u32
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn distinct_skills(resume: &StructuredResume) -> HashSet<String> {
    resume
        .skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn skill_breadth(resume: &StructuredResume) -> u32 {
    percent((distinct_skills(resume).len() as f64 / TARGET_SKILL_COUNT).min(1.0))
}

fn project_strength(resume: &StructuredResume) -> u32 {
    percent(mean(resume.projects.iter().map(|p| {
        let mut score = 0.0;
        if !p.tech_stack.is_empty() {
            score += 0.4;
        }
        if !p.bullets.is_empty() {
            score += 0.3;
        }
        if p.bullets.iter().any(|b| is_quantified(b)) {
            score += 0.3;
        }
        score
    })))
}

fn experience_relevance(resume: &StructuredResume) -> u32 {
    percent(mean(resume.experience.iter().map(|e| {
        let mut score = 0.0;
        if e.start_year.is_some() {
            score += 0.3;
        }
        if e.bullets.len() >= 2 {
            score += 0.3;
        }
        if !e.bullets.is_empty() {
            let quantified = e.bullets.iter().filter(|b| is_quantified(b)).count();
            score += 0.4 * quantified as f64 / e.bullets.len() as f64;
        }
        score
    })))
}

fn resume_structure(resume: &StructuredResume) -> u32 {
    let has = |kind: SectionKind| resume.sections.contains(&kind);
    let present = [
        resume.contact.email.is_some() || resume.contact.phone.is_some(),
        has(SectionKind::Summary) || resume.summary.is_some(),
        has(SectionKind::Experience) || !resume.experience.is_empty(),
        has(SectionKind::Education) || !resume.education.is_empty(),
        has(SectionKind::Skills) || !resume.skills.is_empty(),
        has(SectionKind::Projects) || !resume.projects.is_empty(),
    ];
    let count = present.iter().filter(|p| **p).count();
    percent(count as f64 / present.len() as f64)
}

fn keyword_density(resume: &StructuredResume, raw_text: &str) -> u32 {
    let words = tokenize(raw_text).len();
    let skills = distinct_skills(resume);
    if words == 0 || skills.is_empty() {
        return 0;
    }

    let haystack = raw_text.to_lowercase();
    let occurrences: usize = skills.iter().map(|s| count_term(&haystack, s)).sum();
    let density = occurrences as f64 / words as f64;

    let fraction = if density < DENSITY_FLOOR {
        density / DENSITY_FLOOR
    } else if density <= DENSITY_CEILING {
        1.0
    } else if density < DENSITY_STUFFED {
        1.0 - (density - DENSITY_CEILING) / (DENSITY_STUFFED - DENSITY_CEILING)
    } else {
        0.0
    };
    percent(fraction)
}

fn starts_with_action_verb(bullet: &str) -> bool {
    bullet
        .split_whitespace()
        .next()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .is_some_and(|w| ACTION_VERBS.contains(&w.as_str()))
}

fn action_verbs(resume: &StructuredResume) -> u32 {
    let bullets: Vec<&str> = resume.bullets().collect();
    if bullets.is_empty() {
        return 0;
    }
    let strong = bullets.iter().filter(|b| starts_with_action_verb(b)).count();
    percent(strong as f64 / bullets.len() as f64)
}

fn build_suggestions(breakdown: &ScoreBreakdown) -> Vec<String> {
    let checks = [
        (
            breakdown.skill_match,
            "List more of your relevant skills in a dedicated Skills section.",
        ),
        (
            breakdown.project_strength,
            "Give each project a tech stack and at least one quantified result.",
        ),
        (
            breakdown.experience_relevance,
            "Add dates and two or more quantified bullets to each role.",
        ),
        (
            breakdown.resume_structure,
            "Include contact details plus Summary, Experience, Education, Skills and Projects sections.",
        ),
        (
            breakdown.keyword_density,
            "Mention your key skills in context throughout the resume without keyword stuffing.",
        ),
        (
            breakdown.action_verbs,
            "Start bullets with strong action verbs such as 'Led', 'Built' or 'Reduced'.",
        ),
    ];
    checks
        .into_iter()
        .filter(|(score, _)| *score < SUGGESTION_THRESHOLD)
        .map(|(_, text)| text.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Contact, EducationEntry, ExperienceEntry, ProjectEntry};

    fn strong_resume() -> StructuredResume {
        StructuredResume {
            contact: Contact {
                name: Some("Jane Doe".to_string()),
                email: Some("jane@example.com".to_string()),
                phone: None,
            },
            summary: Some("Backend engineer".to_string()),
            skills: [
                "Rust", "Go", "Python", "Kafka", "Kubernetes", "Docker", "PostgreSQL", "Redis",
                "AWS", "Terraform", "gRPC", "Linux",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            experience: vec![ExperienceEntry {
                title: "Senior Engineer".to_string(),
                company: Some("Acme".to_string()),
                start_year: Some(2019),
                end_year: None,
                bullets: vec![
                    "Led migration of 40 services to Kubernetes".to_string(),
                    "Reduced p99 latency by 35%".to_string(),
                ],
            }],
            projects: vec![ProjectEntry {
                name: "Ledger".to_string(),
                tech_stack: vec!["Rust".to_string()],
                bullets: vec!["Built an engine handling 10k tx/s".to_string()],
            }],
            education: vec![EducationEntry {
                institution: "Stanford".to_string(),
                degree: Some("B.S.".to_string()),
                year: Some(2016),
            }],
            sections: vec![
                SectionKind::Summary,
                SectionKind::Experience,
                SectionKind::Projects,
                SectionKind::Education,
                SectionKind::Skills,
            ],
        }
    }

    #[test]
    fn test_empty_resume_scores_zero() {
        let report = score_resume(&StructuredResume::default(), "");
        assert_eq!(report.ats_score, 0);
        assert_eq!(report.breakdown, ScoreBreakdown::default());
        assert_eq!(report.suggestions.len(), 6);
    }

    #[test]
    fn test_strong_resume_maxes_structural_scores() {
        let report = score_resume(&strong_resume(), "");
        assert_eq!(report.breakdown.skill_match, 100);
        assert_eq!(report.breakdown.project_strength, 100);
        assert_eq!(report.breakdown.experience_relevance, 100);
        assert_eq!(report.breakdown.resume_structure, 100);
        assert_eq!(report.breakdown.action_verbs, 100);
    }

    #[test]
    fn test_composite_is_weighted_sum_of_breakdown() {
        let breakdown = ScoreBreakdown {
            skill_match: 80,
            project_strength: 60,
            experience_relevance: 40,
            resume_structure: 100,
            keyword_density: 50,
            action_verbs: 20,
        };
        // 0.25*80 + 0.15*60 + 0.25*40 + 0.15*100 + 0.10*50 + 0.10*20 = 61
        assert_eq!(composite(&breakdown, &AtsWeights::default()), 61);
    }

    #[test]
    fn test_all_scores_bounded() {
        let resume = strong_resume();
        let stuffed = "rust ".repeat(500);
        let report = score_resume(&resume, &stuffed);
        for value in [
            report.ats_score,
            report.breakdown.skill_match,
            report.breakdown.project_strength,
            report.breakdown.experience_relevance,
            report.breakdown.resume_structure,
            report.breakdown.keyword_density,
            report.breakdown.action_verbs,
        ] {
            assert!(value <= 100, "value {value} out of range");
        }
        assert_eq!(report.breakdown.keyword_density, 0, "stuffed text must score zero");
    }

    #[test]
    fn test_keyword_density_band_scores_full() {
        let resume = StructuredResume {
            skills: vec!["Rust".to_string()],
            ..Default::default()
        };
        // 3 mentions in 100 words = 3% density, inside the band
        let mut words = vec!["word"; 97];
        words.extend(["rust", "rust", "rust"]);
        assert_eq!(keyword_density(&resume, &words.join(" ")), 100);
    }

    #[test]
    fn test_keyword_density_below_floor_ramps() {
        let resume = StructuredResume {
            skills: vec!["Rust".to_string()],
            ..Default::default()
        };
        // 1 mention in 200 words = 0.5% density, a third of the floor
        let mut words = vec!["word"; 199];
        words.push("rust");
        assert_eq!(keyword_density(&resume, &words.join(" ")), 33);
    }

    #[test]
    fn test_action_verbs_ratio() {
        let resume = StructuredResume {
            experience: vec![ExperienceEntry {
                bullets: vec![
                    "Led the platform team".to_string(),
                    "Responsible for deployments".to_string(),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(action_verbs(&resume), 50);
    }

    #[test]
    fn test_unquantified_experience_is_partial() {
        let resume = StructuredResume {
            experience: vec![ExperienceEntry {
                start_year: Some(2020),
                bullets: vec!["Helped with things".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        // dated (0.3), one bullet (0), nothing quantified (0)
        assert_eq!(experience_relevance(&resume), 30);
    }

    #[test]
    fn test_suggestions_only_for_weak_scores() {
        let report = score_resume(&strong_resume(), "");
        assert_eq!(
            report.suggestions,
            vec!["Mention your key skills in context throughout the resume without keyword stuffing."
                .to_string()]
        );
    }
}
