//! Resume Parser — turns plain resume text into a `StructuredResume`.
//!
//! Line-oriented and heuristic: section headings switch the active section,
//! bullet lines attach to the entry above them, and everything else starts a
//! new entry (or fills in the company/dates of the entry just started).

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::resume::{
    EducationEntry, ExperienceEntry, ProjectEntry, SectionKind, StructuredResume,
};
use crate::text::{normalize_skill, tokenize};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("resume contains no text")]
    Empty,

    #[error("unsupported resume format: {0}")]
    UnsupportedFormat(String),

    #[error("could not read PDF: {0}")]
    Pdf(String),

    #[error("resume text is not valid UTF-8")]
    Encoding,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Header,
    Known(SectionKind),
    Ignored,
}

const BULLET_MARKERS: &[char] = &['-', '*', '•', '·', '▪', '●', '◦', '‣'];

const DEGREE_TOKENS: &[&str] = &[
    "bs", "bsc", "b.s", "b.sc", "b.a", "msc", "m.s", "m.sc", "m.a", "mba", "phd", "ph.d",
    "btech", "b.tech", "mtech", "m.tech", "b.e", "beng", "b.eng", "meng", "m.eng",
];

const DEGREE_WORDS: &[&str] = &["bachelor", "master", "doctor", "associate", "diploma"];

const MONTH: &str = r"(?:(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+)?";

fn year_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\b{MONTH}((?:19|20)\d{{2}})\s*(?:-|–|—|to)\s*{MONTH}((?:19|20)\d{{2}}|present|current|now)\b"
        ))
        .expect("year range pattern is valid")
    })
}

fn single_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b{MONTH}((?:19|20)\d{{2}})\b")).expect("year pattern is valid")
    })
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").expect("phone pattern is valid"))
}

/// Parses resume text into structured sections.
pub fn parse_resume(text: &str) -> Result<StructuredResume, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut resume = StructuredResume::default();
    let mut section = Section::Header;
    let mut header_lines = 0usize;
    let mut summary_lines: Vec<String> = Vec::new();
    let mut seen_skills: HashSet<String> = HashSet::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let line = match inline_heading(line, section) {
            Some((kind, rest)) => {
                enter_section(&mut resume, &mut section, Section::Known(kind));
                rest
            }
            None => {
                if let Some(next) = heading(line) {
                    enter_section(&mut resume, &mut section, next);
                    continue;
                }
                line
            }
        };

        match section {
            Section::Header => {
                if header_lines == 0 && looks_like_name(line) {
                    resume.contact.name = Some(line.to_string());
                }
                header_lines += 1;
            }
            Section::Ignored => {}
            Section::Known(SectionKind::Summary) => {
                summary_lines.push(strip_bullet(line).unwrap_or(line).to_string());
            }
            Section::Known(SectionKind::Skills) => {
                push_skills(line, &mut resume.skills, &mut seen_skills);
            }
            Section::Known(SectionKind::Experience) => {
                push_experience_line(line, &mut resume.experience);
            }
            Section::Known(SectionKind::Projects) => {
                push_project_line(line, &mut resume.projects);
            }
            Section::Known(SectionKind::Education) => {
                push_education_line(line, &mut resume.education);
            }
        }
    }

    if !summary_lines.is_empty() {
        resume.summary = Some(summary_lines.join(" "));
    }
    resume.contact.email = email_re().find(text).map(|m| m.as_str().to_string());
    resume.contact.phone = find_phone(text);

    Ok(resume)
}

fn heading(line: &str) -> Option<Section> {
    let cleaned = line.trim_end_matches(':').trim();
    if cleaned.is_empty() || cleaned.split_whitespace().count() > 4 {
        return None;
    }
    let key = cleaned.to_lowercase();
    let section = match key.as_str() {
        "summary" | "professional summary" | "profile" | "professional profile" | "objective"
        | "career objective" | "about" | "about me" => Section::Known(SectionKind::Summary),
        "experience" | "work experience" | "professional experience" | "employment"
        | "employment history" | "work history" | "relevant experience" => {
            Section::Known(SectionKind::Experience)
        }
        "projects" | "personal projects" | "academic projects" | "key projects"
        | "selected projects" => Section::Known(SectionKind::Projects),
        "education" | "academic background" | "education & training" => {
            Section::Known(SectionKind::Education)
        }
        "skills" | "technical skills" | "core competencies" | "technologies" | "tech stack"
        | "skills & tools" | "skills and tools" | "core skills" => {
            Section::Known(SectionKind::Skills)
        }
        "contact" | "contact information" | "contact info" => Section::Header,
        "certifications" | "certificates" | "awards" | "honors" | "publications" | "languages"
        | "interests" | "hobbies" | "volunteer" | "volunteering" | "references"
        | "achievements" | "activities" => Section::Ignored,
        _ => return None,
    };
    Some(section)
}

fn enter_section(resume: &mut StructuredResume, section: &mut Section, next: Section) {
    *section = next;
    if let Section::Known(kind) = next {
        if !resume.sections.contains(&kind) {
            resume.sections.push(kind);
        }
    }
}

/// `Skills: Rust, Go` style lines: a known heading and its content on one line.
///
/// Labels that already mean something in the current section (skill categories
/// under Skills, `Tech Stack:` under a project) are left to that section's handler.
fn inline_heading(line: &str, current: Section) -> Option<(SectionKind, &str)> {
    let (label, rest) = line.split_once(':')?;
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    let Some(Section::Known(kind)) = heading(label) else {
        return None;
    };
    if current == Section::Known(kind) || current == Section::Known(SectionKind::Skills) {
        return None;
    }
    if current == Section::Known(SectionKind::Projects) && tech_line(line).is_some() {
        return None;
    }
    Some((kind, rest))
}

fn looks_like_name(line: &str) -> bool {
    let words = line.split_whitespace().count();
    (1..=5).contains(&words)
        && !line.contains('@')
        && !line.to_lowercase().contains("http")
        && !line.chars().any(|c| c.is_ascii_digit())
}

fn find_phone(text: &str) -> Option<String> {
    phone_re()
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|candidate| {
            let digits = candidate.chars().filter(|c| c.is_ascii_digit()).count();
            (10..=15).contains(&digits)
        })
        .map(str::to_string)
}

fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let first = trimmed.chars().next()?;
    if !BULLET_MARKERS.contains(&first) {
        return None;
    }
    let rest = trimmed[first.len_utf8()..].trim();
    (!rest.is_empty()).then_some(rest)
}

/// Prose lines are sentences rather than headers: they end with a period or run long.
fn is_prose(line: &str) -> bool {
    line.ends_with('.') || line.split_whitespace().count() > 10
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', '|', '•', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tidies what is left of a line after dates are cut out: collapses whitespace,
/// drops emptied parentheses and dangling separators.
fn clean_fragment(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("( )", "")
        .replace("()", "");
    let mut out = collapsed.as_str();
    loop {
        let next = out.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | '|' | '-' | '–' | '—' | '@')
        });
        let next = next.strip_suffix('(').unwrap_or(next);
        let next = next.strip_prefix(')').unwrap_or(next);
        if next.len() == out.len() {
            break;
        }
        out = next;
    }
    out.to_string()
}

struct Dated {
    text: String,
    start_year: Option<i32>,
    end_year: Option<i32>,
    has_dates: bool,
}

fn split_dates(line: &str) -> Dated {
    if let Some(caps) = year_range_re().captures(line) {
        if let Some(whole) = caps.get(0) {
            let end_year = match caps[2].to_lowercase().as_str() {
                "present" | "current" | "now" => None,
                year => year.parse().ok(),
            };
            let rest = format!("{} {}", &line[..whole.start()], &line[whole.end()..]);
            return Dated {
                text: clean_fragment(&rest),
                start_year: caps[1].parse().ok(),
                end_year,
                has_dates: true,
            };
        }
    }

    if let Some(caps) = single_year_re().captures(line) {
        if let Some(whole) = caps.get(0) {
            let year = caps[1].parse().ok();
            let rest = format!("{} {}", &line[..whole.start()], &line[whole.end()..]);
            return Dated {
                text: clean_fragment(&rest),
                start_year: year,
                end_year: year,
                has_dates: true,
            };
        }
    }

    Dated {
        text: clean_fragment(line),
        start_year: None,
        end_year: None,
        has_dates: false,
    }
}

/// Splits `Title at Company`, `Title | Company`, `Title, Company` and friends.
fn split_role(header: &str) -> (String, Option<String>) {
    // ASCII lowercasing keeps byte offsets aligned with `header`.
    let lower = header.to_ascii_lowercase();
    for sep in [" at ", " @ ", " | ", " — ", " – ", " - ", ", "] {
        if let Some(idx) = lower.find(sep) {
            let title = header[..idx].trim();
            let company = header[idx + sep.len()..].trim();
            if !title.is_empty() && !company.is_empty() {
                return (title.to_string(), Some(company.to_string()));
            }
        }
    }
    (header.trim().to_string(), None)
}

fn push_skills(line: &str, skills: &mut Vec<String>, seen: &mut HashSet<String>) {
    let body = strip_bullet(line).unwrap_or(line);
    let body = match body.split_once(':') {
        Some((_, rest)) => rest,
        None => body,
    };
    for skill in split_list(body) {
        if skill.chars().count() > 40 {
            continue;
        }
        if seen.insert(normalize_skill(&skill)) {
            skills.push(skill);
        }
    }
}

fn push_experience_line(line: &str, entries: &mut Vec<ExperienceEntry>) {
    if let Some(bullet) = strip_bullet(line) {
        match entries.last_mut() {
            Some(entry) => entry.bullets.push(bullet.to_string()),
            None => entries.push(ExperienceEntry {
                bullets: vec![bullet.to_string()],
                ..Default::default()
            }),
        }
        return;
    }

    let dated = split_dates(line);

    if let Some(current) = entries.last_mut() {
        if current.bullets.is_empty() {
            if dated.text.is_empty() && dated.has_dates {
                if current.start_year.is_none() {
                    current.start_year = dated.start_year;
                    current.end_year = dated.end_year;
                }
                return;
            }
            let (_, company) = split_role(&dated.text);
            if current.company.is_none()
                && current.start_year.is_none()
                && company.is_none()
                && !is_prose(line)
            {
                current.company = Some(dated.text);
                if dated.has_dates {
                    current.start_year = dated.start_year;
                    current.end_year = dated.end_year;
                }
                return;
            }
        }
        if is_prose(line) {
            current.bullets.push(line.to_string());
            return;
        }
    }

    let (title, company) = split_role(&dated.text);
    entries.push(ExperienceEntry {
        title,
        company,
        start_year: dated.start_year,
        end_year: dated.end_year,
        bullets: Vec::new(),
    });
}

fn tech_line(line: &str) -> Option<Vec<String>> {
    let (label, rest) = line.split_once(':')?;
    let label = label.trim().to_lowercase();
    matches!(
        label.as_str(),
        "tech" | "technologies" | "tech stack" | "stack" | "built with" | "tools"
    )
    .then(|| split_list(rest))
}

fn push_project_line(line: &str, projects: &mut Vec<ProjectEntry>) {
    if let Some(bullet) = strip_bullet(line) {
        match projects.last_mut() {
            Some(project) => project.bullets.push(bullet.to_string()),
            None => projects.push(ProjectEntry {
                bullets: vec![bullet.to_string()],
                ..Default::default()
            }),
        }
        return;
    }

    if let Some(project) = projects.last_mut() {
        if let Some(tech) = tech_line(line) {
            project.tech_stack.extend(tech);
            return;
        }
        if is_prose(line) {
            project.bullets.push(line.to_string());
            return;
        }
    }

    let header = split_dates(line).text;
    let mut project = ProjectEntry::default();

    if let (Some(open), true) = (header.find('('), header.ends_with(')')) {
        project.name = header[..open].trim().to_string();
        project.tech_stack = split_list(&header[open + 1..header.len() - 1]);
    } else if let Some((name, tech)) = header.split_once('|') {
        project.name = name.trim().to_string();
        project.tech_stack = split_list(tech);
    } else if let Some((name, description)) = header
        .split_once(" - ")
        .or_else(|| header.split_once(" — "))
        .or_else(|| header.split_once(": "))
    {
        project.name = name.trim().to_string();
        if !description.trim().is_empty() {
            project.bullets.push(description.trim().to_string());
        }
    } else {
        project.name = header;
    }

    projects.push(project);
}

fn is_degree(text: &str) -> bool {
    let lower = text.to_lowercase();
    DEGREE_WORDS.iter().any(|w| lower.contains(w))
        || tokenize(text)
            .iter()
            .any(|t| DEGREE_TOKENS.contains(&t.as_str()))
}

fn parse_education(text: &str, year: Option<i32>) -> EducationEntry {
    let normalized = text.replace(" - ", "|");
    let segments: Vec<&str> = normalized
        .split([',', '|', '—', '–'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if !segments.iter().any(|s| is_degree(s)) {
        return EducationEntry {
            institution: text.to_string(),
            degree: None,
            year,
        };
    }

    let institution_idx = segments
        .iter()
        .position(|s| {
            let lower = s.to_lowercase();
            ["university", "college", "institute", "school", "academy"]
                .iter()
                .any(|w| lower.contains(w))
        })
        .or_else(|| segments.iter().position(|s| !is_degree(s)));

    let institution = institution_idx
        .map(|i| segments[i].to_string())
        .unwrap_or_default();
    let degree = segments
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != institution_idx)
        .map(|(_, s)| *s)
        .collect::<Vec<_>>()
        .join(", ");

    EducationEntry {
        institution,
        degree: (!degree.is_empty()).then_some(degree),
        year,
    }
}

fn push_education_line(line: &str, entries: &mut Vec<EducationEntry>) {
    if strip_bullet(line).is_some() {
        return;
    }

    let dated = split_dates(line);
    let year = dated.end_year.or(dated.start_year);

    if let Some(current) = entries.last_mut() {
        if dated.text.is_empty() {
            if current.year.is_none() {
                current.year = year;
            }
            return;
        }
        let degree_line = is_degree(&dated.text);
        if current.institution.is_empty() && !degree_line {
            current.institution = dated.text;
            current.year = current.year.or(year);
            return;
        }
        if current.degree.is_none() && degree_line && !current.institution.is_empty() {
            let parsed = parse_education(&dated.text, year);
            if parsed.institution.is_empty() {
                current.degree = parsed.degree;
                current.year = current.year.or(year);
                return;
            }
        }
    }

    if dated.text.is_empty() {
        return;
    }
    entries.push(parse_education(&dated.text, year));
}
