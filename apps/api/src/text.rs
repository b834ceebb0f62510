//! Text helpers shared by the resume parser, the ATS scorer, and job matching.

use std::collections::HashMap;

/// Common English words and job-posting filler ignored when extracting keywords.
const STOP_WORDS: &[&str] = &[
    "a", "about", "across", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "both", "but", "by", "can", "do", "each", "etc", "for", "from", "has", "have", "help", "how",
    "in", "into", "is", "it", "its", "join", "like", "looking", "more", "must", "new", "not",
    "of", "on", "or", "our", "over", "plus", "role", "such", "team", "that", "the", "their",
    "them", "they", "this", "to", "up", "us", "using", "we", "what", "where", "who", "will",
    "with", "within", "work", "you", "your", "year", "years", "experience", "strong", "ability",
    "including", "preferred", "required", "requirements", "responsibilities", "nice", "have",
    "other", "well", "good", "great", "excellent", "knowledge", "skills", "candidate",
];

/// Canonical form used for every case-insensitive skill comparison:
/// trimmed, lowercased, internal whitespace collapsed, trailing `.`, `,` and `;` removed.
pub fn normalize_skill(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(['.', ',', ';'])
        .trim()
        .to_lowercase()
}

/// Splits text into lowercase word tokens. `+`, `#` and inner `.` are kept so
/// that `C++`, `C#` and `Node.js` survive as single tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Returns up to `limit` keywords from `text`, ranked by frequency and then
/// by first occurrence. Tokens shorter than 3 chars, stop words, and pure
/// numbers are dropped.
pub fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, token) in tokenize(text).into_iter().enumerate() {
        if token.chars().count() < 3
            || is_stop_word(&token)
            || token.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        let entry = counts.entry(token).or_insert((0, position));
        entry.0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(token, (count, first))| (token, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(limit).map(|(t, _, _)| t).collect()
}

/// True when `term` occurs in `haystack` on word boundaries.
/// Both arguments are expected to be lowercase already.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '+' || c == '#';
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Counts word-boundary occurrences of `term` in `haystack` (both lowercase).
pub fn count_term(haystack: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '+' || c == '#';
    haystack
        .match_indices(term)
        .filter(|(start, _)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + term.len()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
        .count()
}

/// A bullet is quantified when it carries a number, a percentage, or a currency amount.
pub fn is_quantified(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        || text.contains('%')
        || text.contains('$')
        || text.contains('€')
        || text.contains('£')
}
