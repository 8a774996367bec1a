//! Free-text answer comparison.

/// Leading articles ignored when comparing free-text answers.
pub const ARTICLES: [&str; 8] = ["el", "la", "los", "las", "un", "una", "unos", "unas"];

/// Lowercases, trims and collapses inner whitespace.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops one leading article token, if present.
///
/// Only a whole first word counts: `"la"` is stripped from `"la casa"` but
/// `"lapiz"` is left alone.
#[must_use]
pub fn strip_article(normalized: &str) -> &str {
    match normalized.split_once(' ') {
        Some((first, rest)) if ARTICLES.contains(&first) => rest,
        _ => normalized,
    }
}

/// Whether a typed answer matches the expected one.
///
/// Case-insensitive, whitespace-trimmed, tolerant of an optional leading
/// article on either side. Anything else must match exactly; there is no
/// substring matching.
#[must_use]
pub fn answers_match(candidate: &str, expected: &str) -> bool {
    let candidate = normalize(candidate);
    let expected = normalize(expected);
    if candidate.is_empty() {
        return false;
    }
    candidate == expected || strip_article(&candidate) == strip_article(&expected)
}
