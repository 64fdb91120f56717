//! Per-source filter rules evaluated against normalized content.

use crate::model::{FilterRules, NewContent};

/// Returns true when `content` satisfies every clause of `rules`.
///
/// Clauses are AND-combined and checked in order, stopping at the first
/// failure: keyword allow-list, exclude list, minimum then maximum length of
/// the processed body (in characters). Keyword matching is a case-folded
/// substring search over the title and processed body. Blank terms are
/// dropped first, so a list holding only blank terms imposes no constraint.
pub fn passes(content: &NewContent, rules: &FilterRules) -> bool {
    let keywords = terms(&rules.keywords);
    let exclude = terms(&rules.exclude);

    let haystack = if keywords.is_empty() && exclude.is_empty() {
        String::new()
    } else {
        format!("{} {}", content.title, content.processed_content).to_lowercase()
    };

    if !keywords.is_empty() && !keywords.iter().any(|t| haystack.contains(t.as_str())) {
        return false;
    }

    if exclude.iter().any(|t| haystack.contains(t.as_str())) {
        return false;
    }

    let length = content.processed_content.chars().count();

    if rules.min_length.is_some_and(|min| length < min) {
        return false;
    }

    if rules.max_length.is_some_and(|max| length > max) {
        return false;
    }

    true
}

/// Trimmed, lowercased, non-blank terms.
fn terms(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
