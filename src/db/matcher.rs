//! Exact search predicate evaluation.
//!
//! Backends only narrow the candidate set; this module is the single source
//! of truth for whether a memory matches a query. Text matching is
//! case-insensitive substring containment over title, content, and summary,
//! with [`Tolerance`] controlling tokenization and [`MatchMode`] controlling
//! how the specified filters combine.

use crate::models::{MatchMode, Memory, SearchQuery, Tolerance};

/// Evaluates the full search predicate against one memory.
#[must_use]
pub fn memory_matches(memory: &Memory, query: &SearchQuery) -> bool {
    let mut results: Vec<bool> = Vec::new();

    if !query.query.is_empty() {
        results.push(text_matches(memory, &query.query, query.tolerance));
    }
    if !query.memory_types.is_empty() {
        results.push(query.memory_types.contains(&memory.memory_type));
    }
    if !query.tags.is_empty() {
        // Memory tags are already canonical lowercase; normalize the query side.
        let wanted: Vec<String> = query.tags.iter().map(|t| t.to_lowercase()).collect();
        let matched = match query.match_mode {
            MatchMode::All => wanted.iter().all(|t| memory.tags.contains(t)),
            MatchMode::Any => wanted.iter().any(|t| memory.tags.contains(t)),
        };
        results.push(matched);
    }
    if let Some(min) = query.min_importance {
        results.push(memory.importance >= min);
    }
    if let Some(max) = query.max_importance {
        results.push(memory.importance <= max);
    }
    if let Some(min) = query.min_confidence {
        results.push(memory.confidence >= min);
    }
    if let Some(project_path) = &query.project_path {
        let needle = project_path.to_lowercase();
        results.push(
            memory
                .context
                .project_path
                .as_ref()
                .is_some_and(|p| p.to_lowercase().contains(&needle)),
        );
    }
    if let Some(from) = query.date_from {
        results.push(memory.updated_at >= from);
    }
    if let Some(to) = query.date_to {
        results.push(memory.updated_at <= to);
    }

    if results.is_empty() {
        return true;
    }
    match query.match_mode {
        MatchMode::All => results.iter().all(|r| *r),
        MatchMode::Any => results.iter().any(|r| *r),
    }
}

/// Matches query text against title, content, and summary.
#[must_use]
pub fn text_matches(memory: &Memory, query: &str, tolerance: Tolerance) -> bool {
    let haystack = format!(
        "{}\n{}\n{}",
        memory.title,
        memory.content,
        memory.summary.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    let needle = query.to_lowercase();

    match tolerance {
        Tolerance::Strict => haystack.contains(&needle),
        Tolerance::Normal => needle
            .split_whitespace()
            .any(|token| haystack.contains(token)),
        Tolerance::Fuzzy => needle.split_whitespace().any(|token| {
            haystack.contains(token)
                || haystack
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| !word.is_empty() && within_one_edit(token, word))
        }),
    }
}

/// Whether two strings are within Levenshtein distance one.
///
/// Early-exits on length difference; only the single-edit cases
/// (substitution, insertion, deletion) are checked, so this stays O(n).
#[must_use]
pub fn within_one_edit(a: &str, b: &str) -> bool {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    match long.len() - short.len() {
        0 => {
            let mismatches = short
                .iter()
                .zip(long.iter())
                .filter(|(x, y)| x != y)
                .count();
            mismatches <= 1
        },
        1 => {
            // One insertion: skip exactly one character of the longer string.
            let mut i = 0;
            let mut j = 0;
            let mut skipped = false;
            while i < short.len() && j < long.len() {
                if short[i] == long[j] {
                    i += 1;
                    j += 1;
                } else if skipped {
                    return false;
                } else {
                    skipped = true;
                    j += 1;
                }
            }
            true
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemoryInput, MemoryType};
    use test_case::test_case;

    fn memory() -> Memory {
        Memory::from_input(MemoryInput {
            memory_type: MemoryType::Solution,
            title: "Fix Redis timeout".to_string(),
            content: "Use exponential backoff for reconnects".to_string(),
            summary: Some("connection handling".to_string()),
            tags: vec!["Redis".to_string(), "Timeout".to_string()],
            ..Default::default()
        })
    }

    #[test_case("fix redis timeout", Tolerance::Strict, true ; "strict phrase hit")]
    #[test_case("redis backoff", Tolerance::Strict, false ; "strict phrase miss")]
    #[test_case("redis backoff", Tolerance::Normal, true ; "normal any token")]
    #[test_case("kafka zookeeper", Tolerance::Normal, false ; "normal all miss")]
    #[test_case("rwdis", Tolerance::Fuzzy, true ; "fuzzy one substitution")]
    #[test_case("backof", Tolerance::Fuzzy, true ; "fuzzy missing char")]
    #[test_case("xyzzy", Tolerance::Fuzzy, false ; "fuzzy miss")]
    fn test_text_tolerance(query: &str, tolerance: Tolerance, expected: bool) {
        assert_eq!(text_matches(&memory(), query, tolerance), expected);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let q = SearchQuery::new();
        assert!(memory_matches(&memory(), &q));
    }

    #[test]
    fn test_tag_filter_case_insensitive() {
        let q = SearchQuery::new().with_tags(vec!["REDIS".to_string()]);
        assert!(memory_matches(&memory(), &q));
        let q = SearchQuery::new().with_tags(vec!["kafka".to_string()]);
        assert!(!memory_matches(&memory(), &q));
    }

    #[test]
    fn test_match_mode_any_vs_all() {
        let mut q = SearchQuery::new()
            .with_query("nonexistent")
            .with_types(vec![MemoryType::Solution]);
        q.match_mode = MatchMode::All;
        assert!(!memory_matches(&memory(), &q));
        q.match_mode = MatchMode::Any;
        assert!(memory_matches(&memory(), &q));
    }

    #[test_case("abc", "abc", true ; "equal")]
    #[test_case("abc", "abd", true ; "one substitution")]
    #[test_case("abc", "abcd", true ; "one insertion")]
    #[test_case("abc", "ac", true ; "one deletion")]
    #[test_case("abc", "axd", false ; "two substitutions")]
    #[test_case("abc", "abcde", false ; "two insertions")]
    fn test_within_one_edit(a: &str, b: &str, expected: bool) {
        assert_eq!(within_one_edit(a, b), expected);
    }
}
