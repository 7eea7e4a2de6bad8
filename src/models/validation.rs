//! Boundary validators for tool inputs.
//!
//! These mirror the model invariants and run at the tool boundary so bad
//! input fails early with a deterministic message. The facade re-checks the
//! same bounds before persistence.

use crate::{Error, Result};

use super::memory::{MemoryInput, MemoryUpdate};
use super::relationship::{RelationshipInput, RelationshipType};
use super::search::{MAX_LIMIT, SearchQuery};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 500;
/// Maximum content length in characters.
pub const MAX_CONTENT_LEN: usize = 50_000;
/// Maximum summary length in characters.
pub const MAX_SUMMARY_LEN: usize = 1_000;
/// Maximum length of a single tag.
pub const MAX_TAG_LEN: usize = 100;
/// Maximum number of tags on a memory.
pub const MAX_TAGS: usize = 50;
/// Maximum query text length.
pub const MAX_QUERY_LEN: usize = 1_000;
/// Maximum free-text relationship context length.
pub const MAX_RELATIONSHIP_CONTEXT_LEN: usize = 10_000;

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::Validation(format!(
            "{field} exceeds {max} characters (got {len})"
        )));
    }
    Ok(())
}

fn check_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::MissingField(field.to_string()));
    }
    Ok(())
}

fn check_score(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(Error::Validation(format!(
            "{field} must be within [0.0, 1.0] (got {value})"
        )));
    }
    Ok(())
}

fn check_tags(tags: &[String]) -> Result<()> {
    if tags.len() > MAX_TAGS {
        return Err(Error::Validation(format!(
            "too many tags: at most {MAX_TAGS} allowed (got {})",
            tags.len()
        )));
    }
    for tag in tags {
        check_len("tag", tag, MAX_TAG_LEN)?;
    }
    Ok(())
}

/// Validates input for creating a memory.
///
/// # Errors
///
/// Returns [`Error::MissingField`] for absent required fields and
/// [`Error::Validation`] for bound violations.
pub fn validate_memory_input(input: &MemoryInput) -> Result<()> {
    check_required("title", &input.title)?;
    check_required("content", &input.content)?;
    check_len("title", &input.title, MAX_TITLE_LEN)?;
    check_len("content", &input.content, MAX_CONTENT_LEN)?;
    if let Some(summary) = &input.summary {
        check_len("summary", summary, MAX_SUMMARY_LEN)?;
    }
    check_tags(&input.tags)?;
    if let Some(importance) = input.importance {
        check_score("importance", importance)?;
    }
    if let Some(confidence) = input.confidence {
        check_score("confidence", confidence)?;
    }
    if let Some(effectiveness) = input.effectiveness {
        check_score("effectiveness", effectiveness)?;
    }
    Ok(())
}

/// Validates a partial memory update.
///
/// # Errors
///
/// Returns [`Error::Validation`] for bound violations.
pub fn validate_memory_update(update: &MemoryUpdate) -> Result<()> {
    if let Some(title) = &update.title {
        check_required("title", title)?;
        check_len("title", title, MAX_TITLE_LEN)?;
    }
    if let Some(content) = &update.content {
        check_required("content", content)?;
        check_len("content", content, MAX_CONTENT_LEN)?;
    }
    if let Some(summary) = &update.summary {
        check_len("summary", summary, MAX_SUMMARY_LEN)?;
    }
    if let Some(tags) = &update.tags {
        check_tags(tags)?;
    }
    if let Some(importance) = update.importance {
        check_score("importance", importance)?;
    }
    if let Some(confidence) = update.confidence {
        check_score("confidence", confidence)?;
    }
    if let Some(effectiveness) = update.effectiveness {
        check_score("effectiveness", effectiveness)?;
    }
    Ok(())
}

/// Validates a search query.
///
/// # Errors
///
/// Returns [`Error::Validation`] for bound violations.
pub fn validate_search_input(query: &SearchQuery) -> Result<()> {
    check_len("query", &query.query, MAX_QUERY_LEN)?;
    if query.limit < 1 || query.limit > MAX_LIMIT {
        return Err(Error::Validation(format!(
            "limit must be within [1, {MAX_LIMIT}] (got {})",
            query.limit
        )));
    }
    if let Some(min) = query.min_importance {
        check_score("min_importance", min)?;
    }
    if let Some(max) = query.max_importance {
        check_score("max_importance", max)?;
    }
    if let Some(min) = query.min_confidence {
        check_score("min_confidence", min)?;
    }
    if let (Some(from), Some(to)) = (query.date_from, query.date_to)
        && from > to
    {
        return Err(Error::Validation(
            "date_from must not be after date_to".to_string(),
        ));
    }
    check_tags(&query.tags)?;
    Ok(())
}

/// Validates input for creating a relationship. Returns the parsed type.
///
/// # Errors
///
/// Returns [`Error::MissingField`] for absent endpoints,
/// [`Error::Validation`] for bound violations or an unknown type string, and
/// [`Error::Relationship`] for a self-loop.
pub fn validate_relationship_input(input: &RelationshipInput) -> Result<RelationshipType> {
    check_required("from_memory_id", &input.from_memory_id)?;
    check_required("to_memory_id", &input.to_memory_id)?;
    if input.from_memory_id == input.to_memory_id {
        return Err(Error::Relationship(format!(
            "self-loop rejected: from and to are both '{}'",
            input.from_memory_id
        )));
    }
    let relationship_type =
        RelationshipType::parse(&input.relationship_type).ok_or_else(|| {
            Error::Validation(format!(
                "unknown relationship type: {}",
                input.relationship_type
            ))
        })?;
    if let Some(strength) = input.strength {
        check_score("strength", strength)?;
    }
    if let Some(confidence) = input.confidence {
        check_score("confidence", confidence)?;
    }
    if let Some(context) = &input.context {
        check_len("context", context, MAX_RELATIONSHIP_CONTEXT_LEN)?;
    }
    Ok(relationship_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryType;

    fn input(title: &str, content: &str) -> MemoryInput {
        MemoryInput {
            memory_type: MemoryType::General,
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_memory_input_ok() {
        assert!(validate_memory_input(&input("t", "c")).is_ok());
    }

    #[test]
    fn test_memory_input_missing_title() {
        let err = validate_memory_input(&input("  ", "c")).unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "title"));
    }

    #[test]
    fn test_memory_input_content_too_long() {
        let long = "x".repeat(MAX_CONTENT_LEN + 1);
        let err = validate_memory_input(&input("t", &long)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("content"));
        assert!(msg.contains("50000"));
    }

    #[test]
    fn test_memory_input_bad_score() {
        let mut i = input("t", "c");
        i.importance = Some(1.5);
        let err = validate_memory_input(&i).unwrap_err();
        assert!(err.to_string().contains("importance"));
    }

    #[test]
    fn test_too_many_tags() {
        let mut i = input("t", "c");
        i.tags = (0..=MAX_TAGS).map(|n| format!("tag{n}")).collect();
        assert!(validate_memory_input(&i).is_err());
    }

    #[test]
    fn test_search_limit_bounds() {
        let mut q = SearchQuery::new();
        q.limit = 0;
        assert!(validate_search_input(&q).is_err());
        q.limit = MAX_LIMIT + 1;
        assert!(validate_search_input(&q).is_err());
        q.limit = MAX_LIMIT;
        assert!(validate_search_input(&q).is_ok());
    }

    #[test]
    fn test_relationship_self_loop() {
        let input = RelationshipInput {
            from_memory_id: "a".to_string(),
            to_memory_id: "a".to_string(),
            relationship_type: "SOLVES".to_string(),
            strength: None,
            confidence: None,
            context: None,
            valid_from: None,
        };
        let err = validate_relationship_input(&input).unwrap_err();
        assert!(matches!(err, Error::Relationship(_)));
    }

    #[test]
    fn test_relationship_unknown_type() {
        let input = RelationshipInput {
            from_memory_id: "a".to_string(),
            to_memory_id: "b".to_string(),
            relationship_type: "LIKES".to_string(),
            strength: None,
            confidence: None,
            context: None,
            valid_from: None,
        };
        let err = validate_relationship_input(&input).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
