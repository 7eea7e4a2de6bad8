//! Argument types and helper functions for MCP tools.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{MatchMode, MemoryType, MemoryUpdate, RelationshipType, SearchQuery, Tolerance};
use crate::{Error, Result};

/// Arguments for the `get_memory` tool.
#[derive(Debug, Deserialize)]
pub struct GetMemoryArgs {
    /// Memory ID to fetch.
    pub memory_id: String,
    /// Whether to include current relationships (default true).
    pub include_relationships: Option<bool>,
}

/// Arguments for the `update_memory` tool.
#[derive(Debug, Deserialize)]
pub struct UpdateMemoryArgs {
    /// Memory ID to update.
    pub memory_id: String,
    /// Partial update fields.
    #[serde(flatten)]
    pub update: MemoryUpdate,
}

/// Arguments for the `delete_memory` tool.
#[derive(Debug, Deserialize)]
pub struct DeleteMemoryArgs {
    /// Memory ID to delete.
    pub memory_id: String,
}

/// Arguments for the `search_memories` tool.
#[derive(Debug, Default, Deserialize)]
pub struct SearchMemoriesArgs {
    /// Query text.
    pub query: Option<String>,
    /// Memory type names.
    pub memory_types: Option<Vec<String>>,
    /// Tag filters.
    pub tags: Option<Vec<String>>,
    /// Minimum importance.
    pub min_importance: Option<f64>,
    /// Maximum importance.
    pub max_importance: Option<f64>,
    /// Minimum confidence.
    pub min_confidence: Option<f64>,
    /// Project path filter.
    pub project_path: Option<String>,
    /// Updated-at lower bound (ISO-8601 UTC).
    pub date_from: Option<String>,
    /// Updated-at upper bound (ISO-8601 UTC).
    pub date_to: Option<String>,
    /// Filter combination: "any" or "all".
    pub match_mode: Option<String>,
    /// Text strictness: "strict", "normal", or "fuzzy".
    pub tolerance: Option<String>,
    /// Page size.
    pub limit: Option<usize>,
    /// Page offset.
    pub offset: Option<usize>,
}

impl SearchMemoriesArgs {
    /// Converts wire arguments into a [`SearchQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown enum strings or malformed
    /// timestamps.
    pub fn into_query(self) -> Result<SearchQuery> {
        let mut query = SearchQuery::new();
        if let Some(text) = self.query {
            query.query = text;
        }
        if let Some(type_names) = self.memory_types {
            query.memory_types = parse_memory_types(&type_names)?;
        }
        if let Some(tags) = self.tags {
            query.tags = tags;
        }
        query.min_importance = self.min_importance;
        query.max_importance = self.max_importance;
        query.min_confidence = self.min_confidence;
        query.project_path = self.project_path;
        query.date_from = self
            .date_from
            .as_deref()
            .map(|t| parse_timestamp_arg("date_from", t))
            .transpose()?;
        query.date_to = self
            .date_to
            .as_deref()
            .map(|t| parse_timestamp_arg("date_to", t))
            .transpose()?;
        if let Some(mode) = self.match_mode {
            query.match_mode = MatchMode::parse(&mode)
                .ok_or_else(|| Error::Validation(format!("unknown match_mode: {mode}")))?;
        }
        if let Some(tolerance) = self.tolerance {
            query.tolerance = Tolerance::parse(&tolerance)
                .ok_or_else(|| Error::Validation(format!("unknown tolerance: {tolerance}")))?;
        }
        if let Some(limit) = self.limit {
            query.limit = limit;
        }
        if let Some(offset) = self.offset {
            query.offset = offset;
        }
        Ok(query)
    }
}

/// Arguments for the `recall_memories` tool.
#[derive(Debug, Deserialize)]
pub struct RecallArgs {
    /// Query text.
    pub query: String,
    /// Maximum results (default 10).
    pub limit: Option<usize>,
}

/// Arguments for the `get_related_memories` tool.
#[derive(Debug, Deserialize)]
pub struct RelatedArgs {
    /// Start memory.
    pub memory_id: String,
    /// Maximum hops (default 1).
    pub max_depth: Option<usize>,
    /// Restrict to these relationship type names.
    pub relationship_types: Option<Vec<String>>,
    /// Point-in-time view (ISO-8601 UTC); default is current-only.
    pub as_of: Option<String>,
}

/// Arguments for the `get_recent_activity` tool.
#[derive(Debug, Default, Deserialize)]
pub struct RecentActivityArgs {
    /// Look-back window in hours (default 24).
    pub hours: Option<u64>,
    /// Maximum memories returned (default 20).
    pub limit: Option<usize>,
}

/// Arguments for the `search_relationships_by_context` tool.
#[derive(Debug, Deserialize)]
pub struct ContextSearchArgs {
    /// Text to look for inside structured relationship context.
    pub query: String,
}

/// Arguments for the `find_memory_path` tool.
#[derive(Debug, Deserialize)]
pub struct FindPathArgs {
    /// Path start.
    pub from_memory_id: String,
    /// Path end.
    pub to_memory_id: String,
    /// Maximum hops (default 6).
    pub max_depth: Option<usize>,
}

/// Arguments for the `analyze_memory_clusters` tool.
#[derive(Debug, Default, Deserialize)]
pub struct ClustersArgs {
    /// Minimum edge strength for cluster membership (default 0.5).
    pub threshold: Option<f64>,
}

/// Arguments for the `suggest_relationship_type` tool.
#[derive(Debug, Deserialize)]
pub struct SuggestArgs {
    /// Proposed source memory.
    pub from_memory_id: String,
    /// Proposed target memory.
    pub to_memory_id: String,
}

/// Arguments for the `reinforce_relationship` tool.
#[derive(Debug, Deserialize)]
pub struct ReinforceArgs {
    /// Relationship to reinforce.
    pub relationship_id: String,
    /// Extra strength to add (default 0.05, clamped into [0, 1]).
    pub strength_boost: Option<f64>,
}

/// Arguments for the `query_as_of` tool.
#[derive(Debug, Deserialize)]
pub struct AsOfArgs {
    /// Memory whose edges to view.
    pub memory_id: String,
    /// The point in time (ISO-8601 UTC).
    pub as_of: String,
}

/// Arguments for the `get_relationship_history` tool.
#[derive(Debug, Deserialize)]
pub struct HistoryArgs {
    /// Memory whose full relationship history to return.
    pub memory_id: String,
}

/// Arguments for the `what_changed` tool.
#[derive(Debug, Deserialize)]
pub struct WhatChangedArgs {
    /// Cutoff instant (ISO-8601 UTC).
    pub since: String,
}

/// Arguments for the `track_entity_timeline` tool.
#[derive(Debug, Deserialize)]
pub struct TimelineArgs {
    /// Entity to trace (technology, file, framework, tag...).
    pub entity: String,
}

/// Arguments for the `migrate_database` tool.
#[derive(Debug, Deserialize)]
pub struct MigrateArgs {
    /// Source backend name.
    pub source_backend: String,
    /// Target backend name.
    pub target_backend: String,
    /// Report without writing (default false).
    pub dry_run: Option<bool>,
    /// Conflict mode: "merge" or "refuse" (default refuse).
    pub mode: Option<String>,
}

/// Arguments for the `validate_migration` tool.
#[derive(Debug, Deserialize)]
pub struct ValidateMigrationArgs {
    /// Source backend name.
    pub source_backend: String,
    /// Target backend name.
    pub target_backend: String,
}

/// Parses an ISO-8601 timestamp argument into a UTC value.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming the field on malformed input.
pub fn parse_timestamp_arg(field: &str, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            Error::Validation(format!(
                "{field} must be an ISO-8601 UTC timestamp (got '{text}')"
            ))
        })
}

/// Parses memory type names, rejecting unknown ones.
///
/// # Errors
///
/// Returns [`Error::Validation`] for the first unknown name.
pub fn parse_memory_types(names: &[String]) -> Result<Vec<MemoryType>> {
    names
        .iter()
        .map(|name| {
            MemoryType::parse(name)
                .ok_or_else(|| Error::Validation(format!("unknown memory type: {name}")))
        })
        .collect()
}

/// Parses relationship type names, rejecting unknown ones.
///
/// # Errors
///
/// Returns [`Error::Validation`] for the first unknown name.
pub fn parse_relationship_types(names: &[String]) -> Result<Vec<RelationshipType>> {
    names
        .iter()
        .map(|name| {
            RelationshipType::parse(name)
                .ok_or_else(|| Error::Validation(format!("unknown relationship type: {name}")))
        })
        .collect()
}

/// Truncates text for display, appending an ellipsis when shortened.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let shortened: String = text.chars().take(max_chars).collect();
    format!("{shortened}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_args_conversion() {
        let args = SearchMemoriesArgs {
            query: Some("redis".to_string()),
            memory_types: Some(vec!["solution".to_string()]),
            match_mode: Some("any".to_string()),
            tolerance: Some("fuzzy".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        let query = args.into_query().unwrap();
        assert_eq!(query.query, "redis");
        assert_eq!(query.memory_types, vec![MemoryType::Solution]);
        assert_eq!(query.match_mode, MatchMode::Any);
        assert_eq!(query.tolerance, Tolerance::Fuzzy);
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_search_args_reject_unknown_enum() {
        let args = SearchMemoriesArgs {
            memory_types: Some(vec!["nonsense".to_string()]),
            ..Default::default()
        };
        assert!(args.into_query().is_err());

        let args = SearchMemoriesArgs {
            tolerance: Some("sloppy".to_string()),
            ..Default::default()
        };
        assert!(args.into_query().is_err());
    }

    #[test]
    fn test_parse_timestamp_arg() {
        let ts = parse_timestamp_arg("as_of", "2024-06-01T00:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        let err = parse_timestamp_arg("as_of", "June 1st").unwrap_err();
        assert!(err.to_string().contains("as_of"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 8), "a longer...");
    }
}
