//! Relationship tool handlers: create, traverse, activity, context search,
//! suggestion, reinforcement.

use serde_json::Value;
use std::fmt::Write as _;

use super::parse_args;
use crate::Result;
use crate::db::MemoryDatabase;
use crate::mcp::tool_types::{
    ContextSearchArgs, RecentActivityArgs, ReinforceArgs, RelatedArgs, SuggestArgs,
    parse_relationship_types, parse_timestamp_arg, truncate,
};
use crate::mcp::tools::ToolResult;
use crate::models::{MemoryId, Relationship, RelationshipId, RelationshipInput, utc_now};

/// Executes the `create_relationship` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_create_relationship(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let input: RelationshipInput = parse_args(arguments)?;
    let relationship = db.create_relationship(input)?;

    let mut text = format!(
        "**Relationship Created**\n\n\
         - **ID**: `{}`\n\
         - `{}` -[{}]-> `{}`\n\
         - **Strength**: {:.2} | **Confidence**: {:.2}\n\
         - **Valid from**: {}\n",
        relationship.id,
        relationship.from_memory_id,
        relationship.relationship_type,
        relationship.to_memory_id,
        relationship.properties.strength,
        relationship.properties.confidence,
        relationship.valid_from.to_rfc3339(),
    );
    if let Some(context) = &relationship.properties.context_json
        && let Some(scope) = context.get("scope").and_then(|s| s.as_str())
    {
        let _ = write!(text, "- **Context scope**: {scope}\n");
    }
    Ok(ToolResult::text(text))
}

/// Executes the `get_related_memories` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_get_related_memories(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: RelatedArgs = parse_args(arguments)?;
    let types = args
        .relationship_types
        .as_deref()
        .map(parse_relationship_types)
        .transpose()?;
    let as_of = args
        .as_of
        .as_deref()
        .map(|t| parse_timestamp_arg("as_of", t))
        .transpose()?;
    let related = db.get_related_memories(
        &MemoryId::new(&args.memory_id),
        args.max_depth.unwrap_or(1),
        types.as_deref(),
        as_of,
    )?;

    if related.is_empty() {
        return Ok(ToolResult::text(format!(
            "No related memories for `{}`.",
            args.memory_id
        )));
    }
    let mut text = format!("**{} related memories**\n\n", related.len());
    for entry in &related {
        let _ = write!(
            text,
            "- depth {} via [{}] (strength {:.2}): **{}** `{}`\n",
            entry.depth,
            entry.relationship.relationship_type,
            entry.relationship.properties.strength,
            entry.memory.title,
            entry.memory.id,
        );
    }
    Ok(ToolResult::text(text))
}

/// Executes the `get_recent_activity` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_get_recent_activity(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: RecentActivityArgs = parse_args(arguments)?;
    let hours = args.hours.unwrap_or(24);
    let since = utc_now() - chrono::Duration::hours(i64::try_from(hours).unwrap_or(24));
    let activity = db.recent_activity(since, args.limit.unwrap_or(20))?;

    let mut text = format!(
        "**Activity in the last {hours}h**\n\n\
         Memories updated: {}\n\
         Relationships created: {}\n\
         Relationships invalidated: {}\n",
        activity.memories.len(),
        activity.changes.created.len(),
        activity.changes.invalidated.len(),
    );
    if !activity.memories.is_empty() {
        text.push('\n');
        for memory in &activity.memories {
            let _ = write!(
                text,
                "- **{}** `{}` updated {}\n",
                memory.title,
                memory.id,
                memory.updated_at.to_rfc3339(),
            );
        }
    }
    Ok(ToolResult::text(text))
}

/// Executes the `search_relationships_by_context` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_search_relationships_by_context(
    db: &MemoryDatabase,
    arguments: Value,
) -> Result<ToolResult> {
    let args: ContextSearchArgs = parse_args(arguments)?;
    let relationships = db.search_relationships_by_context(&args.query)?;

    if relationships.is_empty() {
        return Ok(ToolResult::text(format!(
            "No relationship context mentions \"{}\".",
            args.query
        )));
    }
    let mut text = format!("**{} relationships matched**\n\n", relationships.len());
    for relationship in &relationships {
        let _ = write!(text, "{}\n", format_relationship_line(relationship));
        if let Some(context_text) = relationship
            .properties
            .context_json
            .as_ref()
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
        {
            let _ = write!(text, "  context: {}\n", truncate(context_text, 120));
        }
    }
    Ok(ToolResult::text(text))
}

/// Executes the `suggest_relationship_type` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_suggest_relationship_type(
    db: &MemoryDatabase,
    arguments: Value,
) -> Result<ToolResult> {
    let args: SuggestArgs = parse_args(arguments)?;
    let suggestion = db.suggest_relationship_type(
        &MemoryId::new(&args.from_memory_id),
        &MemoryId::new(&args.to_memory_id),
    )?;
    Ok(ToolResult::text(format!(
        "**Suggested type**: {}\n\n{}\n",
        suggestion.relationship_type, suggestion.rationale,
    )))
}

/// Executes the `reinforce_relationship` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_reinforce_relationship(
    db: &MemoryDatabase,
    arguments: Value,
) -> Result<ToolResult> {
    let args: ReinforceArgs = parse_args(arguments)?;
    let relationship =
        db.reinforce_relationship(&RelationshipId::new(&args.relationship_id), args.strength_boost)?;
    Ok(ToolResult::text(format!(
        "**Relationship Reinforced**\n\n\
         - **ID**: `{}`\n\
         - **Evidence count**: {}\n\
         - **Strength**: {:.2}\n\
         - **Last reinforced**: {}\n",
        relationship.id,
        relationship.properties.evidence_count,
        relationship.properties.strength,
        relationship.properties.last_reinforced.to_rfc3339(),
    )))
}

pub(crate) fn format_relationship_line(relationship: &Relationship) -> String {
    let validity = match relationship.valid_until {
        None => "current".to_string(),
        Some(until) => format!("until {}", until.to_rfc3339()),
    };
    format!(
        "- `{}` -[{}]-> `{}` ({}, strength {:.2}) id `{}`",
        relationship.from_memory_id,
        relationship.relationship_type,
        relationship.to_memory_id,
        validity,
        relationship.properties.strength,
        relationship.id,
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::MemoryGraphConfig;
    use crate::mcp::tools::ToolContent;
    use crate::models::{MemoryInput, MemoryType};
    use crate::storage::{MemoryOperations, SqliteBackend};
    use std::sync::Arc;

    fn db() -> MemoryDatabase {
        let config = MemoryGraphConfig::default();
        let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
        MemoryDatabase::new(backend, &config)
    }

    fn store(db: &MemoryDatabase, title: &str) -> String {
        db.store_memory(MemoryInput {
            memory_type: MemoryType::General,
            title: title.to_string(),
            content: title.to_string(),
            ..Default::default()
        })
        .unwrap()
        .id
        .as_str()
        .to_string()
    }

    fn text_of(result: &ToolResult) -> &str {
        let ToolContent::Text { text } = &result.content[0];
        text
    }

    #[test]
    fn test_create_and_traverse() {
        let db = db();
        let a = store(&db, "a");
        let b = store(&db, "b");
        let created = execute_create_relationship(
            &db,
            serde_json::json!({
                "from_memory_id": a,
                "to_memory_id": b,
                "relationship_type": "SOLVES",
                "context": "fully solves the issue"
            }),
        )
        .unwrap();
        assert!(text_of(&created).contains("SOLVES"));
        assert!(text_of(&created).contains("Context scope"));

        let related =
            execute_get_related_memories(&db, serde_json::json!({"memory_id": a})).unwrap();
        assert!(text_of(&related).contains("depth 1"));
        assert!(text_of(&related).contains('b'));
    }

    #[test]
    fn test_context_search_finds_match() {
        let db = db();
        let a = store(&db, "a");
        let b = store(&db, "b");
        execute_create_relationship(
            &db,
            serde_json::json!({
                "from_memory_id": a,
                "to_memory_id": b,
                "relationship_type": "FIXES",
                "context": "verified by E2E tests"
            }),
        )
        .unwrap();

        let found = execute_search_relationships_by_context(
            &db,
            serde_json::json!({"query": "e2e"}),
        )
        .unwrap();
        assert!(text_of(&found).contains("1 relationships matched"));
        let missed = execute_search_relationships_by_context(
            &db,
            serde_json::json!({"query": "chaos monkey"}),
        )
        .unwrap();
        assert!(text_of(&missed).contains("No relationship context"));
    }
}
