//! Bi-temporal tool handlers: point-in-time queries, history, change feed.

use serde_json::Value;
use std::fmt::Write as _;

use super::graph::format_relationship_line;
use super::parse_args;
use crate::Result;
use crate::db::MemoryDatabase;
use crate::mcp::tool_types::{AsOfArgs, HistoryArgs, WhatChangedArgs, parse_timestamp_arg};
use crate::mcp::tools::ToolResult;
use crate::models::MemoryId;

/// Executes the `query_as_of` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_query_as_of(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: AsOfArgs = parse_args(arguments)?;
    let as_of = parse_timestamp_arg("as_of", &args.as_of)?;
    let related = db.query_as_of(&MemoryId::new(&args.memory_id), as_of)?;

    if related.is_empty() {
        return Ok(ToolResult::text(format!(
            "`{}` had no valid relationships at {}.",
            args.memory_id,
            as_of.to_rfc3339(),
        )));
    }
    let mut text = format!(
        "**{} relationships valid at {}**\n\n",
        related.len(),
        as_of.to_rfc3339(),
    );
    for entry in &related {
        let _ = write!(
            text,
            "- [{}] **{}** `{}` (valid from {})\n",
            entry.relationship.relationship_type,
            entry.memory.title,
            entry.memory.id,
            entry.relationship.valid_from.to_rfc3339(),
        );
    }
    Ok(ToolResult::text(text))
}

/// Executes the `get_relationship_history` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_get_relationship_history(
    db: &MemoryDatabase,
    arguments: Value,
) -> Result<ToolResult> {
    let args: HistoryArgs = parse_args(arguments)?;
    let history = db.get_relationship_history(&MemoryId::new(&args.memory_id))?;

    if history.is_empty() {
        return Ok(ToolResult::text(format!(
            "`{}` has no relationship history.",
            args.memory_id
        )));
    }
    let mut text = format!(
        "**Relationship history for `{}`** ({} rows, oldest validity first)\n\n",
        args.memory_id,
        history.len(),
    );
    for relationship in &history {
        let _ = write!(text, "{}\n", format_relationship_line(relationship));
        if let Some(invalidated_by) = &relationship.invalidated_by {
            let _ = write!(text, "  superseded by `{invalidated_by}`\n");
        }
    }
    Ok(ToolResult::text(text))
}

/// Executes the `what_changed` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_what_changed(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: WhatChangedArgs = parse_args(arguments)?;
    let since = parse_timestamp_arg("since", &args.since)?;
    let changes = db.what_changed(since)?;

    if changes.created.is_empty() && changes.invalidated.is_empty() {
        return Ok(ToolResult::text(format!(
            "Nothing changed since {}.",
            since.to_rfc3339()
        )));
    }
    let mut text = format!("**Changes since {}**\n\n", since.to_rfc3339());
    if !changes.created.is_empty() {
        let _ = write!(text, "Learned ({}):\n", changes.created.len());
        for relationship in &changes.created {
            let _ = write!(text, "{}\n", format_relationship_line(relationship));
        }
    }
    if !changes.invalidated.is_empty() {
        let _ = write!(text, "\nInvalidated ({}):\n", changes.invalidated.len());
        for relationship in &changes.invalidated {
            let _ = write!(text, "{}\n", format_relationship_line(relationship));
        }
    }
    Ok(ToolResult::text(text))
}
