//! Core memory tool handlers: store, get, update, delete, search, recall.

use serde_json::Value;
use std::fmt::Write as _;

use super::parse_args;
use crate::Result;
use crate::db::MemoryDatabase;
use crate::mcp::tool_types::{
    DeleteMemoryArgs, GetMemoryArgs, RecallArgs, SearchMemoriesArgs, UpdateMemoryArgs, truncate,
};
use crate::mcp::tools::ToolResult;
use crate::models::{Memory, MemoryId, MemoryInput, PaginatedResult};

/// Executes the `store_memory` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_store_memory(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let input: MemoryInput = parse_args(arguments)?;
    let memory = db.store_memory(input)?;

    let text = format!(
        "**Memory Stored**\n\n\
         - **ID**: `{}`\n\
         - **Type**: {}\n\
         - **Title**: {}\n\
         - **Tags**: {}\n\
         - **Importance**: {:.2}\n",
        memory.id,
        memory.memory_type,
        memory.title,
        format_tags(&memory.tags),
        memory.importance,
    );
    Ok(ToolResult::text(text))
}

/// Executes the `get_memory` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_get_memory(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: GetMemoryArgs = parse_args(arguments)?;
    let include = args.include_relationships.unwrap_or(true);
    let view = db.get_memory(&MemoryId::new(&args.memory_id), include)?;
    let memory = &view.memory;

    let mut text = format!(
        "**Memory: {}**\n\n\
         - **ID**: `{}`\n\
         - **Type**: {}\n\
         - **Tags**: {}\n\
         - **Importance**: {:.2} | **Confidence**: {:.2} | **Effectiveness**: {:.2}\n\
         - **Version**: {} | **Usage count**: {}\n\
         - **Created**: {} | **Updated**: {}\n\n\
         {}\n",
        memory.title,
        memory.id,
        memory.memory_type,
        format_tags(&memory.tags),
        memory.importance,
        memory.confidence,
        memory.effectiveness,
        memory.version,
        memory.usage_count,
        memory.created_at.to_rfc3339(),
        memory.updated_at.to_rfc3339(),
        truncate(&memory.content, 2000),
    );
    if include {
        let _ = write!(text, "\n**Relationships**: {}\n", view.relationships.len());
        for relationship in &view.relationships {
            let _ = write!(
                text,
                "- `{}` -[{}]-> `{}` (strength {:.2})\n",
                relationship.from_memory_id,
                relationship.relationship_type,
                relationship.to_memory_id,
                relationship.properties.strength,
            );
        }
    }
    Ok(ToolResult::text(text))
}

/// Executes the `update_memory` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_update_memory(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: UpdateMemoryArgs = parse_args(arguments)?;
    let memory = db.update_memory(&MemoryId::new(&args.memory_id), args.update)?;

    let text = format!(
        "**Memory Updated**\n\n\
         - **ID**: `{}`\n\
         - **Title**: {}\n\
         - **Version**: {}\n\
         - **Updated**: {}\n",
        memory.id,
        memory.title,
        memory.version,
        memory.updated_at.to_rfc3339(),
    );
    Ok(ToolResult::text(text))
}

/// Executes the `delete_memory` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_delete_memory(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: DeleteMemoryArgs = parse_args(arguments)?;
    db.delete_memory(&MemoryId::new(&args.memory_id))?;
    Ok(ToolResult::text(format!(
        "Memory `{}` deleted along with its relationships.",
        args.memory_id
    )))
}

/// Executes the `search_memories` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_search_memories(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: SearchMemoriesArgs = parse_args(arguments)?;
    let query = args.into_query()?;
    let page = db.search_memories(&query)?;
    Ok(ToolResult::text(format_page(&page)))
}

/// Executes the `recall_memories` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_recall_memories(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: RecallArgs = parse_args(arguments)?;
    let page = db.recall_memories(&args.query, args.limit.unwrap_or(10))?;
    Ok(ToolResult::text(format_page(&page)))
}

fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        "none".to_string()
    } else {
        tags.join(", ")
    }
}

fn format_page(page: &PaginatedResult<Memory>) -> String {
    if page.items.is_empty() {
        return format!("No memories matched (searched {} total).", page.total_count);
    }
    let mut text = format!(
        "**Found {} memories** (showing {} from offset {})\n\n",
        page.total_count,
        page.items.len(),
        page.offset,
    );
    for memory in &page.items {
        let _ = write!(
            text,
            "- **{}** ({}) `{}` importance {:.2}\n  {}\n",
            memory.title,
            memory.memory_type,
            memory.id,
            memory.importance,
            truncate(memory.summary.as_deref().unwrap_or(&memory.content), 160),
        );
    }
    if let Some(next_offset) = page.next_offset {
        let _ = write!(text, "\nMore results: offset {next_offset}\n");
    }
    text
}
