//! MCP tool registry and error decoration.
//!
//! The registry is the immutable name→handler map built at startup: listing
//! tools reads it, dispatch reads it. Every handler runs behind the error
//! decorator, which classifies failures and renders a concise text payload;
//! stack traces and backend internals never cross the MCP boundary.

mod definitions;
mod handlers;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::Error;
use crate::config::MemoryGraphConfig;
use crate::db::MemoryDatabase;

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// An error text result.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Failure classes at the MCP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required argument was absent.
    MissingField,
    /// Input violated a bound or enum.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// A graph invariant was breached (self-loop, cycle, invalid reinforce).
    RelationshipError,
    /// Everything else; only this class logs full diagnostics.
    Other,
}

impl ErrorClass {
    /// Classifies a crate error.
    #[must_use]
    pub const fn of(err: &Error) -> Self {
        match err {
            Error::MissingField(_) => Self::MissingField,
            Error::Validation(_) | Error::Conflict(_) => Self::Validation,
            Error::NotFound(_) => Self::NotFound,
            Error::CycleDetected { .. } | Error::Relationship(_) => Self::RelationshipError,
            Error::BackendUnavailable { .. }
            | Error::BackendTimeout { .. }
            | Error::VerificationFailed(_)
            | Error::Internal(_) => Self::Other,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::RelationshipError => "relationship_error",
            Self::Other => "other",
        }
    }
}

/// Renders an error as a user-visible tool result.
///
/// User-correctable kinds surface their message unchanged; `Other` logs the
/// full diagnostic and shows only a short operation-scoped summary.
fn error_result(tool: &str, err: &Error) -> ToolResult {
    let class = ErrorClass::of(err);
    let text = match class {
        ErrorClass::Other => {
            tracing::error!(tool, class = class.as_str(), error = %err, "tool execution failed");
            let short = match err {
                Error::BackendUnavailable { .. } => "backend unavailable".to_string(),
                Error::BackendTimeout { .. } => "backend timed out".to_string(),
                Error::VerificationFailed(_) => err.to_string(),
                _ => "internal error".to_string(),
            };
            format!("Failed to {tool}: {short}")
        },
        _ => err.to_string(),
    };
    ToolResult::error(text)
}

/// Registry of MCP tools bound to a memory database.
pub struct ToolRegistry {
    /// Name → definition map, immutable after construction.
    tools: HashMap<String, ToolDefinition>,
    /// The facade handlers dispatch into.
    db: Arc<MemoryDatabase>,
    /// Startup configuration (migration tools construct backends from it).
    config: MemoryGraphConfig,
}

impl ToolRegistry {
    /// Builds the registry with every memorygraph tool.
    #[must_use]
    pub fn new(db: Arc<MemoryDatabase>, config: MemoryGraphConfig) -> Self {
        let mut tools = HashMap::new();
        for definition in definitions::all_tools() {
            tools.insert(definition.name.clone(), definition);
        }
        Self { tools, db, config }
    }

    /// Returns all tool definitions, sorted by name.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        let mut out: Vec<&ToolDefinition> = self.tools.values().collect();
        out.sort_by_key(|t| t.name.as_str());
        out
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Executes a tool. Failures become `isError` results; this never
    /// panics and never leaks a stack trace.
    #[must_use]
    pub fn execute(&self, name: &str, arguments: Value) -> ToolResult {
        if !self.tools.contains_key(name) {
            return ToolResult::error(format!("Unknown tool: {name}"));
        }
        let started = Instant::now();
        let outcome = self.dispatch(name, arguments);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(result) => {
                tracing::info!(tool = name, duration_ms, outcome = "ok", "tool executed");
                result
            },
            Err(err) => {
                tracing::info!(
                    tool = name,
                    duration_ms,
                    outcome = ErrorClass::of(&err).as_str(),
                    "tool executed"
                );
                error_result(name, &err)
            },
        }
    }

    fn dispatch(&self, name: &str, arguments: Value) -> crate::Result<ToolResult> {
        let db = &self.db;
        match name {
            "store_memory" => handlers::core::execute_store_memory(db, arguments),
            "get_memory" => handlers::core::execute_get_memory(db, arguments),
            "update_memory" => handlers::core::execute_update_memory(db, arguments),
            "delete_memory" => handlers::core::execute_delete_memory(db, arguments),
            "search_memories" => handlers::core::execute_search_memories(db, arguments),
            "recall_memories" => handlers::core::execute_recall_memories(db, arguments),
            "create_relationship" => handlers::graph::execute_create_relationship(db, arguments),
            "get_related_memories" => handlers::graph::execute_get_related_memories(db, arguments),
            "get_recent_activity" => handlers::graph::execute_get_recent_activity(db, arguments),
            "search_relationships_by_context" => {
                handlers::graph::execute_search_relationships_by_context(db, arguments)
            },
            "suggest_relationship_type" => {
                handlers::graph::execute_suggest_relationship_type(db, arguments)
            },
            "reinforce_relationship" => {
                handlers::graph::execute_reinforce_relationship(db, arguments)
            },
            "query_as_of" => handlers::temporal::execute_query_as_of(db, arguments),
            "get_relationship_history" => {
                handlers::temporal::execute_get_relationship_history(db, arguments)
            },
            "what_changed" => handlers::temporal::execute_what_changed(db, arguments),
            "find_memory_path" => handlers::analytics::execute_find_memory_path(db, arguments),
            "analyze_memory_clusters" => {
                handlers::analytics::execute_analyze_memory_clusters(db, arguments)
            },
            "find_bridge_memories" => {
                handlers::analytics::execute_find_bridge_memories(db, arguments)
            },
            "analyze_graph_metrics" => {
                handlers::analytics::execute_analyze_graph_metrics(db, arguments)
            },
            "track_entity_timeline" => {
                handlers::analytics::execute_track_entity_timeline(db, arguments)
            },
            "migrate_database" => {
                handlers::migrate::execute_migrate_database(db, &self.config, arguments)
            },
            "validate_migration" => {
                handlers::migrate::execute_validate_migration(db, &self.config, arguments)
            },
            _ => Err(Error::Internal(format!("unregistered tool: {name}"))),
        }
    }
}
