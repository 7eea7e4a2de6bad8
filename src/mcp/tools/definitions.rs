//! Tool schema definitions.
//!
//! JSON Schemas for every memorygraph tool. Length and range constraints
//! mirror the model validators, so clients fail fast with the same bounds
//! the server enforces.

use super::ToolDefinition;

const MEMORY_TYPES: [&str; 13] = [
    "task",
    "code_pattern",
    "problem",
    "solution",
    "project",
    "technology",
    "error",
    "fix",
    "command",
    "file_context",
    "workflow",
    "general",
    "conversation",
];

/// Builds every tool definition.
#[must_use]
pub fn all_tools() -> Vec<ToolDefinition> {
    vec![
        store_memory_tool(),
        get_memory_tool(),
        update_memory_tool(),
        delete_memory_tool(),
        search_memories_tool(),
        recall_memories_tool(),
        create_relationship_tool(),
        get_related_memories_tool(),
        get_recent_activity_tool(),
        search_relationships_by_context_tool(),
        find_memory_path_tool(),
        analyze_memory_clusters_tool(),
        find_bridge_memories_tool(),
        suggest_relationship_type_tool(),
        reinforce_relationship_tool(),
        analyze_graph_metrics_tool(),
        query_as_of_tool(),
        get_relationship_history_tool(),
        what_changed_tool(),
        track_entity_timeline_tool(),
        migrate_database_tool(),
        validate_migration_tool(),
    ]
}

fn store_memory_tool() -> ToolDefinition {
    ToolDefinition {
        name: "store_memory".to_string(),
        description: "Store a memory (solution, problem, error, decision, etc.) for later recall"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "description": "Memory category",
                    "enum": MEMORY_TYPES
                },
                "title": {
                    "type": "string",
                    "description": "Short title",
                    "maxLength": 500
                },
                "content": {
                    "type": "string",
                    "description": "Full content",
                    "maxLength": 50000
                },
                "summary": {
                    "type": "string",
                    "description": "Optional summary",
                    "maxLength": 1000
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string", "maxLength": 100 },
                    "maxItems": 50,
                    "description": "Tags, lowercased on write"
                },
                "importance": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "description": "Importance score"
                },
                "confidence": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "description": "Confidence score"
                },
                "context": {
                    "type": "object",
                    "description": "Structured development context (project_path, files_involved, languages, git_branch, ...)"
                }
            },
            "required": ["title", "content"]
        }),
    }
}

fn get_memory_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_memory".to_string(),
        description: "Fetch a memory by ID, optionally with its current relationships".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string", "description": "Memory ID" },
                "include_relationships": {
                    "type": "boolean",
                    "description": "Include current relationships (default true)"
                }
            },
            "required": ["memory_id"]
        }),
    }
}

fn update_memory_tool() -> ToolDefinition {
    ToolDefinition {
        name: "update_memory".to_string(),
        description: "Partially update a memory; version bumps on every update".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string", "description": "Memory ID" },
                "type": { "type": "string", "enum": MEMORY_TYPES },
                "title": { "type": "string", "maxLength": 500 },
                "content": { "type": "string", "maxLength": 50000 },
                "summary": { "type": "string", "maxLength": 1000 },
                "tags": {
                    "type": "array",
                    "items": { "type": "string", "maxLength": 100 },
                    "maxItems": 50
                },
                "importance": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "effectiveness": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "context": { "type": "object" }
            },
            "required": ["memory_id"]
        }),
    }
}

fn delete_memory_tool() -> ToolDefinition {
    ToolDefinition {
        name: "delete_memory".to_string(),
        description: "Delete a memory; relationships touching it are removed too".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string", "description": "Memory ID" }
            },
            "required": ["memory_id"]
        }),
    }
}

fn search_memories_tool() -> ToolDefinition {
    ToolDefinition {
        name: "search_memories".to_string(),
        description:
            "Search memories by text and filters with pagination. Ordering: importance desc, \
             recency desc."
                .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "maxLength": 1000,
                    "description": "Query text matched against title/content/summary; empty matches all"
                },
                "memory_types": {
                    "type": "array",
                    "items": { "type": "string", "enum": MEMORY_TYPES }
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string", "maxLength": 100 },
                    "maxItems": 50
                },
                "min_importance": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "max_importance": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "min_confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "project_path": { "type": "string" },
                "date_from": { "type": "string", "description": "ISO-8601 UTC lower bound" },
                "date_to": { "type": "string", "description": "ISO-8601 UTC upper bound" },
                "match_mode": {
                    "type": "string",
                    "enum": ["any", "all"],
                    "description": "Whether every specified filter must match (default all)"
                },
                "tolerance": {
                    "type": "string",
                    "enum": ["strict", "normal", "fuzzy"],
                    "description": "Text match strictness (default normal)"
                },
                "limit": { "type": "integer", "minimum": 1, "maximum": 1000 },
                "offset": { "type": "integer", "minimum": 0 }
            },
            "required": []
        }),
    }
}

fn recall_memories_tool() -> ToolDefinition {
    ToolDefinition {
        name: "recall_memories".to_string(),
        description: "Quick text recall: normal tolerance, most important matches first"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "maxLength": 1000 },
                "limit": { "type": "integer", "minimum": 1, "maximum": 1000 }
            },
            "required": ["query"]
        }),
    }
}

fn create_relationship_tool() -> ToolDefinition {
    ToolDefinition {
        name: "create_relationship".to_string(),
        description:
            "Create a typed relationship between two memories. Free-text context is parsed into \
             structured fields. Ordering types are cycle-checked."
                .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "from_memory_id": { "type": "string" },
                "to_memory_id": { "type": "string" },
                "relationship_type": {
                    "type": "string",
                    "description": "One of the 35 relationship types, e.g. SOLVES, CAUSES, DEPENDS_ON, SIMILAR_TO"
                },
                "strength": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "context": {
                    "type": "string",
                    "maxLength": 10000,
                    "description": "Free-text context, auto-structured on write"
                },
                "valid_from": {
                    "type": "string",
                    "description": "ISO-8601 UTC instant the fact became true (default now)"
                }
            },
            "required": ["from_memory_id", "to_memory_id", "relationship_type"]
        }),
    }
}

fn get_related_memories_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_related_memories".to_string(),
        description: "Traverse the graph from a memory (BFS, depth-limited, current view by default)"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string" },
                "max_depth": { "type": "integer", "minimum": 1, "maximum": 10 },
                "relationship_types": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "as_of": {
                    "type": "string",
                    "description": "ISO-8601 UTC point-in-time view (default: current)"
                }
            },
            "required": ["memory_id"]
        }),
    }
}

fn get_recent_activity_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_recent_activity".to_string(),
        description: "Memories and relationship changes in the recent past".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "hours": { "type": "integer", "minimum": 1, "description": "Look-back window (default 24)" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 1000 }
            },
            "required": []
        }),
    }
}

fn search_relationships_by_context_tool() -> ToolDefinition {
    ToolDefinition {
        name: "search_relationships_by_context".to_string(),
        description: "Find current relationships whose structured context mentions the query"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "maxLength": 1000 }
            },
            "required": ["query"]
        }),
    }
}

fn find_memory_path_tool() -> ToolDefinition {
    ToolDefinition {
        name: "find_memory_path".to_string(),
        description: "Shortest relationship path between two memories (bidirectional BFS)"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "from_memory_id": { "type": "string" },
                "to_memory_id": { "type": "string" },
                "max_depth": { "type": "integer", "minimum": 1, "maximum": 10, "description": "Hop limit (default 6)" }
            },
            "required": ["from_memory_id", "to_memory_id"]
        }),
    }
}

fn analyze_memory_clusters_tool() -> ToolDefinition {
    ToolDefinition {
        name: "analyze_memory_clusters".to_string(),
        description: "Connected components over strong relationships, largest first".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "threshold": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "description": "Minimum edge strength (default 0.5)"
                }
            },
            "required": []
        }),
    }
}

fn find_bridge_memories_tool() -> ToolDefinition {
    ToolDefinition {
        name: "find_bridge_memories".to_string(),
        description: "Memories on bridge edges whose removal would disconnect the graph"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
    }
}

fn suggest_relationship_type_tool() -> ToolDefinition {
    ToolDefinition {
        name: "suggest_relationship_type".to_string(),
        description: "Suggest a relationship type for two memories from their categories"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "from_memory_id": { "type": "string" },
                "to_memory_id": { "type": "string" }
            },
            "required": ["from_memory_id", "to_memory_id"]
        }),
    }
}

fn reinforce_relationship_tool() -> ToolDefinition {
    ToolDefinition {
        name: "reinforce_relationship".to_string(),
        description: "Record another observation of a relationship, optionally raising strength"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "relationship_id": { "type": "string" },
                "strength_boost": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
            },
            "required": ["relationship_id"]
        }),
    }
}

fn analyze_graph_metrics_tool() -> ToolDefinition {
    ToolDefinition {
        name: "analyze_graph_metrics".to_string(),
        description: "Counts by type, density, degree, and component statistics".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
    }
}

fn query_as_of_tool() -> ToolDefinition {
    ToolDefinition {
        name: "query_as_of".to_string(),
        description: "Which relationships of a memory were valid at a point in time".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string" },
                "as_of": { "type": "string", "description": "ISO-8601 UTC instant" }
            },
            "required": ["memory_id", "as_of"]
        }),
    }
}

fn get_relationship_history_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_relationship_history".to_string(),
        description: "Full bi-temporal relationship history of a memory, oldest validity first"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string" }
            },
            "required": ["memory_id"]
        }),
    }
}

fn what_changed_tool() -> ToolDefinition {
    ToolDefinition {
        name: "what_changed".to_string(),
        description: "Relationships learned or invalidated since an instant".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "since": { "type": "string", "description": "ISO-8601 UTC instant" }
            },
            "required": ["since"]
        }),
    }
}

fn track_entity_timeline_tool() -> ToolDefinition {
    ToolDefinition {
        name: "track_entity_timeline".to_string(),
        description: "Chronological list of memories whose context mentions an entity".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "entity": { "type": "string", "description": "Technology, file, framework, or tag" }
            },
            "required": ["entity"]
        }),
    }
}

fn migrate_database_tool() -> ToolDefinition {
    ToolDefinition {
        name: "migrate_database".to_string(),
        description:
            "Migrate all data between backends with checksum verification and rollback on failure"
                .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "source_backend": {
                    "type": "string",
                    "enum": ["sqlite", "neo4j", "memgraph", "falkor", "cloud"]
                },
                "target_backend": {
                    "type": "string",
                    "enum": ["sqlite", "neo4j", "memgraph", "falkor", "cloud"]
                },
                "dry_run": { "type": "boolean", "description": "Report without writing (default false)" },
                "mode": {
                    "type": "string",
                    "enum": ["merge", "refuse"],
                    "description": "Conflict handling for existing IDs (default refuse)"
                }
            },
            "required": ["source_backend", "target_backend"]
        }),
    }
}

fn validate_migration_tool() -> ToolDefinition {
    ToolDefinition {
        name: "validate_migration".to_string(),
        description: "Compare two backends by counts and canonical checksum".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "source_backend": {
                    "type": "string",
                    "enum": ["sqlite", "neo4j", "memgraph", "falkor", "cloud"]
                },
                "target_backend": {
                    "type": "string",
                    "enum": ["sqlite", "neo4j", "memgraph", "falkor", "cloud"]
                }
            },
            "required": ["source_backend", "target_backend"]
        }),
    }
}
