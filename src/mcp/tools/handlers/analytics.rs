//! Analytics tool handlers: path search, clusters, bridges, metrics,
//! entity timelines.

use serde_json::Value;
use std::fmt::Write as _;

use super::parse_args;
use crate::Result;
use crate::analytics::{
    GraphSnapshot, analyze_clusters, find_bridges, find_path, graph_metrics,
    track_entity_timeline,
};
use crate::db::MemoryDatabase;
use crate::mcp::tool_types::{ClustersArgs, FindPathArgs, TimelineArgs};
use crate::mcp::tools::ToolResult;
use crate::models::MemoryId;

/// Executes the `find_memory_path` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_find_memory_path(db: &MemoryDatabase, arguments: Value) -> Result<ToolResult> {
    let args: FindPathArgs = parse_args(arguments)?;
    let snapshot = GraphSnapshot::load(db.backend())?;
    let path = find_path(
        &snapshot,
        &MemoryId::new(&args.from_memory_id),
        &MemoryId::new(&args.to_memory_id),
        args.max_depth.unwrap_or(6),
    );

    let Some(path) = path else {
        return Ok(ToolResult::text(format!(
            "No path from `{}` to `{}` within {} hops.",
            args.from_memory_id,
            args.to_memory_id,
            args.max_depth.unwrap_or(6),
        )));
    };

    let mut text = format!(
        "**Path found** ({} hops, total strength {:.2})\n\n",
        path.relationships.len(),
        path.total_strength,
    );
    for (index, memory_id) in path.memory_ids.iter().enumerate() {
        let title = snapshot
            .memories
            .iter()
            .find(|m| &m.id == memory_id)
            .map_or("?", |m| m.title.as_str());
        let _ = write!(text, "{}. **{title}** `{memory_id}`\n", index + 1);
        if let Some(relationship) = path.relationships.get(index) {
            let _ = write!(
                text,
                "   -[{}]-> (strength {:.2})\n",
                relationship.relationship_type, relationship.properties.strength,
            );
        }
    }
    Ok(ToolResult::text(text))
}

/// Executes the `analyze_memory_clusters` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_analyze_memory_clusters(
    db: &MemoryDatabase,
    arguments: Value,
) -> Result<ToolResult> {
    let args: ClustersArgs = parse_args(arguments)?;
    let threshold = args.threshold.unwrap_or(0.5);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(crate::Error::Validation(format!(
            "threshold must be within [0.0, 1.0] (got {threshold})"
        )));
    }
    let snapshot = GraphSnapshot::load(db.backend())?;
    let clusters = analyze_clusters(&snapshot, threshold);

    if clusters.is_empty() {
        return Ok(ToolResult::text(format!(
            "No clusters at strength >= {threshold:.2}."
        )));
    }
    let mut text = format!(
        "**{} clusters** (edge strength >= {threshold:.2})\n\n",
        clusters.len()
    );
    for (index, cluster) in clusters.iter().enumerate() {
        let _ = write!(
            text,
            "{}. {} memories, {} edges, mean strength {:.2}\n",
            index + 1,
            cluster.memory_ids.len(),
            cluster.edge_count,
            cluster.average_strength,
        );
        for memory_id in &cluster.memory_ids {
            let _ = write!(text, "   - `{memory_id}`\n");
        }
    }
    Ok(ToolResult::text(text))
}

/// Executes the `find_bridge_memories` tool.
///
/// # Errors
///
/// Returns an error if the operation fails.
pub fn execute_find_bridge_memories(db: &MemoryDatabase, _arguments: Value) -> Result<ToolResult> {
    let snapshot = GraphSnapshot::load(db.backend())?;
    let bridges = find_bridges(&snapshot);

    if bridges.is_empty() {
        return Ok(ToolResult::text(
            "No bridge memories: removing any single relationship keeps every component connected.",
        ));
    }
    let mut text = format!("**{} bridge memories**\n\n", bridges.len());
    for bridge in &bridges {
        let title = snapshot
            .memories
            .iter()
            .find(|m| m.id == bridge.memory_id)
            .map_or("?", |m| m.title.as_str());
        let _ = write!(
            text,
            "- **{title}** `{}` on {} bridge edge(s), betweenness ~{:.3}\n",
            bridge.memory_id, bridge.bridge_count, bridge.score,
        );
    }
    Ok(ToolResult::text(text))
}

/// Executes the `analyze_graph_metrics` tool.
///
/// # Errors
///
/// Returns an error if the operation fails.
pub fn execute_analyze_graph_metrics(db: &MemoryDatabase, _arguments: Value) -> Result<ToolResult> {
    let snapshot = GraphSnapshot::load(db.backend())?;
    let metrics = graph_metrics(&snapshot);

    let mut text = format!(
        "**Graph metrics**\n\n\
         - Memories: {}\n\
         - Current relationships: {}\n\
         - Avg relationships per memory: {:.2}\n\
         - Density: {:.4}\n\
         - Connected components: {}\n",
        metrics.memory_count,
        metrics.relationship_count,
        metrics.average_relationships_per_memory,
        metrics.density,
        metrics.connected_components,
    );
    if !metrics.memories_by_type.is_empty() {
        text.push_str("\nMemories by type:\n");
        for (memory_type, count) in &metrics.memories_by_type {
            let _ = write!(text, "- {memory_type}: {count}\n");
        }
    }
    if !metrics.relationships_by_type.is_empty() {
        text.push_str("\nRelationships by type:\n");
        for (relationship_type, count) in &metrics.relationships_by_type {
            let _ = write!(text, "- {relationship_type}: {count}\n");
        }
    }
    Ok(ToolResult::text(text))
}

/// Executes the `track_entity_timeline` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the operation fails.
pub fn execute_track_entity_timeline(
    db: &MemoryDatabase,
    arguments: Value,
) -> Result<ToolResult> {
    let args: TimelineArgs = parse_args(arguments)?;
    let snapshot = GraphSnapshot::load(db.backend())?;
    let timeline = track_entity_timeline(&snapshot, &args.entity);

    if timeline.is_empty() {
        return Ok(ToolResult::text(format!(
            "No memories mention \"{}\".",
            args.entity
        )));
    }
    let mut text = format!(
        "**Timeline for \"{}\"** ({} memories, oldest first)\n\n",
        args.entity,
        timeline.len(),
    );
    for memory in &timeline {
        let _ = write!(
            text,
            "- {} — **{}** `{}`\n",
            memory.created_at.to_rfc3339(),
            memory.title,
            memory.id,
        );
    }
    Ok(ToolResult::text(text))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::MemoryGraphConfig;
    use crate::mcp::tools::ToolContent;
    use crate::models::{MemoryInput, RelationshipInput};
    use crate::storage::{MemoryOperations, SqliteBackend};
    use std::sync::Arc;

    fn db() -> MemoryDatabase {
        let config = MemoryGraphConfig::default();
        let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
        MemoryDatabase::new(backend, &config)
    }

    fn text_of(result: &ToolResult) -> &str {
        let ToolContent::Text { text } = &result.content[0];
        text
    }

    fn store(db: &MemoryDatabase, title: &str) -> String {
        db.store_memory(MemoryInput {
            title: title.to_string(),
            content: title.to_string(),
            ..Default::default()
        })
        .unwrap()
        .id
        .as_str()
        .to_string()
    }

    fn link(db: &MemoryDatabase, from: &str, to: &str, strength: f64) {
        db.create_relationship(RelationshipInput {
            from_memory_id: from.to_string(),
            to_memory_id: to.to_string(),
            relationship_type: "RELATED_TO".to_string(),
            strength: Some(strength),
            confidence: None,
            context: None,
            valid_from: None,
        })
        .unwrap();
    }

    #[test]
    fn test_path_and_metrics() {
        let db = db();
        let a = store(&db, "a");
        let b = store(&db, "b");
        let c = store(&db, "c");
        link(&db, &a, &b, 0.8);
        link(&db, &b, &c, 0.7);

        let path = execute_find_memory_path(
            &db,
            serde_json::json!({"from_memory_id": a, "to_memory_id": c}),
        )
        .unwrap();
        assert!(text_of(&path).contains("2 hops"));

        let metrics = execute_analyze_graph_metrics(&db, serde_json::json!({})).unwrap();
        assert!(text_of(&metrics).contains("Memories: 3"));
        assert!(text_of(&metrics).contains("RELATED_TO: 2"));
    }

    #[test]
    fn test_no_path_message() {
        let db = db();
        let a = store(&db, "a");
        let b = store(&db, "b");
        let result = execute_find_memory_path(
            &db,
            serde_json::json!({"from_memory_id": a, "to_memory_id": b}),
        )
        .unwrap();
        assert!(text_of(&result).contains("No path"));
    }

    #[test]
    fn test_clusters_threshold_validation() {
        let db = db();
        let err = execute_analyze_memory_clusters(&db, serde_json::json!({"threshold": 1.5}))
            .unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }
}
