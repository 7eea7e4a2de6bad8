//! Breadth-first traversal of related memories.

use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::Result;
use crate::models::{Memory, MemoryId, Relationship, RelationshipType};
use crate::storage::MemoryOperations;

/// A neighbor discovered during traversal.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RelatedMemory {
    /// The neighboring memory.
    pub memory: Memory,
    /// The relationship that connects it.
    pub relationship: Relationship,
    /// Hop count from the start memory (1 = direct neighbor).
    pub depth: usize,
}

/// BFS over out-edges from `start`, up to `max_depth` hops.
///
/// `as_of = None` is the current-only view; `Some(ts)` applies the
/// point-in-time visibility rule. A visited set prevents re-expansion, so
/// traversal terminates even on snapshot-inconsistent reads. Results come
/// back ordered `(depth ASC, strength DESC, id ASC)`.
///
/// # Errors
///
/// Returns an error if a backend read fails.
pub fn bfs_related(
    backend: &Arc<dyn MemoryOperations>,
    start: &MemoryId,
    max_depth: usize,
    types: Option<&[RelationshipType]>,
    as_of: Option<DateTime<Utc>>,
) -> Result<Vec<RelatedMemory>> {
    let mut results: Vec<RelatedMemory> = Vec::new();
    let mut visited: HashSet<MemoryId> = HashSet::new();
    visited.insert(start.clone());

    let mut queue: VecDeque<(MemoryId, usize)> = VecDeque::new();
    queue.push_back((start.clone(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for (memory, relationship) in backend.get_related_memories(&current, types, as_of)? {
            if !visited.insert(memory.id.clone()) {
                continue;
            }
            queue.push_back((memory.id.clone(), depth + 1));
            results.push(RelatedMemory {
                memory,
                relationship,
                depth: depth + 1,
            });
        }
    }

    results.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| {
                b.relationship
                    .properties
                    .strength
                    .total_cmp(&a.relationship.properties.strength)
            })
            .then_with(|| a.memory.id.cmp(&b.memory.id))
    });
    Ok(results)
}
