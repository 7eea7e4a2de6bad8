//! Cycle detection over ordering-imposing relationships.
//!
//! Before inserting `from -> to`, the graph is searched for an existing
//! path `to -> ... -> from` over *current* relationships whose types impose
//! ordering. Finding one means the new edge would close a cycle.
//! O(V+E) over the reachable sub-graph, O(V) visited set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::Result;
use crate::models::MemoryId;
use crate::storage::MemoryOperations;

/// Searches for a path `to -> ... -> from` over current ordering-imposing
/// relationships.
///
/// Returns the full cycle path `[from, to, ..., from]` the new edge would
/// create, or `None` when the insert is safe.
///
/// # Errors
///
/// Returns an error if a backend read fails.
pub fn find_cycle_path(
    backend: &Arc<dyn MemoryOperations>,
    from: &MemoryId,
    to: &MemoryId,
) -> Result<Option<Vec<String>>> {
    // Depth-first from `to` along out-edges; parent links reconstruct the
    // path once `from` is reached.
    let mut stack: Vec<MemoryId> = vec![to.clone()];
    let mut visited: HashSet<MemoryId> = HashSet::new();
    let mut parent: HashMap<MemoryId, MemoryId> = HashMap::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        if current == *from {
            return Ok(Some(reconstruct(from, to, &parent)));
        }
        for relationship in backend.relationships_from(&current, None)? {
            if !relationship.relationship_type.imposes_ordering() {
                continue;
            }
            let next = relationship.to_memory_id;
            if !visited.contains(&next) {
                parent.entry(next.clone()).or_insert_with(|| current.clone());
                stack.push(next);
            }
        }
    }
    Ok(None)
}

/// Builds `[from, to, ..., from]` from the parent links of the search.
fn reconstruct(from: &MemoryId, to: &MemoryId, parent: &HashMap<MemoryId, MemoryId>) -> Vec<String> {
    // Walk back from `from` to `to` along the discovered path.
    let mut reversed = vec![from.clone()];
    let mut cursor = from.clone();
    while cursor != *to {
        match parent.get(&cursor) {
            Some(previous) => {
                reversed.push(previous.clone());
                cursor = previous.clone();
            },
            None => break,
        }
    }
    // reversed = [from, ..., to]; the cycle runs from -> to -> ... -> from.
    let mut path: Vec<String> = vec![from.as_str().to_string()];
    for id in reversed.iter().rev() {
        path.push(id.as_str().to_string());
    }
    path
}
