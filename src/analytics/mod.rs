// Allow cast_precision_loss for usize-to-f64 conversions in metric ratios;
// graph sizes stay far below the 2^52 precision boundary.
#![allow(clippy::cast_precision_loss)]

//! Graph analytics.
//!
//! Each helper is a pure reducer over a materialized [`GraphSnapshot`]
//! (memories plus *current* relationships). Nothing here writes, and
//! nothing holds a lock across the reduction: the snapshot is loaded once,
//! then everything is in-memory computation.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::Result;
use crate::models::{Memory, MemoryId, Relationship, RelationshipId};
use crate::storage::MemoryOperations;

/// A point-in-time materialization of the current graph.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    /// All memories.
    pub memories: Vec<Memory>,
    /// Current relationships only (`valid_until IS NULL`).
    pub relationships: Vec<Relationship>,
}

impl GraphSnapshot {
    /// Loads the current graph from a backend.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend read fails.
    pub fn load(backend: &Arc<dyn MemoryOperations>) -> Result<Self> {
        let memories = backend.list_memories()?;
        let relationships = backend
            .list_relationships()?
            .into_iter()
            .filter(Relationship::is_current)
            .collect();
        Ok(Self {
            memories,
            relationships,
        })
    }

    fn memory_by_id(&self, id: &MemoryId) -> Option<&Memory> {
        self.memories.iter().find(|m| &m.id == id)
    }

    /// Undirected adjacency: memory -> (neighbor, relationship index).
    fn undirected_adjacency(&self) -> HashMap<&MemoryId, Vec<(&MemoryId, usize)>> {
        let mut adjacency: HashMap<&MemoryId, Vec<(&MemoryId, usize)>> = HashMap::new();
        for memory in &self.memories {
            adjacency.entry(&memory.id).or_default();
        }
        for (index, relationship) in self.relationships.iter().enumerate() {
            adjacency
                .entry(&relationship.from_memory_id)
                .or_default()
                .push((&relationship.to_memory_id, index));
            adjacency
                .entry(&relationship.to_memory_id)
                .or_default()
                .push((&relationship.from_memory_id, index));
        }
        adjacency
    }
}

/// A path between two memories.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryPath {
    /// Memory IDs along the path, endpoints included.
    pub memory_ids: Vec<MemoryId>,
    /// Relationships connecting consecutive memories.
    pub relationships: Vec<Relationship>,
    /// Sum of relationship strengths along the path.
    pub total_strength: f64,
}

/// Shortest path between two memories via bidirectional BFS over current
/// relationships, at most `max_depth` hops. Among shortest paths the one
/// with the highest accumulated strength wins. `None` when no path exists
/// within the bound.
#[must_use]
pub fn find_path(
    snapshot: &GraphSnapshot,
    src: &MemoryId,
    dst: &MemoryId,
    max_depth: usize,
) -> Option<MemoryPath> {
    if src == dst {
        return Some(MemoryPath {
            memory_ids: vec![src.clone()],
            relationships: Vec::new(),
            total_strength: 0.0,
        });
    }
    let forward = directed_adjacency(snapshot, Direction::Forward);
    let backward = directed_adjacency(snapshot, Direction::Backward);

    // Level-synchronized search from both ends; the first level where the
    // frontiers intersect yields every shortest path candidate.
    let mut from_src: HashMap<&MemoryId, Option<(&MemoryId, usize)>> = HashMap::new();
    let mut from_dst: HashMap<&MemoryId, Option<(&MemoryId, usize)>> = HashMap::new();
    from_src.insert(src, None);
    from_dst.insert(dst, None);
    let mut src_frontier: Vec<&MemoryId> = vec![src];
    let mut dst_frontier: Vec<&MemoryId> = vec![dst];
    let mut depth = 0;

    while depth < max_depth && (!src_frontier.is_empty() || !dst_frontier.is_empty()) {
        // Expand the smaller frontier for the classic bidirectional win.
        let expand_src = !src_frontier.is_empty()
            && (dst_frontier.is_empty() || src_frontier.len() <= dst_frontier.len());
        depth += 1;

        let (frontier, visited, adjacency) = if expand_src {
            (&mut src_frontier, &mut from_src, &forward)
        } else {
            (&mut dst_frontier, &mut from_dst, &backward)
        };

        let mut next: Vec<&MemoryId> = Vec::new();
        for current in frontier.iter().copied() {
            for (neighbor, rel_index) in adjacency.get(current).into_iter().flatten() {
                if !visited.contains_key(*neighbor) {
                    visited.insert(*neighbor, Some((current, *rel_index)));
                    next.push(*neighbor);
                }
            }
        }
        *frontier = next;

        let meets: Vec<&MemoryId> = if expand_src {
            src_frontier
                .iter()
                .copied()
                .filter(|m| from_dst.contains_key(*m))
                .collect()
        } else {
            dst_frontier
                .iter()
                .copied()
                .filter(|m| from_src.contains_key(*m))
                .collect()
        };

        if !meets.is_empty() {
            return meets
                .into_iter()
                .filter_map(|meet| assemble_path(snapshot, meet, &from_src, &from_dst))
                .filter(|p| p.relationships.len() <= max_depth)
                .max_by(|a, b| a.total_strength.total_cmp(&b.total_strength));
        }
    }
    None
}

enum Direction {
    Forward,
    Backward,
}

fn directed_adjacency<'a>(
    snapshot: &'a GraphSnapshot,
    direction: Direction,
) -> HashMap<&'a MemoryId, Vec<(&'a MemoryId, usize)>> {
    let mut adjacency: HashMap<&MemoryId, Vec<(&MemoryId, usize)>> = HashMap::new();
    for (index, relationship) in snapshot.relationships.iter().enumerate() {
        let (key, value) = match direction {
            Direction::Forward => (&relationship.from_memory_id, &relationship.to_memory_id),
            Direction::Backward => (&relationship.to_memory_id, &relationship.from_memory_id),
        };
        adjacency.entry(key).or_default().push((value, index));
    }
    adjacency
}

fn assemble_path(
    snapshot: &GraphSnapshot,
    meet: &MemoryId,
    from_src: &HashMap<&MemoryId, Option<(&MemoryId, usize)>>,
    from_dst: &HashMap<&MemoryId, Option<(&MemoryId, usize)>>,
) -> Option<MemoryPath> {
    // Walk meet -> src, reverse, then meet -> dst.
    let mut ids: Vec<MemoryId> = Vec::new();
    let mut rel_indices: Vec<usize> = Vec::new();

    let mut cursor = meet;
    let mut head: Vec<(MemoryId, Option<usize>)> = Vec::new();
    loop {
        match *from_src.get(cursor)? {
            Some((previous, rel_index)) => {
                head.push((cursor.clone(), Some(rel_index)));
                cursor = previous;
            },
            None => {
                head.push((cursor.clone(), None));
                break;
            },
        }
    }
    head.reverse();
    for (id, rel_index) in head {
        ids.push(id);
        if let Some(rel_index) = rel_index {
            rel_indices.push(rel_index);
        }
    }

    cursor = meet;
    loop {
        match *from_dst.get(cursor)? {
            Some((next, rel_index)) => {
                rel_indices.push(rel_index);
                ids.push(next.clone());
                cursor = next;
            },
            None => break,
        }
    }

    let relationships: Vec<Relationship> = rel_indices
        .iter()
        .map(|i| snapshot.relationships[*i].clone())
        .collect();
    let total_strength = relationships.iter().map(|r| r.properties.strength).sum();
    Some(MemoryPath {
        memory_ids: ids,
        relationships,
        total_strength,
    })
}

/// A weakly connected component of strongly linked memories.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryCluster {
    /// Member memory IDs, sorted.
    pub memory_ids: Vec<MemoryId>,
    /// Edges inside the cluster at or above the threshold.
    pub edge_count: usize,
    /// Mean strength of those edges.
    pub average_strength: f64,
}

/// Weakly connected components restricted to edges with
/// `strength >= threshold`; singletons are not clusters. Sorted by size
/// descending, then by first member for determinism.
#[must_use]
pub fn analyze_clusters(snapshot: &GraphSnapshot, threshold: f64) -> Vec<MemoryCluster> {
    let mut component: HashMap<&MemoryId, usize> = HashMap::new();
    let mut next_component = 0_usize;
    let mut queue: VecDeque<&MemoryId> = VecDeque::new();

    let strong: Vec<&Relationship> = snapshot
        .relationships
        .iter()
        .filter(|r| r.properties.strength >= threshold)
        .collect();

    let mut adjacency: HashMap<&MemoryId, Vec<&MemoryId>> = HashMap::new();
    for relationship in &strong {
        adjacency
            .entry(&relationship.from_memory_id)
            .or_default()
            .push(&relationship.to_memory_id);
        adjacency
            .entry(&relationship.to_memory_id)
            .or_default()
            .push(&relationship.from_memory_id);
    }

    for memory in &snapshot.memories {
        if component.contains_key(&memory.id) {
            continue;
        }
        let label = next_component;
        next_component += 1;
        component.insert(&memory.id, label);
        queue.push_back(&memory.id);
        while let Some(current) = queue.pop_front() {
            for neighbor in adjacency.get(current).into_iter().flatten() {
                if !component.contains_key(*neighbor) {
                    component.insert(*neighbor, label);
                    queue.push_back(*neighbor);
                }
            }
        }
    }

    let mut members: HashMap<usize, Vec<MemoryId>> = HashMap::new();
    for (id, label) in &component {
        members.entry(*label).or_default().push((*id).clone());
    }

    let mut clusters: Vec<MemoryCluster> = members
        .into_values()
        .filter(|ids| ids.len() >= 2)
        .map(|mut ids| {
            ids.sort();
            let set: HashSet<&MemoryId> = ids.iter().collect();
            let inside: Vec<&&Relationship> = strong
                .iter()
                .filter(|r| set.contains(&r.from_memory_id) && set.contains(&r.to_memory_id))
                .collect();
            let edge_count = inside.len();
            let average_strength = if inside.is_empty() {
                0.0
            } else {
                inside.iter().map(|r| r.properties.strength).sum::<f64>() / edge_count as f64
            };
            MemoryCluster {
                memory_ids: ids,
                edge_count,
                average_strength,
            }
        })
        .collect();

    clusters.sort_by(|a, b| {
        b.memory_ids
            .len()
            .cmp(&a.memory_ids.len())
            .then_with(|| a.memory_ids.cmp(&b.memory_ids))
    });
    clusters
}

/// A memory that sits on bridge edges.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeMemory {
    /// The memory ID.
    pub memory_id: MemoryId,
    /// How many bridge edges touch it.
    pub bridge_count: usize,
    /// Betweenness approximation: for each bridge, the fraction of node
    /// pairs whose only connection crosses it, summed over the memory's
    /// bridges.
    pub score: f64,
}

/// Finds bridge edges (removal disconnects a component) with the classic
/// low-link algorithm and reports their endpoint memories with a
/// betweenness approximation. Sorted by score descending, then ID.
#[must_use]
pub fn find_bridges(snapshot: &GraphSnapshot) -> Vec<BridgeMemory> {
    let adjacency = snapshot.undirected_adjacency();
    let node_count = snapshot.memories.len();
    if node_count < 2 {
        return Vec::new();
    }

    // Iterative DFS computing discovery and low-link times. An edge (u, v)
    // is a bridge when low[v] > disc[u].
    let mut disc: HashMap<&MemoryId, usize> = HashMap::new();
    let mut low: HashMap<&MemoryId, usize> = HashMap::new();
    let mut timer = 0_usize;
    let mut bridges: Vec<usize> = Vec::new();

    for root in adjacency.keys() {
        if disc.contains_key(*root) {
            continue;
        }
        // Stack frames: (node, parent edge index, neighbor cursor).
        let mut stack: Vec<(&MemoryId, Option<usize>, usize)> = vec![(*root, None, 0)];
        disc.insert(*root, timer);
        low.insert(*root, timer);
        timer += 1;

        while let Some((node, parent_edge, cursor)) = stack.pop() {
            let neighbors = adjacency.get(node).map_or(&[][..], Vec::as_slice);
            if cursor < neighbors.len() {
                stack.push((node, parent_edge, cursor + 1));
                let (neighbor, edge_index) = neighbors[cursor];
                if Some(edge_index) == parent_edge {
                    continue;
                }
                if let Some(seen) = disc.get(neighbor) {
                    let updated = (*low.get(node).unwrap_or(&0)).min(*seen);
                    low.insert(node, updated);
                } else {
                    disc.insert(neighbor, timer);
                    low.insert(neighbor, timer);
                    timer += 1;
                    stack.push((neighbor, Some(edge_index), 0));
                }
            } else if let Some(edge_index) = parent_edge {
                // Frame exhausted: fold low-link into the parent and test
                // the tree edge for bridge-ness.
                let relationship = &snapshot.relationships[edge_index];
                let parent = if &relationship.from_memory_id == node {
                    &relationship.to_memory_id
                } else {
                    &relationship.from_memory_id
                };
                let node_low = *low.get(node).unwrap_or(&0);
                let parent_low = *low.get(parent).unwrap_or(&0);
                low.insert(parent, parent_low.min(node_low));
                if node_low > *disc.get(parent).unwrap_or(&0) {
                    bridges.push(edge_index);
                }
            }
        }
    }

    // Betweenness approximation: side sizes with the bridge removed.
    let total_pairs = (node_count * (node_count - 1)) as f64 / 2.0;
    let mut scores: HashMap<&MemoryId, (usize, f64)> = HashMap::new();
    for edge_index in bridges {
        let relationship = &snapshot.relationships[edge_index];
        let side = component_size_without_edge(
            &adjacency,
            &relationship.from_memory_id,
            edge_index,
        );
        let other_side = component_size_without_edge(
            &adjacency,
            &relationship.to_memory_id,
            edge_index,
        );
        let score = (side * other_side) as f64 / total_pairs;
        for endpoint in [&relationship.from_memory_id, &relationship.to_memory_id] {
            let entry = scores.entry(endpoint).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += score;
        }
    }

    let mut out: Vec<BridgeMemory> = scores
        .into_iter()
        .map(|(memory_id, (bridge_count, score))| BridgeMemory {
            memory_id: memory_id.clone(),
            bridge_count,
            score,
        })
        .collect();
    out.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.memory_id.cmp(&b.memory_id))
    });
    out
}

fn component_size_without_edge(
    adjacency: &HashMap<&MemoryId, Vec<(&MemoryId, usize)>>,
    start: &MemoryId,
    excluded_edge: usize,
) -> usize {
    let mut visited: HashSet<&MemoryId> = HashSet::new();
    let Some((start_key, _)) = adjacency.get_key_value(start) else {
        return 0;
    };
    visited.insert(start_key);
    let mut queue: VecDeque<&MemoryId> = VecDeque::new();
    queue.push_back(start_key);
    while let Some(current) = queue.pop_front() {
        for (neighbor, edge_index) in adjacency.get(current).into_iter().flatten() {
            if *edge_index == excluded_edge || visited.contains(*neighbor) {
                continue;
            }
            visited.insert(*neighbor);
            queue.push_back(*neighbor);
        }
    }
    visited.len()
}

/// Aggregate graph statistics.
#[derive(Debug, Clone, Serialize)]
pub struct GraphMetrics {
    /// Total memories.
    pub memory_count: usize,
    /// Total current relationships.
    pub relationship_count: usize,
    /// Memory counts by type.
    pub memories_by_type: BTreeMap<String, usize>,
    /// Relationship counts by type.
    pub relationships_by_type: BTreeMap<String, usize>,
    /// Mean relationships (in or out) per memory.
    pub average_relationships_per_memory: f64,
    /// Directed density: `E / (V * (V - 1))`.
    pub density: f64,
    /// Weakly connected component count.
    pub connected_components: usize,
}

/// Computes aggregate metrics over the snapshot.
#[must_use]
pub fn graph_metrics(snapshot: &GraphSnapshot) -> GraphMetrics {
    let memory_count = snapshot.memories.len();
    let relationship_count = snapshot.relationships.len();

    let mut memories_by_type: BTreeMap<String, usize> = BTreeMap::new();
    for memory in &snapshot.memories {
        *memories_by_type
            .entry(memory.memory_type.as_str().to_string())
            .or_default() += 1;
    }
    let mut relationships_by_type: BTreeMap<String, usize> = BTreeMap::new();
    for relationship in &snapshot.relationships {
        *relationships_by_type
            .entry(relationship.relationship_type.as_str().to_string())
            .or_default() += 1;
    }

    let average_relationships_per_memory = if memory_count == 0 {
        0.0
    } else {
        // Each edge touches two memories.
        2.0 * relationship_count as f64 / memory_count as f64
    };
    let density = if memory_count < 2 {
        0.0
    } else {
        relationship_count as f64 / (memory_count * (memory_count - 1)) as f64
    };

    // Component count via the threshold-free cluster pass.
    let components = {
        let clustered = analyze_clusters(snapshot, 0.0);
        let clustered_members: usize = clustered.iter().map(|c| c.memory_ids.len()).sum();
        clustered.len() + (memory_count - clustered_members)
    };

    GraphMetrics {
        memory_count,
        relationship_count,
        memories_by_type,
        relationships_by_type,
        average_relationships_per_memory,
        density,
        connected_components: components,
    }
}

/// All memories whose context mentions the entity (context fields or
/// tags), ordered by `created_at ASC`.
#[must_use]
pub fn track_entity_timeline(snapshot: &GraphSnapshot, entity: &str) -> Vec<Memory> {
    let needle = entity.to_lowercase();
    let mut timeline: Vec<Memory> = snapshot
        .memories
        .iter()
        .filter(|m| m.context.mentions(entity) || m.tags.iter().any(|t| t.contains(&needle)))
        .cloned()
        .collect();
    timeline.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    timeline
}

/// Looks up the relationship connecting two adjacent path memories, for
/// rendering.
#[must_use]
pub fn relationship_between<'a>(
    snapshot: &'a GraphSnapshot,
    a: &MemoryId,
    b: &MemoryId,
) -> Option<&'a Relationship> {
    snapshot.relationships.iter().find(|r| {
        (&r.from_memory_id == a && &r.to_memory_id == b)
            || (&r.from_memory_id == b && &r.to_memory_id == a)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::{
        MemoryInput, MemoryType, RelationshipProperties, RelationshipType, utc_now,
    };

    fn memory(title: &str) -> Memory {
        Memory::from_input(MemoryInput {
            memory_type: MemoryType::General,
            title: title.to_string(),
            content: title.to_string(),
            ..Default::default()
        })
    }

    fn relationship(from: &Memory, to: &Memory, strength: f64) -> Relationship {
        let now = utc_now();
        Relationship {
            id: RelationshipId::generate(),
            from_memory_id: from.id.clone(),
            to_memory_id: to.id.clone(),
            relationship_type: RelationshipType::RelatedTo,
            properties: RelationshipProperties {
                strength,
                ..RelationshipProperties::default()
            },
            valid_from: now,
            valid_until: None,
            recorded_at: now,
            invalidated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(memories: Vec<Memory>, relationships: Vec<Relationship>) -> GraphSnapshot {
        GraphSnapshot {
            memories,
            relationships,
        }
    }

    #[test]
    fn test_find_path_shortest() {
        let a = memory("a");
        let b = memory("b");
        let c = memory("c");
        let rels = vec![
            relationship(&a, &b, 0.5),
            relationship(&b, &c, 0.5),
            relationship(&a, &c, 0.9),
        ];
        let snap = snapshot(vec![a.clone(), b, c.clone()], rels);

        let path = find_path(&snap, &a.id, &c.id, 6).unwrap();
        // Direct edge beats the two-hop route.
        assert_eq!(path.relationships.len(), 1);
        assert_eq!(path.memory_ids, vec![a.id.clone(), c.id.clone()]);
    }

    #[test]
    fn test_find_path_none_and_depth_bound() {
        let a = memory("a");
        let b = memory("b");
        let c = memory("c");
        let d = memory("d");
        let rels = vec![
            relationship(&a, &b, 0.5),
            relationship(&b, &c, 0.5),
            relationship(&c, &d, 0.5),
        ];
        let snap = snapshot(vec![a.clone(), b, c, d.clone()], rels);

        assert!(find_path(&snap, &a.id, &d.id, 2).is_none());
        let path = find_path(&snap, &a.id, &d.id, 6).unwrap();
        assert_eq!(path.relationships.len(), 3);

        let lonely = memory("lonely");
        let snap2 = snapshot(vec![a.clone(), lonely.clone()], Vec::new());
        assert!(find_path(&snap2, &a.id, &lonely.id, 6).is_none());
    }

    #[test]
    fn test_clusters_threshold_and_sorting() {
        let a = memory("a");
        let b = memory("b");
        let c = memory("c");
        let d = memory("d");
        let e = memory("e");
        let rels = vec![
            relationship(&a, &b, 0.9),
            relationship(&b, &c, 0.8),
            relationship(&d, &e, 0.9),
            // Weak link bridging the clusters; dropped at 0.5.
            relationship(&c, &d, 0.1),
        ];
        let snap = snapshot(
            vec![a.clone(), b.clone(), c.clone(), d.clone(), e.clone()],
            rels,
        );

        let clusters = analyze_clusters(&snap, 0.5);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].memory_ids.len(), 3);
        assert_eq!(clusters[1].memory_ids.len(), 2);

        // Without the threshold everything is one component.
        let all = analyze_clusters(&snap, 0.0);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].memory_ids.len(), 5);
    }

    #[test]
    fn test_bridges() {
        // a-b-c triangle (no bridges) plus a pendant c-d (bridge).
        let a = memory("a");
        let b = memory("b");
        let c = memory("c");
        let d = memory("d");
        let rels = vec![
            relationship(&a, &b, 0.5),
            relationship(&b, &c, 0.5),
            relationship(&a, &c, 0.5),
            relationship(&c, &d, 0.5),
        ];
        let snap = snapshot(vec![a, b, c.clone(), d.clone()], rels);

        let bridges = find_bridges(&snap);
        let ids: Vec<&MemoryId> = bridges.iter().map(|b| &b.memory_id).collect();
        assert!(ids.contains(&&c.id));
        assert!(ids.contains(&&d.id));
        assert_eq!(bridges.len(), 2);
        assert!(bridges.iter().all(|b| b.bridge_count == 1));
    }

    #[test]
    fn test_graph_metrics() {
        let a = memory("a");
        let b = memory("b");
        let lonely = memory("lonely");
        let rels = vec![relationship(&a, &b, 0.5)];
        let snap = snapshot(vec![a, b, lonely], rels);

        let metrics = graph_metrics(&snap);
        assert_eq!(metrics.memory_count, 3);
        assert_eq!(metrics.relationship_count, 1);
        assert_eq!(metrics.connected_components, 2);
        assert_eq!(metrics.memories_by_type.get("general"), Some(&3));
        assert!((metrics.density - 1.0 / 6.0).abs() < 1e-9);
        assert!((metrics.average_relationships_per_memory - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_entity_timeline_ordering() {
        let mut first = memory("first");
        first.context.technologies = vec!["Redis".to_string()];
        let mut second = memory("second");
        second.tags = vec!["redis".to_string()];
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        let unrelated = memory("unrelated");

        let snap = snapshot(vec![second.clone(), unrelated, first.clone()], Vec::new());
        let timeline = track_entity_timeline(&snap, "redis");
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].id, first.id);
        assert_eq!(timeline[1].id, second.id);
    }
}
