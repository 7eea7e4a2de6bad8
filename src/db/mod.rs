//! Memory database facade.
//!
//! The facade owns all semantics; backends are dumb. Validation, tag
//! normalization, search tolerance, cycle detection, BFS traversal, and the
//! bi-temporal operations all live here, composed over the
//! [`MemoryOperations`] capability set. Transient backend failures get one
//! internal retry; every other error kind passes straight through.

mod cycle;
mod matcher;
mod traversal;

pub use matcher::memory_matches;
pub use traversal::RelatedMemory;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::MemoryGraphConfig;
use crate::context::extract_relationship_context;
use crate::models::{
    Memory, MemoryId, MemoryInput, MemoryType, MemoryUpdate, PaginatedResult, Relationship,
    RelationshipId, RelationshipInput, RelationshipProperties, RelationshipType, SearchQuery,
    Tolerance, utc_now, validate_memory_input, validate_memory_update, validate_relationship_input,
    validate_search_input,
};
use crate::storage::{MemoryOperations, create_backend, retry_once};
use crate::{Error, Result};

/// A memory together with its current relationships.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryWithRelationships {
    /// The memory itself.
    pub memory: Memory,
    /// Current relationships touching it (out-edges then in-edges).
    pub relationships: Vec<Relationship>,
}

/// What changed in the relationship graph since a cutoff.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChangeSet {
    /// The cutoff instant.
    pub since: DateTime<Utc>,
    /// Relationships recorded at or after the cutoff.
    pub created: Vec<Relationship>,
    /// Relationships invalidated at or after the cutoff.
    pub invalidated: Vec<Relationship>,
}

/// Recent activity across memories and relationships.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecentActivity {
    /// Memories updated since the cutoff, newest first.
    pub memories: Vec<Memory>,
    /// Relationship changes over the same window.
    pub changes: ChangeSet,
}

/// A heuristic relationship-type suggestion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SuggestedRelationship {
    /// The suggested type.
    pub relationship_type: RelationshipType,
    /// Why it was suggested.
    pub rationale: String,
}

/// The semantic layer over a storage backend.
pub struct MemoryDatabase {
    backend: Arc<dyn MemoryOperations>,
    allow_cycles: bool,
    multi_tenant_mode: bool,
}

impl MemoryDatabase {
    /// Wraps an already-constructed backend.
    #[must_use]
    pub fn new(backend: Arc<dyn MemoryOperations>, config: &MemoryGraphConfig) -> Self {
        Self {
            backend,
            allow_cycles: config.allow_cycles,
            multi_tenant_mode: config.multi_tenant_mode,
        }
    }

    /// Builds the backend named by the configuration and wraps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be constructed.
    pub fn open(config: &MemoryGraphConfig) -> Result<Self> {
        let backend = create_backend(config.backend, config)?;
        Ok(Self::new(backend, config))
    }

    /// The underlying backend handle (shared with migration and health).
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn MemoryOperations> {
        &self.backend
    }

    /// Whether ordering cycles are permitted.
    #[must_use]
    pub const fn allows_cycles(&self) -> bool {
        self.allow_cycles
    }

    // ========================================================================
    // Memory operations
    // ========================================================================

    /// Validates and stores a new memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`]/[`Error::MissingField`] on bad input
    /// and backend errors after one transparent retry.
    pub fn store_memory(&self, input: MemoryInput) -> Result<Memory> {
        validate_memory_input(&input)?;
        if self.multi_tenant_mode
            && input
                .context
                .as_ref()
                .and_then(|c| c.tenant_id.as_ref())
                .is_none()
        {
            return Err(Error::Validation(
                "tenant_id is required in multi-tenant mode".to_string(),
            ));
        }
        let memory = Memory::from_input(input);
        retry_once("store_memory", || self.backend.store_memory(&memory))
    }

    /// Fetches a memory, optionally with its current relationships.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the memory does not exist.
    pub fn get_memory(
        &self,
        id: &MemoryId,
        include_relationships: bool,
    ) -> Result<MemoryWithRelationships> {
        let memory = retry_once("get_memory", || self.backend.get_memory(id))?
            .ok_or_else(|| Error::NotFound(format!("memory {id}")))?;
        let relationships = if include_relationships {
            let mut out = self.backend.relationships_from(id, None)?;
            out.extend(self.backend.relationships_to(id, None)?);
            out
        } else {
            Vec::new()
        };
        Ok(MemoryWithRelationships {
            memory,
            relationships,
        })
    }

    /// Applies a partial update. `version` bumps and `updated_at` refreshes
    /// even when every field is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the memory does not exist and
    /// [`Error::Validation`] on bad input.
    pub fn update_memory(&self, id: &MemoryId, update: MemoryUpdate) -> Result<Memory> {
        validate_memory_update(&update)?;
        let mut memory = retry_once("get_memory", || self.backend.get_memory(id))?
            .ok_or_else(|| Error::NotFound(format!("memory {id}")))?;
        memory.apply_update(update);
        retry_once("update_memory", || self.backend.update_memory(&memory))
    }

    /// Deletes a memory; its relationships cascade away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the memory does not exist.
    pub fn delete_memory(&self, id: &MemoryId) -> Result<()> {
        let deleted = retry_once("delete_memory", || self.backend.delete_memory(id))?;
        if deleted {
            Ok(())
        } else {
            Err(Error::NotFound(format!("memory {id}")))
        }
    }

    /// Searches memories with the full tolerance/match-mode semantics and
    /// returns one page.
    ///
    /// Ordering: `importance DESC, updated_at DESC, id ASC`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] on bad input and backend errors after
    /// one retry.
    pub fn search_memories(&self, query: &SearchQuery) -> Result<PaginatedResult<Memory>> {
        validate_search_input(query)?;
        let candidates = retry_once("search_memories", || self.backend.search_memories(query))?;
        let mut matches: Vec<Memory> = candidates
            .into_iter()
            .filter(|m| memory_matches(m, query))
            .collect();
        matches.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(PaginatedResult::paginate(
            matches,
            query.limit,
            query.offset,
        ))
    }

    /// Thin recall wrapper: normal tolerance, query text only.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::search_memories`] errors.
    pub fn recall_memories(&self, text: &str, limit: usize) -> Result<PaginatedResult<Memory>> {
        let query = SearchQuery::new()
            .with_query(text)
            .with_tolerance(Tolerance::Normal)
            .with_limit(limit);
        self.search_memories(&query)
    }

    // ========================================================================
    // Relationship operations
    // ========================================================================

    /// Validates and creates a relationship.
    ///
    /// Steps: endpoint existence, self-loop rejection, context structuring,
    /// cycle detection over current ordering-imposing relationships (unless
    /// cycles are allowed), then insert with `valid_from` defaulting to now
    /// and `recorded_at` always now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for missing endpoints,
    /// [`Error::Relationship`] for a self-loop, [`Error::CycleDetected`]
    /// with the discovered path, and validation/backend errors.
    pub fn create_relationship(&self, input: RelationshipInput) -> Result<Relationship> {
        let relationship_type = validate_relationship_input(&input)?;
        let from = MemoryId::new(input.from_memory_id.clone());
        let to = MemoryId::new(input.to_memory_id.clone());

        if retry_once("get_memory", || self.backend.get_memory(&from))?.is_none() {
            return Err(Error::NotFound(format!("memory {from}")));
        }
        if retry_once("get_memory", || self.backend.get_memory(&to))?.is_none() {
            return Err(Error::NotFound(format!("memory {to}")));
        }

        let context_json = input
            .context
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(|text| {
                serde_json::to_value(extract_relationship_context(text))
                    .map_err(|e| Error::Internal(format!("context serialization failed: {e}")))
            })
            .transpose()?;

        if !self.allow_cycles
            && relationship_type.imposes_ordering()
            && let Some(path) = cycle::find_cycle_path(&self.backend, &from, &to)?
        {
            return Err(Error::CycleDetected { path });
        }

        let now = utc_now();
        let relationship = Relationship {
            id: RelationshipId::generate(),
            from_memory_id: from,
            to_memory_id: to,
            relationship_type,
            properties: RelationshipProperties {
                strength: input.strength.unwrap_or(0.5),
                confidence: input.confidence.unwrap_or(0.5),
                evidence_count: 1,
                last_reinforced: now,
                context_json,
            },
            valid_from: input.valid_from.unwrap_or(now),
            valid_until: None,
            recorded_at: now,
            invalidated_by: None,
            created_at: now,
            updated_at: now,
        };
        retry_once("create_relationship", || {
            self.backend.create_relationship(&relationship)
        })?;
        Ok(relationship)
    }

    /// Fetches a relationship by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if absent.
    pub fn get_relationship(&self, id: &RelationshipId) -> Result<Relationship> {
        retry_once("get_relationship", || self.backend.get_relationship(id))?
            .ok_or_else(|| Error::NotFound(format!("relationship {id}")))
    }

    /// BFS traversal of related memories from `id`.
    ///
    /// `as_of = None` is the current-only default; results are ordered
    /// `(depth ASC, strength DESC, id ASC)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the start memory does not exist.
    pub fn get_related_memories(
        &self,
        id: &MemoryId,
        max_depth: usize,
        types: Option<&[RelationshipType]>,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<RelatedMemory>> {
        if retry_once("get_memory", || self.backend.get_memory(id))?.is_none() {
            return Err(Error::NotFound(format!("memory {id}")));
        }
        traversal::bfs_related(&self.backend, id, max_depth, types, as_of)
    }

    /// Point-in-time view: every edge touching `id` (either direction)
    /// that was valid at `as_of`, with the memory on the far end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the memory does not exist.
    pub fn query_as_of(&self, id: &MemoryId, as_of: DateTime<Utc>) -> Result<Vec<RelatedMemory>> {
        if retry_once("get_memory", || self.backend.get_memory(id))?.is_none() {
            return Err(Error::NotFound(format!("memory {id}")));
        }
        let mut edges = self.backend.relationships_from(id, Some(as_of))?;
        edges.extend(self.backend.relationships_to(id, Some(as_of))?);

        let mut related = Vec::with_capacity(edges.len());
        for relationship in edges {
            let neighbor_id = if &relationship.from_memory_id == id {
                relationship.to_memory_id.clone()
            } else {
                relationship.from_memory_id.clone()
            };
            let Some(memory) = self.backend.get_memory(&neighbor_id)? else {
                continue;
            };
            related.push(RelatedMemory {
                memory,
                relationship,
                depth: 1,
            });
        }
        related.sort_by(|a, b| {
            b.relationship
                .properties
                .strength
                .total_cmp(&a.relationship.properties.strength)
                .then_with(|| a.memory.id.cmp(&b.memory.id))
        });
        Ok(related)
    }

    /// Invalidates a relationship: sets `valid_until` (to `at`, defaulting
    /// to now) and records the superseding relationship. Idempotent: a
    /// second call returns the existing row untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the relationship does not exist and
    /// [`Error::Validation`] when `at` does not lie after `valid_from`.
    pub fn invalidate_relationship(
        &self,
        id: &RelationshipId,
        invalidated_by: Option<RelationshipId>,
        at: Option<DateTime<Utc>>,
    ) -> Result<Relationship> {
        let mut relationship = self.get_relationship(id)?;
        if !relationship.is_current() {
            return Ok(relationship);
        }
        let valid_until = at.unwrap_or_else(utc_now);
        if valid_until <= relationship.valid_from {
            return Err(Error::Validation(format!(
                "valid_until must be after valid_from ({})",
                relationship.valid_from.to_rfc3339()
            )));
        }
        relationship.valid_until = Some(valid_until);
        relationship.invalidated_by = invalidated_by;
        relationship.updated_at = utc_now();
        retry_once("update_relationship", || {
            self.backend.update_relationship(&relationship)
        })?;
        Ok(relationship)
    }

    /// Reinforces a relationship: bumps `evidence_count`, refreshes
    /// `last_reinforced`, and optionally raises strength (clamped to 1.0).
    /// Reinforcing an invalidated relationship is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if absent and [`Error::Relationship`]
    /// when the relationship is no longer current.
    pub fn reinforce_relationship(
        &self,
        id: &RelationshipId,
        strength_boost: Option<f64>,
    ) -> Result<Relationship> {
        let mut relationship = self.get_relationship(id)?;
        if !relationship.is_current() {
            return Err(Error::Relationship(format!(
                "cannot reinforce invalidated relationship {id}"
            )));
        }
        let boost = strength_boost.unwrap_or(0.05);
        if !(0.0..=1.0).contains(&boost) {
            return Err(Error::Validation(format!(
                "strength_boost must be within [0.0, 1.0] (got {boost})"
            )));
        }
        relationship.properties.evidence_count += 1;
        relationship.properties.last_reinforced = utc_now();
        relationship.properties.strength =
            (relationship.properties.strength + boost).clamp(0.0, 1.0);
        relationship.updated_at = utc_now();
        retry_once("update_relationship", || {
            self.backend.update_relationship(&relationship)
        })?;
        Ok(relationship)
    }

    /// Full bi-temporal history of every relationship touching a memory,
    /// ordered by `valid_from ASC`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the memory does not exist.
    pub fn get_relationship_history(&self, id: &MemoryId) -> Result<Vec<Relationship>> {
        if retry_once("get_memory", || self.backend.get_memory(id))?.is_none() {
            return Err(Error::NotFound(format!("memory {id}")));
        }
        retry_once("relationships_touching", || {
            self.backend.relationships_touching(id)
        })
    }

    /// Union of relationships recorded and invalidated since the cutoff.
    ///
    /// # Errors
    ///
    /// Returns backend errors after one retry.
    pub fn what_changed(&self, since: DateTime<Utc>) -> Result<ChangeSet> {
        let created = retry_once("relationships_recorded_since", || {
            self.backend.relationships_recorded_since(since)
        })?;
        let invalidated = retry_once("relationships_invalidated_since", || {
            self.backend.relationships_invalidated_since(since)
        })?;
        Ok(ChangeSet {
            since,
            created,
            invalidated,
        })
    }

    /// Memories updated since the cutoff (newest first, capped at `limit`)
    /// plus relationship changes over the same window.
    ///
    /// # Errors
    ///
    /// Returns backend errors after one retry.
    pub fn recent_activity(&self, since: DateTime<Utc>, limit: usize) -> Result<RecentActivity> {
        let mut query = SearchQuery::new();
        query.date_from = Some(since);
        let mut memories =
            retry_once("search_memories", || self.backend.search_memories(&query))?;
        memories.retain(|m| m.updated_at >= since);
        memories.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        memories.truncate(limit);
        Ok(RecentActivity {
            memories,
            changes: self.what_changed(since)?,
        })
    }

    /// Scans current relationships whose structured context mentions the
    /// query text (in `text`, `components`, `conditions`, or `evidence`).
    ///
    /// # Errors
    ///
    /// Returns backend errors after one retry.
    pub fn search_relationships_by_context(&self, text: &str) -> Result<Vec<Relationship>> {
        let needle = text.to_lowercase();
        let relationships =
            retry_once("list_relationships", || self.backend.list_relationships())?;
        Ok(relationships
            .into_iter()
            .filter(Relationship::is_current)
            .filter(|r| context_mentions(r, &needle))
            .collect())
    }

    /// Suggests a relationship type for `from -> to` from the endpoint
    /// memory types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if either memory does not exist.
    pub fn suggest_relationship_type(
        &self,
        from: &MemoryId,
        to: &MemoryId,
    ) -> Result<SuggestedRelationship> {
        let from_memory = retry_once("get_memory", || self.backend.get_memory(from))?
            .ok_or_else(|| Error::NotFound(format!("memory {from}")))?;
        let to_memory = retry_once("get_memory", || self.backend.get_memory(to))?
            .ok_or_else(|| Error::NotFound(format!("memory {to}")))?;
        Ok(suggest_for_types(
            from_memory.memory_type,
            to_memory.memory_type,
        ))
    }

    // ========================================================================
    // Restore path (migration import)
    // ========================================================================

    /// Re-inserts a memory verbatim (IDs and timestamps preserved). Bounds
    /// are re-checked so a tampered snapshot cannot smuggle invalid rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] on bound violations and backend errors.
    pub fn restore_memory(&self, memory: &Memory) -> Result<Memory> {
        let probe = MemoryInput {
            memory_type: memory.memory_type,
            title: memory.title.clone(),
            content: memory.content.clone(),
            summary: memory.summary.clone(),
            tags: memory.tags.clone(),
            importance: Some(memory.importance),
            confidence: Some(memory.confidence),
            effectiveness: Some(memory.effectiveness),
            context: Some(memory.context.clone()),
        };
        validate_memory_input(&probe)?;
        retry_once("store_memory", || self.backend.store_memory(memory))
    }

    /// Re-inserts a relationship verbatim, re-checking the graph
    /// invariants: endpoints exist, no self-loop, and a current
    /// ordering-imposing edge must not close a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::Relationship`],
    /// [`Error::CycleDetected`], or backend errors.
    pub fn restore_relationship(&self, relationship: &Relationship) -> Result<()> {
        if relationship.from_memory_id == relationship.to_memory_id {
            return Err(Error::Relationship(format!(
                "self-loop rejected: from and to are both '{}'",
                relationship.from_memory_id
            )));
        }
        for endpoint in [&relationship.from_memory_id, &relationship.to_memory_id] {
            if retry_once("get_memory", || self.backend.get_memory(endpoint))?.is_none() {
                return Err(Error::NotFound(format!("memory {endpoint}")));
            }
        }
        if !self.allow_cycles
            && relationship.is_current()
            && relationship.relationship_type.imposes_ordering()
            && let Some(path) = cycle::find_cycle_path(
                &self.backend,
                &relationship.from_memory_id,
                &relationship.to_memory_id,
            )?
        {
            return Err(Error::CycleDetected { path });
        }
        retry_once("create_relationship", || {
            self.backend.create_relationship(relationship)
        })
    }
}

/// Whether a relationship's structured context mentions the needle.
fn context_mentions(relationship: &Relationship, needle: &str) -> bool {
    let Some(context) = &relationship.properties.context_json else {
        return false;
    };
    let field_contains = |key: &str| -> bool {
        match context.get(key) {
            Some(serde_json::Value::String(s)) => s.to_lowercase().contains(needle),
            Some(serde_json::Value::Array(items)) => items.iter().any(|v| {
                v.as_str()
                    .is_some_and(|s| s.to_lowercase().contains(needle))
            }),
            _ => false,
        }
    };
    field_contains("text")
        || field_contains("components")
        || field_contains("conditions")
        || field_contains("evidence")
}

/// The heuristic suggestion table, keyed on endpoint memory types.
fn suggest_for_types(from: MemoryType, to: MemoryType) -> SuggestedRelationship {
    let (relationship_type, rationale) = match (from, to) {
        (MemoryType::Solution, MemoryType::Problem) => (
            RelationshipType::Solves,
            "a solution pointing at a problem usually solves it",
        ),
        (MemoryType::Fix, MemoryType::Error) => (
            RelationshipType::Fixes,
            "a fix pointing at an error usually fixes it",
        ),
        (MemoryType::Problem, MemoryType::Error) => (
            RelationshipType::Causes,
            "a problem pointing at an error usually causes it",
        ),
        (MemoryType::Error, MemoryType::Fix) => (
            RelationshipType::LeadsTo,
            "an error pointing at a fix usually led to it",
        ),
        (MemoryType::Task, MemoryType::Task) => (
            RelationshipType::DependsOn,
            "tasks linked to tasks usually express dependencies",
        ),
        (MemoryType::Technology, MemoryType::Project)
        | (MemoryType::Command, MemoryType::Workflow) => (
            RelationshipType::UsedIn,
            "tools and commands are used in projects and workflows",
        ),
        (MemoryType::FileContext, MemoryType::Project) => (
            RelationshipType::PartOf,
            "file context belongs to its project",
        ),
        (MemoryType::CodePattern, MemoryType::CodePattern) => (
            RelationshipType::SimilarTo,
            "patterns linked to patterns usually resemble each other",
        ),
        (a, b) if a == b => (
            RelationshipType::SimilarTo,
            "memories of the same type usually resemble each other",
        ),
        _ => (
            RelationshipType::RelatedTo,
            "no stronger signal; generic association",
        ),
    };
    SuggestedRelationship {
        relationship_type,
        rationale: rationale.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::storage::SqliteBackend;

    fn database() -> MemoryDatabase {
        let config = MemoryGraphConfig::default();
        let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
        MemoryDatabase::new(backend, &config)
    }

    fn store(db: &MemoryDatabase, memory_type: MemoryType, title: &str) -> Memory {
        db.store_memory(MemoryInput {
            memory_type,
            title: title.to_string(),
            content: format!("content {title}"),
            ..Default::default()
        })
        .unwrap()
    }

    fn rel_input(from: &Memory, to: &Memory, rel_type: &str) -> RelationshipInput {
        RelationshipInput {
            from_memory_id: from.id.as_str().to_string(),
            to_memory_id: to.id.as_str().to_string(),
            relationship_type: rel_type.to_string(),
            strength: None,
            confidence: None,
            context: None,
            valid_from: None,
        }
    }

    #[test]
    fn test_store_normalizes_tags() {
        let db = database();
        let memory = db
            .store_memory(MemoryInput {
                memory_type: MemoryType::Solution,
                title: "Fix".to_string(),
                content: "Use backoff".to_string(),
                tags: vec!["Redis".to_string(), "Timeout".to_string()],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(memory.tags, vec!["redis", "timeout"]);
        assert_eq!(memory.version, 1);

        let fetched = db.get_memory(&memory.id, false).unwrap();
        assert_eq!(fetched.memory.tags, vec!["redis", "timeout"]);
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let db = database();
        let a = store(&db, MemoryType::General, "a");
        let b = store(&db, MemoryType::General, "b");
        db.create_relationship(rel_input(&a, &b, "RELATED_TO")).unwrap();

        db.delete_memory(&a.id).unwrap();
        assert!(matches!(
            db.get_memory(&a.id, false),
            Err(Error::NotFound(_))
        ));
        // Cascade removed the relationship from b's view too.
        let b_view = db.get_memory(&b.id, true).unwrap();
        assert!(b_view.relationships.is_empty());
        assert!(matches!(db.delete_memory(&a.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_cycle_rejected_then_allowed() {
        let db = database();
        let a = store(&db, MemoryType::General, "a");
        let b = store(&db, MemoryType::General, "b");
        let c = store(&db, MemoryType::General, "c");
        db.create_relationship(rel_input(&a, &b, "DEPENDS_ON")).unwrap();
        db.create_relationship(rel_input(&b, &c, "DEPENDS_ON")).unwrap();

        let err = db
            .create_relationship(rel_input(&c, &a, "DEPENDS_ON"))
            .unwrap_err();
        let Error::CycleDetected { path } = err else {
            panic!("expected CycleDetected, got {err:?}");
        };
        assert_eq!(path.first(), path.last());

        // Same edge succeeds when cycles are allowed.
        let config = MemoryGraphConfig::default().with_allow_cycles(true);
        let permissive = MemoryDatabase::new(Arc::clone(db.backend()), &config);
        permissive
            .create_relationship(rel_input(&c, &a, "DEPENDS_ON"))
            .unwrap();
    }

    #[test]
    fn test_symmetric_type_skips_cycle_check() {
        let db = database();
        let a = store(&db, MemoryType::General, "a");
        let b = store(&db, MemoryType::General, "b");
        db.create_relationship(rel_input(&a, &b, "SIMILAR_TO")).unwrap();
        db.create_relationship(rel_input(&b, &a, "SIMILAR_TO")).unwrap();
    }

    #[test]
    fn test_relationship_endpoint_missing() {
        let db = database();
        let a = store(&db, MemoryType::General, "a");
        let mut input = rel_input(&a, &a, "SOLVES");
        input.to_memory_id = "ghost".to_string();
        assert!(matches!(
            db.create_relationship(input),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_context_structured_on_create() {
        let db = database();
        let a = store(&db, MemoryType::Solution, "s");
        let b = store(&db, MemoryType::Problem, "p");
        let mut input = rel_input(&a, &b, "SOLVES");
        input.context = Some(
            "partially implements auth module, only works in production, verified by E2E tests"
                .to_string(),
        );
        let relationship = db.create_relationship(input).unwrap();
        let context = relationship.properties.context_json.unwrap();
        assert_eq!(context["scope"], "partial");
        assert_eq!(context["components"][0], "auth module");
        assert_eq!(context["conditions"][0], "production");
        assert_eq!(context["evidence"][0], "E2E tests");
        assert_eq!(context["temporal"], serde_json::Value::Null);
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let db = database();
        let a = store(&db, MemoryType::General, "a");
        let b = store(&db, MemoryType::General, "b");
        let rel = db.create_relationship(rel_input(&a, &b, "SOLVES")).unwrap();

        let first = db.invalidate_relationship(&rel.id, None, None).unwrap();
        assert!(first.valid_until.is_some());
        let second = db.invalidate_relationship(&rel.id, None, None).unwrap();
        assert_eq!(second.valid_until, first.valid_until);
    }

    #[test]
    fn test_reinforce_rejects_invalidated() {
        let db = database();
        let a = store(&db, MemoryType::General, "a");
        let b = store(&db, MemoryType::General, "b");
        let rel = db.create_relationship(rel_input(&a, &b, "SOLVES")).unwrap();

        let boosted = db.reinforce_relationship(&rel.id, Some(0.2)).unwrap();
        assert_eq!(boosted.properties.evidence_count, 2);
        assert!(boosted.properties.strength > rel.properties.strength);

        db.invalidate_relationship(&rel.id, None, None).unwrap();
        assert!(matches!(
            db.reinforce_relationship(&rel.id, None),
            Err(Error::Relationship(_))
        ));
    }

    #[test]
    fn test_search_pagination_counts() {
        let db = database();
        for i in 0..7 {
            store(&db, MemoryType::General, &format!("memory {i}"));
        }
        let query = SearchQuery::new().with_limit(3).with_offset(3);
        let page = db.search_memories(&query).unwrap();
        assert_eq!(page.total_count, 7);
        assert_eq!(page.items.len(), 3);
        assert!(page.has_more);
        assert_eq!(page.next_offset, Some(6));
    }

    #[test]
    fn test_suggest_relationship_type() {
        let db = database();
        let solution = store(&db, MemoryType::Solution, "s");
        let problem = store(&db, MemoryType::Problem, "p");
        let suggestion = db
            .suggest_relationship_type(&solution.id, &problem.id)
            .unwrap();
        assert_eq!(suggestion.relationship_type, RelationshipType::Solves);

        let general = store(&db, MemoryType::General, "g");
        let conversation = store(&db, MemoryType::Conversation, "c");
        let fallback = db
            .suggest_relationship_type(&general.id, &conversation.id)
            .unwrap();
        assert_eq!(fallback.relationship_type, RelationshipType::RelatedTo);
    }

    #[test]
    fn test_multi_tenant_mode_requires_tenant() {
        let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
        let mut config = MemoryGraphConfig::default();
        config.multi_tenant_mode = true;
        let db = MemoryDatabase::new(backend, &config);
        let err = db
            .store_memory(MemoryInput {
                title: "t".to_string(),
                content: "c".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("tenant_id"));
    }
}
