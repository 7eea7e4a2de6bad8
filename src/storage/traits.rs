//! Backend capability traits.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Cypher-capable |
//! |---------|----------|----------------|
//! | [`super::SqliteBackend`] | Default; embedded, always available | no |
//! | [`super::CloudBackend`] | REST sink for the same operation set | no |
//!
//! # Error Modes and Guarantees
//!
//! All methods return [`crate::Result`]. Missing lookups return `Ok(None)`
//! or an empty list rather than an error. Transient failures surface as
//! `BackendUnavailable`/`BackendTimeout` and may be retried once by the
//! facade; everything else passes through untouched.
//!
//! # Temporal Filtering
//!
//! Relationship reads take an `as_of` parameter:
//! - `None` is the current-only fast path: rows with `valid_until IS NULL`.
//! - `Some(ts)` applies the visibility rule
//!   `valid_from <= ts AND (valid_until IS NULL OR valid_until > ts)`.
//!
//! # Implementor Notes
//!
//! - Methods use `&self` to enable sharing via `Arc<dyn MemoryOperations>`
//! - Use interior mutability (e.g., `Mutex<Connection>`) for mutable state
//! - Writes must be transactional; a failed call leaves no partial state

use chrono::{DateTime, Utc};

use crate::Result;
use crate::models::{
    Memory, MemoryId, Relationship, RelationshipId, RelationshipType, SearchQuery,
};

/// The capability set every backend implements.
///
/// Backends are dumb: they persist and retrieve. The facade
/// ([`crate::db::MemoryDatabase`]) owns validation, cycle detection,
/// traversal, and temporal semantics, and composes them from these
/// primitives.
pub trait MemoryOperations: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Whether this backend can execute Cypher text queries internally.
    ///
    /// The facade gates its query-building paths on this; the hook itself
    /// lives on [`CypherExecutor`] and is never exposed to MCP clients.
    fn is_cypher_capable(&self) -> bool {
        false
    }

    // ========================================================================
    // Memory operations
    // ========================================================================

    /// Upserts a memory by ID.
    ///
    /// Merge semantics: if the ID exists, the row is replaced in full,
    /// preserving `created_at`, refreshing `updated_at`, and incrementing
    /// `version`. A fresh insert stores the memory exactly as given.
    /// Returns the stored form.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn store_memory(&self, memory: &Memory) -> Result<Memory>;

    /// Retrieves a memory by ID. `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup operation fails.
    fn get_memory(&self, id: &MemoryId) -> Result<Option<Memory>>;

    /// Replaces an existing memory verbatim (no version bump; the caller
    /// already applied one).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the memory does not exist.
    fn update_memory(&self, memory: &Memory) -> Result<Memory>;

    /// Deletes a memory; relationships touching it cascade away.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion operation fails.
    fn delete_memory(&self, id: &MemoryId) -> Result<bool>;

    /// Returns candidate memories for a search query, ordered by
    /// `importance DESC, updated_at DESC, id ASC`.
    ///
    /// Backends may push structural filters (type, importance, dates,
    /// project path) down to storage, but the result only needs to be a
    /// superset of the exact matches: the facade re-evaluates the full
    /// predicate, including text tolerance, on every candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn search_memories(&self, query: &SearchQuery) -> Result<Vec<Memory>>;

    /// Counts stored memories. Doubles as the health probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count_memories(&self) -> Result<u64>;

    /// Lists every memory ordered by `(created_at, id)`, for export.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing operation fails.
    fn list_memories(&self) -> Result<Vec<Memory>>;

    // ========================================================================
    // Relationship operations
    // ========================================================================

    /// Inserts a relationship with the supplied temporal fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (including foreign-key
    /// violations for missing endpoints).
    fn create_relationship(&self, relationship: &Relationship) -> Result<()>;

    /// Retrieves a relationship by ID. `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup operation fails.
    fn get_relationship(&self, id: &RelationshipId) -> Result<Option<Relationship>>;

    /// Replaces an existing relationship row (reinforcement, invalidation).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the relationship does not exist.
    fn update_relationship(&self, relationship: &Relationship) -> Result<()>;

    /// Out-edges of a memory under the temporal rule described in the
    /// module docs.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn relationships_from(
        &self,
        id: &MemoryId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<Relationship>>;

    /// In-edges of a memory under the temporal rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn relationships_to(
        &self,
        id: &MemoryId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<Relationship>>;

    /// Every relationship touching a memory regardless of validity,
    /// ordered by `valid_from ASC`. Feeds the history view.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn relationships_touching(&self, id: &MemoryId) -> Result<Vec<Relationship>>;

    /// Relationships recorded at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn relationships_recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<Relationship>>;

    /// Relationships invalidated at or after `since`
    /// (`valid_until IS NOT NULL AND valid_until >= since`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn relationships_invalidated_since(&self, since: DateTime<Utc>) -> Result<Vec<Relationship>>;

    /// Lists every relationship ordered by `(created_at, id)`, for export.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing operation fails.
    fn list_relationships(&self) -> Result<Vec<Relationship>>;

    /// Counts stored relationships.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count_relationships(&self) -> Result<u64>;

    /// One-hop neighbors: `(neighbor_memory, connecting_relationship)`
    /// pairs for the out-edges of `id`, optionally filtered by type, under
    /// the temporal rule described in the module docs (`None` = current
    /// only). The facade's BFS composes multi-hop traversal from this.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn get_related_memories(
        &self,
        id: &MemoryId,
        types: Option<&[RelationshipType]>,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<(Memory, Relationship)>>;
}

/// Extension for graph backends that execute Cypher internally.
///
/// This hook is used by the facade's query-building paths and is never
/// exposed to MCP clients. No Cypher-capable backend ships in this build;
/// the trait marks the seam for the Neo4j/Memgraph/Falkor family.
pub trait CypherExecutor: MemoryOperations {
    /// Executes a Cypher text query and returns rows as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or is not supported.
    fn execute_query(&self, query: &str) -> Result<serde_json::Value>;
}
