//! # MemoryGraph
//!
//! Persistent, graph-structured memory for AI coding agents, exposed over
//! the Model Context Protocol (MCP).
//!
//! MemoryGraph stores solutions, problems, errors, decisions, and other
//! development artifacts, with typed relationships between them, and
//! retrieves them across sessions. Relationships are tracked bi-temporally
//! (validity time and transaction time), so the graph can answer both
//! "what is related now?" and "what did we believe on June 1st?".
//!
//! ## Features
//!
//! - Single-binary MCP server over stdio
//! - Embedded SQLite backend (nodes/edges tables, JSON-encoded properties)
//! - Cycle-safe typed relationships with point-in-time traversal
//! - Backend-neutral export/import/migration with checksum verification
//! - Graph analytics: path search, cluster analysis, bridge detection
//!
//! ## Example
//!
//! ```rust,ignore
//! use memorygraph::db::MemoryDatabase;
//! use memorygraph::models::{MemoryInput, MemoryType};
//!
//! let db = MemoryDatabase::open(&config)?;
//! let memory = db.store_memory(MemoryInput {
//!     memory_type: MemoryType::Solution,
//!     title: "Fix Redis timeouts".to_string(),
//!     content: "Use exponential backoff".to_string(),
//!     ..Default::default()
//! })?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod analytics;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod mcp;
pub mod migration;
pub mod models;
pub mod observability;
pub mod storage;

// Re-exports for convenience
pub use config::MemoryGraphConfig;
pub use context::extract_relationship_context;
pub use db::MemoryDatabase;
pub use models::{
    Memory, MemoryContext, MemoryId, MemoryInput, MemoryType, MemoryUpdate, PaginatedResult,
    Relationship, RelationshipId, RelationshipType, SearchQuery,
};
pub use storage::MemoryOperations;

/// Error type for memorygraph operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `MissingField` | A required tool argument is absent |
/// | `Validation` | Input violates a length/range/enum bound |
/// | `NotFound` | Referenced memory or relationship does not exist |
/// | `CycleDetected` | A new relationship would close an ordering cycle |
/// | `Relationship` | Other semantic invariant breach (self-loop, invalidated reinforce) |
/// | `BackendUnavailable` | Storage cannot be reached; retried once, then surfaced |
/// | `BackendTimeout` | Storage did not answer within the deadline |
/// | `Conflict` | Optimistic-concurrency version mismatch on update |
/// | `VerificationFailed` | Migration count or checksum mismatch |
/// | `Internal` | Anything else; full diagnostics go to the structured log only |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A required field was missing from the input.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Input violated a static constraint.
    ///
    /// Raised when:
    /// - Title/content/summary/tag/query length bounds are exceeded
    /// - A score is outside [0.0, 1.0]
    /// - An unknown memory or relationship type string is supplied
    /// - Pagination bounds are violated (limit outside [1, 1000], negative offset)
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced memory or relationship was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Creating the relationship would close a cycle over ordering-imposing
    /// relationship types. Carries the discovered cycle path.
    #[error("relationship would create a cycle: {}", path.join(" -> "))]
    CycleDetected {
        /// Memory IDs along the cycle, first and last entries equal.
        path: Vec<String>,
    },

    /// A relationship invariant was breached.
    ///
    /// Raised when:
    /// - A self-loop is attempted (`from == to`)
    /// - An invalidated relationship is reinforced
    #[error("relationship error: {0}")]
    Relationship(String),

    /// The storage backend could not be reached.
    ///
    /// Raised when:
    /// - The SQLite file cannot be opened or the database is locked beyond
    ///   the busy timeout
    /// - The cloud adapter cannot establish a connection
    #[error("backend unavailable during '{operation}': {cause}")]
    BackendUnavailable {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The storage backend did not answer within the deadline.
    #[error("backend timed out during '{operation}'")]
    BackendTimeout {
        /// The operation that timed out.
        operation: String,
    },

    /// Optimistic-concurrency conflict on update.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Migration verification failed (count or checksum mismatch).
    #[error("migration verification failed: {0}")]
    VerificationFailed(String),

    /// An unexpected internal error.
    ///
    /// The user-visible message stays short; the structured log carries the
    /// full diagnostic.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` for transient backend failures that the facade may
    /// retry once before surfacing.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. } | Self::BackendTimeout { .. }
        )
    }
}

/// Result type alias for memorygraph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("title exceeds 500 characters".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: title exceeds 500 characters"
        );

        let err = Error::NotFound("memory abc".to_string());
        assert_eq!(err.to_string(), "not found: memory abc");

        let err = Error::CycleDetected {
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "relationship would create a cycle: a -> b -> a"
        );

        let err = Error::BackendUnavailable {
            operation: "store_memory".to_string(),
            cause: "database is locked".to_string(),
        };
        assert!(err.to_string().contains("store_memory"));
        assert!(err.to_string().contains("database is locked"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            Error::BackendTimeout {
                operation: "search".to_string()
            }
            .is_transient()
        );
        assert!(
            Error::BackendUnavailable {
                operation: "get".to_string(),
                cause: "locked".to_string()
            }
            .is_transient()
        );
        assert!(!Error::Validation("x".to_string()).is_transient());
        assert!(!Error::NotFound("x".to_string()).is_transient());
    }
}
