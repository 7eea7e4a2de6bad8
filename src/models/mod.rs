//! Core data model types.
//!
//! Pure value types with constructor-time validation:
//! - [`memory`]: memories and their structured context
//! - [`relationship`]: typed, bi-temporally tracked links between memories
//! - [`search`]: search queries, match modes, pagination
//! - [`validation`]: boundary validators mirroring the model invariants

pub mod memory;
pub mod relationship;
pub mod search;
pub mod validation;

pub use memory::{Memory, MemoryContext, MemoryId, MemoryInput, MemoryType, MemoryUpdate};
pub use relationship::{
    Relationship, RelationshipCategory, RelationshipId, RelationshipInput, RelationshipProperties,
    RelationshipType,
};
pub use search::{MatchMode, PaginatedResult, SearchQuery, Tolerance};
pub use validation::{
    validate_memory_input, validate_memory_update, validate_relationship_input,
    validate_search_input,
};

use chrono::{DateTime, SubsecRound, Utc};

/// Returns the current UTC time truncated to microsecond precision.
///
/// All persisted timestamps go through this helper so that a value survives
/// the RFC-3339 round trip through storage unchanged.
#[must_use]
pub fn utc_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_now_microsecond_precision() {
        let now = utc_now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_utc_now_rfc3339_round_trip() {
        let now = utc_now();
        let text = now.to_rfc3339();
        let parsed: DateTime<Utc> = text.parse().unwrap();
        assert_eq!(parsed, now);
    }
}
