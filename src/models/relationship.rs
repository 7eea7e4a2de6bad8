//! Relationship types for the memory graph.
//!
//! A relationship is a typed, directional, bi-temporally tracked link
//! between two memories. Validity time says when the fact was true in the
//! world; transaction time (`recorded_at`) says when the system learned it.
//!
//! # Relationship Categories
//!
//! | Category | Examples |
//! |----------|----------|
//! | Causal | `CAUSES`, `TRIGGERS`, `LEADS_TO` |
//! | Solution | `SOLVES`, `FIXES`, `SUPERSEDES` |
//! | Context | `OCCURRED_DURING`, `USED_IN`, `PART_OF` |
//! | Learning | `LEARNED_FROM`, `BUILDS_ON`, `GENERALIZES` |
//! | Similarity | `SIMILAR_TO`, `RELATED_TO`, `OPPOSITE_OF` |
//! | Workflow | `DEPENDS_ON`, `PRECEDES`, `WORKS_WITH` |
//! | Quality | `IMPROVES`, `VALIDATES`, `DEPRECATED_BY` |
//!
//! Symmetric types (both directions mean the same thing) are exempt from
//! cycle checking; every other type imposes ordering on the graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(String);

impl RelationshipId {
    /// Creates a relationship ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random relationship ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RelationshipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RelationshipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Semantic category of a relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipCategory {
    /// Cause-and-effect links.
    Causal,
    /// Problem-solving links.
    Solution,
    /// Situational links.
    Context,
    /// Knowledge-transfer links.
    Learning,
    /// Resemblance links (symmetric).
    Similarity,
    /// Process-ordering links.
    Workflow,
    /// Quality-judgement links.
    Quality,
}

/// Typed relationship between two memories.
///
/// Serialized as `SCREAMING_SNAKE_CASE` wire strings (`SOLVES`, `DEPENDS_ON`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    // Causal
    /// From directly causes to.
    Causes,
    /// From sets off to without being its full cause.
    Triggers,
    /// From stops to from happening.
    Prevents,
    /// From breaks to.
    Breaks,
    /// From leads to to over time.
    LeadsTo,

    // Solution
    /// From solves the problem to.
    Solves,
    /// From fixes the error to.
    Fixes,
    /// From addresses to without fully solving it.
    Addresses,
    /// From reduces the impact of to.
    Mitigates,
    /// From replaces to as the better answer.
    Supersedes,

    // Context
    /// From happened while to was ongoing.
    OccurredDuring,
    /// From applies in the situation to.
    AppliesTo,
    /// From is used inside to.
    UsedIn,
    /// From is a component of to.
    PartOf,
    /// From belongs to the grouping to.
    BelongsTo,

    // Learning
    /// From was learned from to.
    LearnedFrom,
    /// From teaches the lesson to.
    Teaches,
    /// From builds on to.
    BuildsOn,
    /// From generalizes the specific case to.
    Generalizes,
    /// From specializes the general case to.
    Specializes,

    // Similarity (symmetric)
    /// The two memories resemble each other.
    SimilarTo,
    /// The two memories are loosely related.
    RelatedTo,
    /// The two memories are variants of the same idea.
    VariantOf,
    /// The two memories are analogous across domains.
    AnalogyTo,
    /// The two memories run in parallel.
    ParallelTo,
    /// The two memories are opposites.
    OppositeOf,

    // Workflow
    /// From requires to first.
    DependsOn,
    /// From comes before to in a process.
    Precedes,
    /// From blocks progress on to.
    Blocks,
    /// The two memories are used together (symmetric).
    WorksWith,

    // Quality
    /// From improves to.
    Improves,
    /// From degrades to.
    Degrades,
    /// From confirms that to is correct.
    Validates,
    /// From conflicts with to.
    Contradicts,
    /// From is deprecated in favor of to.
    DeprecatedBy,
}

impl RelationshipType {
    /// Returns all relationship type variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Causes,
            Self::Triggers,
            Self::Prevents,
            Self::Breaks,
            Self::LeadsTo,
            Self::Solves,
            Self::Fixes,
            Self::Addresses,
            Self::Mitigates,
            Self::Supersedes,
            Self::OccurredDuring,
            Self::AppliesTo,
            Self::UsedIn,
            Self::PartOf,
            Self::BelongsTo,
            Self::LearnedFrom,
            Self::Teaches,
            Self::BuildsOn,
            Self::Generalizes,
            Self::Specializes,
            Self::SimilarTo,
            Self::RelatedTo,
            Self::VariantOf,
            Self::AnalogyTo,
            Self::ParallelTo,
            Self::OppositeOf,
            Self::DependsOn,
            Self::Precedes,
            Self::Blocks,
            Self::WorksWith,
            Self::Improves,
            Self::Degrades,
            Self::Validates,
            Self::Contradicts,
            Self::DeprecatedBy,
        ]
    }

    /// Returns the wire string for this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Causes => "CAUSES",
            Self::Triggers => "TRIGGERS",
            Self::Prevents => "PREVENTS",
            Self::Breaks => "BREAKS",
            Self::LeadsTo => "LEADS_TO",
            Self::Solves => "SOLVES",
            Self::Fixes => "FIXES",
            Self::Addresses => "ADDRESSES",
            Self::Mitigates => "MITIGATES",
            Self::Supersedes => "SUPERSEDES",
            Self::OccurredDuring => "OCCURRED_DURING",
            Self::AppliesTo => "APPLIES_TO",
            Self::UsedIn => "USED_IN",
            Self::PartOf => "PART_OF",
            Self::BelongsTo => "BELONGS_TO",
            Self::LearnedFrom => "LEARNED_FROM",
            Self::Teaches => "TEACHES",
            Self::BuildsOn => "BUILDS_ON",
            Self::Generalizes => "GENERALIZES",
            Self::Specializes => "SPECIALIZES",
            Self::SimilarTo => "SIMILAR_TO",
            Self::RelatedTo => "RELATED_TO",
            Self::VariantOf => "VARIANT_OF",
            Self::AnalogyTo => "ANALOGY_TO",
            Self::ParallelTo => "PARALLEL_TO",
            Self::OppositeOf => "OPPOSITE_OF",
            Self::DependsOn => "DEPENDS_ON",
            Self::Precedes => "PRECEDES",
            Self::Blocks => "BLOCKS",
            Self::WorksWith => "WORKS_WITH",
            Self::Improves => "IMPROVES",
            Self::Degrades => "DEGRADES",
            Self::Validates => "VALIDATES",
            Self::Contradicts => "CONTRADICTS",
            Self::DeprecatedBy => "DEPRECATED_BY",
        }
    }

    /// Parses a relationship type from a wire string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Self::all().iter().find(|t| t.as_str() == upper).copied()
    }

    /// Returns the semantic category of this type.
    #[must_use]
    pub const fn category(&self) -> RelationshipCategory {
        match self {
            Self::Causes | Self::Triggers | Self::Prevents | Self::Breaks | Self::LeadsTo => {
                RelationshipCategory::Causal
            },
            Self::Solves | Self::Fixes | Self::Addresses | Self::Mitigates | Self::Supersedes => {
                RelationshipCategory::Solution
            },
            Self::OccurredDuring
            | Self::AppliesTo
            | Self::UsedIn
            | Self::PartOf
            | Self::BelongsTo => RelationshipCategory::Context,
            Self::LearnedFrom
            | Self::Teaches
            | Self::BuildsOn
            | Self::Generalizes
            | Self::Specializes => RelationshipCategory::Learning,
            Self::SimilarTo
            | Self::RelatedTo
            | Self::VariantOf
            | Self::AnalogyTo
            | Self::ParallelTo
            | Self::OppositeOf => RelationshipCategory::Similarity,
            Self::DependsOn | Self::Precedes | Self::Blocks | Self::WorksWith => {
                RelationshipCategory::Workflow
            },
            Self::Improves
            | Self::Degrades
            | Self::Validates
            | Self::Contradicts
            | Self::DeprecatedBy => RelationshipCategory::Quality,
        }
    }

    /// Returns `true` for symmetric types, where the direction carries no
    /// meaning and cycle checking is skipped.
    #[must_use]
    pub const fn is_symmetric(&self) -> bool {
        matches!(
            self,
            Self::SimilarTo
                | Self::RelatedTo
                | Self::VariantOf
                | Self::AnalogyTo
                | Self::ParallelTo
                | Self::OppositeOf
                | Self::WorksWith
        )
    }

    /// Returns `true` when this type participates in cycle detection.
    #[must_use]
    pub const fn imposes_ordering(&self) -> bool {
        !self.is_symmetric()
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown relationship type: {s}"))
    }
}

/// Mutable properties attached to a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipProperties {
    /// Strength of the link in [0.0, 1.0].
    pub strength: f64,
    /// Confidence in the link in [0.0, 1.0].
    pub confidence: f64,
    /// How many times the link has been observed.
    pub evidence_count: u32,
    /// When the link was last reinforced.
    pub last_reinforced: DateTime<Utc>,
    /// Structured context produced by the context extractor, stored
    /// verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_json: Option<serde_json::Value>,
}

impl RelationshipProperties {
    /// Creates properties with the given scores and a fresh
    /// `last_reinforced` timestamp.
    #[must_use]
    pub fn new(strength: f64, confidence: f64) -> Self {
        Self {
            strength,
            confidence,
            evidence_count: 1,
            last_reinforced: super::utc_now(),
            context_json: None,
        }
    }
}

impl Default for RelationshipProperties {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

/// A typed, directional, bi-temporally tracked link between two memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier.
    pub id: RelationshipId,
    /// Source memory.
    pub from_memory_id: super::MemoryId,
    /// Target memory.
    pub to_memory_id: super::MemoryId,
    /// Relationship type.
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    /// Mutable properties.
    pub properties: RelationshipProperties,
    /// When the fact became true.
    pub valid_from: DateTime<Utc>,
    /// When the fact stopped being true; `None` means still valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// When the system learned the fact.
    pub recorded_at: DateTime<Utc>,
    /// The relationship that superseded this one, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidated_by: Option<RelationshipId>,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Row update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// Returns `true` when the relationship is current (`valid_until` unset).
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.valid_until.is_none()
    }

    /// Returns `true` when the relationship was valid at `as_of`:
    /// `valid_from <= as_of` and (`valid_until` unset or `> as_of`).
    #[must_use]
    pub fn is_visible_at(&self, as_of: DateTime<Utc>) -> bool {
        self.valid_from <= as_of && self.valid_until.is_none_or(|until| until > as_of)
    }
}

/// Input for creating a relationship.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipInput {
    /// Source memory ID.
    pub from_memory_id: String,
    /// Target memory ID.
    pub to_memory_id: String,
    /// Relationship type wire string.
    pub relationship_type: String,
    /// Strength in [0.0, 1.0]; defaults to 0.5.
    #[serde(default)]
    pub strength: Option<f64>,
    /// Confidence in [0.0, 1.0]; defaults to 0.5.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Free-text context, at most 10 000 characters; structured on write.
    #[serde(default)]
    pub context: Option<String>,
    /// When the fact became true; defaults to now.
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
}
