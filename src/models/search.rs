//! Search query and pagination types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::MemoryType;

/// How multiple specified filters combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every specified filter must match.
    #[default]
    All,
    /// At least one specified filter must match.
    Any,
}

impl MatchMode {
    /// Parses a match mode from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    /// Returns the wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How strictly the query text is matched against a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    /// Whole-phrase containment.
    Strict,
    /// Whitespace tokens; any contained token matches.
    #[default]
    Normal,
    /// Token containment with at most one edit per token.
    Fuzzy,
}

impl Tolerance {
    /// Parses a tolerance from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "normal" => Some(Self::Normal),
            "fuzzy" => Some(Self::Fuzzy),
            _ => None,
        }
    }

    /// Returns the wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Normal => "normal",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default page size for searches.
pub const DEFAULT_LIMIT: usize = 50;
/// Largest allowed page size.
pub const MAX_LIMIT: usize = 1000;

/// A memory search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text, matched against title, content, and summary. The empty
    /// string matches everything.
    #[serde(default)]
    pub query: String,
    /// Restrict to these memory types.
    #[serde(default)]
    pub memory_types: Vec<MemoryType>,
    /// Restrict to memories carrying all/any of these tags (lowercased
    /// before comparison).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Minimum importance, inclusive.
    #[serde(default)]
    pub min_importance: Option<f64>,
    /// Maximum importance, inclusive.
    #[serde(default)]
    pub max_importance: Option<f64>,
    /// Minimum confidence, inclusive.
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Restrict to memories whose context project path contains this value.
    #[serde(default)]
    pub project_path: Option<String>,
    /// Restrict to memories updated at or after this instant.
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    /// Restrict to memories updated at or before this instant.
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    /// Filter combination mode.
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Text match strictness.
    #[serde(default)]
    pub tolerance: Tolerance,
    /// Page size, in [1, 1000].
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Page offset.
    #[serde(default)]
    pub offset: usize,
}

const fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            memory_types: Vec::new(),
            tags: Vec::new(),
            min_importance: None,
            max_importance: None,
            min_confidence: None,
            project_path: None,
            date_from: None,
            date_to: None,
            match_mode: MatchMode::default(),
            tolerance: Tolerance::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl SearchQuery {
    /// Creates an empty query with default pagination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query text.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Restricts the query to the given memory types.
    #[must_use]
    pub fn with_types(mut self, types: Vec<MemoryType>) -> Self {
        self.memory_types = types;
        self
    }

    /// Restricts the query to the given tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the minimum importance.
    #[must_use]
    pub const fn with_min_importance(mut self, min: f64) -> Self {
        self.min_importance = Some(min);
        self
    }

    /// Sets the match mode.
    #[must_use]
    pub const fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Sets the tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the page offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns `true` when at least one filter (including non-empty query
    /// text) was specified.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.query.is_empty()
            || !self.memory_types.is_empty()
            || !self.tags.is_empty()
            || self.min_importance.is_some()
            || self.max_importance.is_some()
            || self.min_confidence.is_some()
            || self.project_path.is_some()
            || self.date_from.is_some()
            || self.date_to.is_some()
    }
}

/// One page of results plus the information needed to fetch the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// The page of items.
    pub items: Vec<T>,
    /// Total matches across all pages.
    pub total_count: usize,
    /// Page size that was applied.
    pub limit: usize,
    /// Offset that was applied.
    pub offset: usize,
    /// Whether further pages exist.
    pub has_more: bool,
    /// Offset of the next page, when `has_more`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

impl<T> PaginatedResult<T> {
    /// Slices one page out of the full ordered match list.
    #[must_use]
    pub fn paginate(all: Vec<T>, limit: usize, offset: usize) -> Self {
        let total_count = all.len();
        let items: Vec<T> = all.into_iter().skip(offset).take(limit).collect();
        let has_more = offset + items.len() < total_count;
        Self {
            items,
            total_count,
            limit,
            offset,
            has_more,
            next_offset: has_more.then_some(offset + limit),
        }
    }
}
