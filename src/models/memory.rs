//! Memory types and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(String);

impl MemoryId {
    /// Creates a memory ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random memory ID.
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

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Semantic category of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A unit of work to be done or already done.
    Task,
    /// A reusable code pattern or idiom.
    CodePattern,
    /// A problem encountered during development.
    Problem,
    /// A solution to a problem.
    Solution,
    /// A project-level artifact.
    Project,
    /// A technology, library, or tool.
    Technology,
    /// An error observed (message, stack, symptom).
    Error,
    /// A fix applied for an error.
    Fix,
    /// A shell or tool command worth remembering.
    Command,
    /// Context about a specific file.
    FileContext,
    /// A multi-step workflow.
    Workflow,
    /// Anything that fits no other category.
    General,
    /// A conversation transcript or excerpt.
    Conversation,
}

impl MemoryType {
    /// Returns all memory type variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Task,
            Self::CodePattern,
            Self::Problem,
            Self::Solution,
            Self::Project,
            Self::Technology,
            Self::Error,
            Self::Fix,
            Self::Command,
            Self::FileContext,
            Self::Workflow,
            Self::General,
            Self::Conversation,
        ]
    }

    /// Returns the memory type as its wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::CodePattern => "code_pattern",
            Self::Problem => "problem",
            Self::Solution => "solution",
            Self::Project => "project",
            Self::Technology => "technology",
            Self::Error => "error",
            Self::Fix => "fix",
            Self::Command => "command",
            Self::FileContext => "file_context",
            Self::Workflow => "workflow",
            Self::General => "general",
            Self::Conversation => "conversation",
        }
    }

    /// Parses a memory type from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "task" => Some(Self::Task),
            "code_pattern" => Some(Self::CodePattern),
            "problem" => Some(Self::Problem),
            "solution" => Some(Self::Solution),
            "project" => Some(Self::Project),
            "technology" => Some(Self::Technology),
            "error" => Some(Self::Error),
            "fix" => Some(Self::Fix),
            "command" => Some(Self::Command),
            "file_context" => Some(Self::FileContext),
            "workflow" => Some(Self::Workflow),
            "general" => Some(Self::General),
            "conversation" => Some(Self::Conversation),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown memory type: {s}"))
    }
}

/// Structured development context attached to a memory.
///
/// All fields are optional; empty collections are omitted from the JSON
/// encoding so the canonical form stays compact and deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    /// Absolute or repo-relative project path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    /// Files this memory concerns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_involved: Vec<String>,
    /// Programming languages involved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Frameworks involved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frameworks: Vec<String>,
    /// Technologies involved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
    /// Git commit hash at capture time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    /// Git branch at capture time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Working directory at capture time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// When the context was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Session identifier of the capturing agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// User identifier of the capturing agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Free-form extra metadata. Key-ordered so canonical JSON is stable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_metadata: BTreeMap<String, serde_json::Value>,
    /// Tenant identifier (accepted but not enforced unless multi-tenant mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Team identifier for future multi-tenant use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// Visibility marker for future multi-tenant use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Creator identifier for future multi-tenant use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl MemoryContext {
    /// Returns true if any context field mentions the given entity,
    /// case-insensitively.
    #[must_use]
    pub fn mentions(&self, entity: &str) -> bool {
        let needle = entity.to_lowercase();
        let contains = |s: &String| s.to_lowercase().contains(&needle);
        self.project_path.as_ref().is_some_and(contains)
            || self.files_involved.iter().any(|s| contains(s))
            || self.languages.iter().any(|s| contains(s))
            || self.frameworks.iter().any(|s| contains(s))
            || self.technologies.iter().any(|s| contains(s))
            || self.git_branch.as_ref().is_some_and(contains)
            || self.working_directory.as_ref().is_some_and(contains)
    }
}

/// A stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier, immutable.
    pub id: MemoryId,
    /// Semantic category.
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Short title, at most 500 characters.
    pub title: String,
    /// Full content, at most 50 000 characters.
    pub content: String,
    /// Optional summary, at most 1 000 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Lowercased, deduplicated, sorted tag set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Importance score in [0.0, 1.0].
    pub importance: f64,
    /// Confidence score in [0.0, 1.0].
    pub confidence: f64,
    /// Effectiveness score in [0.0, 1.0].
    pub effectiveness: f64,
    /// How many times the memory has been used.
    pub usage_count: u64,
    /// Structured development context.
    #[serde(default)]
    pub context: MemoryContext,
    /// Creation timestamp (UTC).
    pub created_at: DateTime<Utc>,
    /// Last update timestamp (UTC).
    pub updated_at: DateTime<Utc>,
    /// Monotonic version, bumped on every update.
    pub version: u64,
}

impl Memory {
    /// Builds a fresh memory from validated input, assigning an ID and
    /// normalizing tags.
    #[must_use]
    pub fn from_input(input: MemoryInput) -> Self {
        let now = super::utc_now();
        Self {
            id: MemoryId::generate(),
            memory_type: input.memory_type,
            title: input.title,
            content: input.content,
            summary: input.summary,
            tags: normalize_tags(&input.tags),
            importance: input.importance.unwrap_or(0.5),
            confidence: input.confidence.unwrap_or(0.5),
            effectiveness: input.effectiveness.unwrap_or(0.5),
            usage_count: 0,
            context: input.context.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Applies a partial update, bumping `version` and refreshing
    /// `updated_at` even when no field actually changes.
    pub fn apply_update(&mut self, update: MemoryUpdate) {
        if let Some(memory_type) = update.memory_type {
            self.memory_type = memory_type;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(summary) = update.summary {
            self.summary = Some(summary);
        }
        if let Some(tags) = update.tags {
            self.tags = normalize_tags(&tags);
        }
        if let Some(importance) = update.importance {
            self.importance = importance;
        }
        if let Some(confidence) = update.confidence {
            self.confidence = confidence;
        }
        if let Some(effectiveness) = update.effectiveness {
            self.effectiveness = effectiveness;
        }
        if let Some(context) = update.context {
            self.context = context;
        }
        self.version += 1;
        self.updated_at = super::utc_now();
    }
}

/// Input for creating a memory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryInput {
    /// Semantic category.
    #[serde(rename = "type", default = "default_memory_type")]
    pub memory_type: MemoryType,
    /// Short title, required.
    pub title: String,
    /// Full content, required.
    pub content: String,
    /// Optional summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Tags, normalized to lowercase on write.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Importance score; defaults to 0.5.
    #[serde(default)]
    pub importance: Option<f64>,
    /// Confidence score; defaults to 0.5.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Effectiveness score; defaults to 0.5.
    #[serde(default)]
    pub effectiveness: Option<f64>,
    /// Structured context.
    #[serde(default)]
    pub context: Option<MemoryContext>,
}

const fn default_memory_type() -> MemoryType {
    MemoryType::General
}

impl Default for MemoryType {
    fn default() -> Self {
        Self::General
    }
}

/// Partial update for a memory. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryUpdate {
    /// New semantic category.
    #[serde(rename = "type", default)]
    pub memory_type: Option<MemoryType>,
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New content.
    #[serde(default)]
    pub content: Option<String>,
    /// New summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// New tag set (replaces the old one).
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// New importance.
    #[serde(default)]
    pub importance: Option<f64>,
    /// New confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// New effectiveness.
    #[serde(default)]
    pub effectiveness: Option<f64>,
    /// New context (replaces the old one).
    #[serde(default)]
    pub context: Option<MemoryContext>,
}

/// Lowercases, trims, deduplicates, and sorts a tag list.
///
/// Insertion order is irrelevant for tag sets, so the sorted form is the
/// canonical one.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_type_round_trip() {
        for mt in MemoryType::all() {
            assert_eq!(MemoryType::parse(mt.as_str()), Some(*mt));
        }
        assert_eq!(MemoryType::all().len(), 13);
    }

    #[test]
    fn test_memory_type_parse_case_insensitive() {
        assert_eq!(MemoryType::parse("SOLUTION"), Some(MemoryType::Solution));
        assert_eq!(
            MemoryType::parse("Code_Pattern"),
            Some(MemoryType::CodePattern)
        );
        assert_eq!(MemoryType::parse("nonsense"), None);
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            "Redis".to_string(),
            "  Timeout ".to_string(),
            "redis".to_string(),
            String::new(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["redis", "timeout"]);
    }

    #[test]
    fn test_from_input_defaults() {
        let memory = Memory::from_input(MemoryInput {
            memory_type: MemoryType::Solution,
            title: "Fix".to_string(),
            content: "Use backoff".to_string(),
            tags: vec!["Redis".to_string(), "Timeout".to_string()],
            ..Default::default()
        });
        assert_eq!(memory.version, 1);
        assert_eq!(memory.usage_count, 0);
        assert_eq!(memory.tags, vec!["redis", "timeout"]);
        assert!((memory.importance - 0.5).abs() < f64::EPSILON);
        assert_eq!(memory.created_at, memory.updated_at);
    }

    #[test]
    fn test_apply_update_bumps_version_on_noop() {
        let mut memory = Memory::from_input(MemoryInput {
            title: "t".to_string(),
            content: "c".to_string(),
            ..Default::default()
        });
        let before = memory.version;
        memory.apply_update(MemoryUpdate::default());
        assert_eq!(memory.version, before + 1);
    }

    #[test]
    fn test_memory_json_round_trip() {
        let memory = Memory::from_input(MemoryInput {
            memory_type: MemoryType::Error,
            title: "NPE in handler".to_string(),
            content: "stack trace ...".to_string(),
            summary: Some("null deref".to_string()),
            tags: vec!["java".to_string()],
            ..Default::default()
        });
        let json = serde_json::to_string(&memory).unwrap();
        let back: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, memory);
        assert!(json.contains("\"type\":\"error\""));
    }

    #[test]
    fn test_context_mentions() {
        let context = MemoryContext {
            technologies: vec!["Redis".to_string()],
            files_involved: vec!["src/cache.rs".to_string()],
            ..Default::default()
        };
        assert!(context.mentions("redis"));
        assert!(context.mentions("cache.rs"));
        assert!(!context.mentions("postgres"));
    }
}
