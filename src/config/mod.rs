//! Configuration management.
//!
//! A [`MemoryGraphConfig`] is built once at startup from the environment and
//! passed into the facade; nothing re-reads the environment afterwards.

use std::fmt;
use std::path::PathBuf;

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Embedded SQLite file (the default; always available).
    #[default]
    Sqlite,
    /// Neo4j graph server (Cypher-capable family).
    Neo4j,
    /// Memgraph graph server (Cypher-capable family).
    Memgraph,
    /// FalkorDB graph server (Cypher-capable family).
    Falkor,
    /// Cloud REST adapter.
    Cloud,
}

impl BackendKind {
    /// Parses a backend kind from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "neo4j" => Some(Self::Neo4j),
            "memgraph" => Some(Self::Memgraph),
            "falkor" => Some(Self::Falkor),
            "cloud" => Some(Self::Cloud),
            _ => None,
        }
    }

    /// Returns the wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Neo4j => "neo4j",
            Self::Memgraph => "memgraph",
            Self::Falkor => "falkor",
            Self::Cloud => "cloud",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cloud REST adapter settings.
#[derive(Debug, Clone, Default)]
pub struct CloudConfig {
    /// Base URL of the cloud API.
    pub api_url: Option<String>,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Main configuration for memorygraph.
#[derive(Debug, Clone)]
pub struct MemoryGraphConfig {
    /// Active storage backend.
    pub backend: BackendKind,
    /// Path to the SQLite database file.
    pub sqlite_path: PathBuf,
    /// When true, relationship cycle checking is skipped entirely.
    pub allow_cycles: bool,
    /// When false, tenant fields are accepted but not enforced.
    pub multi_tenant_mode: bool,
    /// Log level: DEBUG, INFO, WARN, or ERROR.
    pub log_level: String,
    /// Health-check probe deadline in seconds.
    pub health_timeout_secs: u64,
    /// Cloud adapter settings.
    pub cloud: CloudConfig,
}

impl Default for MemoryGraphConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            sqlite_path: default_sqlite_path(),
            allow_cycles: false,
            multi_tenant_mode: false,
            log_level: "INFO".to_string(),
            health_timeout_secs: 5,
            cloud: CloudConfig {
                api_url: None,
                api_key: None,
                timeout_secs: 30,
            },
        }
    }
}

/// Default database location: the platform data directory, falling back to
/// the working directory.
fn default_sqlite_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "memorygraph", "memorygraph").map_or_else(
        || PathBuf::from("memorygraph.db"),
        |dirs| dirs.data_dir().join("memorygraph.db"),
    )
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

impl MemoryGraphConfig {
    /// Builds the configuration from the environment.
    ///
    /// Recognized variables: `MEMORY_BACKEND`, `MEMORY_SQLITE_PATH`,
    /// `MEMORY_ALLOW_CYCLES`, `MEMORY_MULTI_TENANT_MODE`,
    /// `MEMORY_LOG_LEVEL`, `HEALTH_TIMEOUT_SECONDS`,
    /// `MEMORYGRAPH_API_URL`, `MEMORYGRAPH_API_KEY`, `MEMORYGRAPH_TIMEOUT`.
    /// Unset or malformed values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        // `.env` is best-effort; a missing file is not an error.
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(v) = std::env::var("MEMORY_BACKEND")
            && let Some(kind) = BackendKind::parse(&v)
        {
            config.backend = kind;
        }
        if let Ok(v) = std::env::var("MEMORY_SQLITE_PATH")
            && !v.trim().is_empty()
        {
            config.sqlite_path = PathBuf::from(v);
        }
        if let Some(v) = env_bool("MEMORY_ALLOW_CYCLES") {
            config.allow_cycles = v;
        }
        if let Some(v) = env_bool("MEMORY_MULTI_TENANT_MODE") {
            config.multi_tenant_mode = v;
        }
        if let Ok(v) = std::env::var("MEMORY_LOG_LEVEL") {
            let upper = v.trim().to_uppercase();
            if matches!(upper.as_str(), "DEBUG" | "INFO" | "WARN" | "ERROR") {
                config.log_level = upper;
            }
        }
        if let Ok(v) = std::env::var("HEALTH_TIMEOUT_SECONDS")
            && let Ok(parsed) = v.trim().parse::<u64>()
        {
            config.health_timeout_secs = parsed.max(1);
        }
        if let Ok(v) = std::env::var("MEMORYGRAPH_API_URL") {
            config.cloud.api_url = Some(v);
        }
        if let Ok(v) = std::env::var("MEMORYGRAPH_API_KEY") {
            config.cloud.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("MEMORYGRAPH_TIMEOUT")
            && let Ok(parsed) = v.trim().parse::<u64>()
        {
            config.cloud.timeout_secs = parsed.max(1);
        }

        config
    }

    /// Sets the backend kind.
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the SQLite path.
    #[must_use]
    pub fn with_sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_path = path.into();
        self
    }

    /// Sets whether relationship cycles are allowed.
    #[must_use]
    pub const fn with_allow_cycles(mut self, allow: bool) -> Self {
        self.allow_cycles = allow;
        self
    }

    /// Sets the health probe deadline.
    #[must_use]
    pub const fn with_health_timeout_secs(mut self, secs: u64) -> Self {
        self.health_timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MemoryGraphConfig::default();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert!(!config.allow_cycles);
        assert!(!config.multi_tenant_mode);
        assert_eq!(config.log_level, "INFO");
        assert_eq!(config.health_timeout_secs, 5);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("SQLite"), Some(BackendKind::Sqlite));
        assert_eq!(BackendKind::parse("cloud"), Some(BackendKind::Cloud));
        assert_eq!(BackendKind::parse("neo4j"), Some(BackendKind::Neo4j));
        assert_eq!(BackendKind::parse("mysql"), None);
    }

    #[test]
    fn test_builders() {
        let config = MemoryGraphConfig::default()
            .with_backend(BackendKind::Cloud)
            .with_allow_cycles(true)
            .with_sqlite_path("/tmp/x.db")
            .with_health_timeout_secs(9);
        assert_eq!(config.backend, BackendKind::Cloud);
        assert!(config.allow_cycles);
        assert_eq!(config.sqlite_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.health_timeout_secs, 9);
    }
}
