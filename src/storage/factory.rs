//! Backend construction from configuration.

use std::sync::Arc;

use crate::config::{BackendKind, MemoryGraphConfig};
use crate::storage::traits::MemoryOperations;
use crate::storage::{CloudBackend, SqliteBackend};
use crate::{Error, Result};

/// Builds the backend named by `kind` using the given configuration.
///
/// The embedded SQLite backend is the default and the only one guaranteed
/// to exist in every deployment. The Cypher-capable family (Neo4j,
/// Memgraph, FalkorDB) requires a running graph server and is not bundled
/// in this build; selecting one is rejected with a clear message rather
/// than silently falling back.
///
/// # Errors
///
/// Returns an error if the backend cannot be constructed.
pub fn create_backend(
    kind: BackendKind,
    config: &MemoryGraphConfig,
) -> Result<Arc<dyn MemoryOperations>> {
    match kind {
        BackendKind::Sqlite => Ok(Arc::new(SqliteBackend::open(&config.sqlite_path)?)),
        BackendKind::Cloud => Ok(Arc::new(CloudBackend::from_config(&config.cloud)?)),
        BackendKind::Neo4j | BackendKind::Memgraph | BackendKind::Falkor => {
            Err(Error::Validation(format!(
                "backend '{kind}' is not bundled in this build; use 'sqlite' or 'cloud'"
            )))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbundled_backend_rejected() {
        let config = MemoryGraphConfig::default();
        let err = create_backend(BackendKind::Neo4j, &config).unwrap_err();
        assert!(err.to_string().contains("neo4j"));
    }

    #[test]
    fn test_sqlite_backend_built() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            MemoryGraphConfig::default().with_sqlite_path(dir.path().join("factory.db"));
        let backend = create_backend(BackendKind::Sqlite, &config).unwrap();
        assert_eq!(backend.backend_name(), "sqlite");
        assert!(!backend.is_cypher_capable());
    }
}
