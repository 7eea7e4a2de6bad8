//! Migration tool handlers.

use serde_json::Value;
use std::sync::Arc;

use super::parse_args;
use crate::config::{BackendKind, MemoryGraphConfig};
use crate::db::MemoryDatabase;
use crate::mcp::tool_types::{MigrateArgs, ValidateMigrationArgs};
use crate::mcp::tools::ToolResult;
use crate::migration::{ImportMode, migrate, validate_migration};
use crate::storage::{MemoryOperations, create_backend};
use crate::{Error, Result};

fn resolve_backend(
    name: &str,
    db: &MemoryDatabase,
    config: &MemoryGraphConfig,
) -> Result<Arc<dyn MemoryOperations>> {
    let kind = BackendKind::parse(name)
        .ok_or_else(|| Error::Validation(format!("unknown backend: {name}")))?;
    if kind == config.backend {
        // The active backend is shared rather than reopened.
        return Ok(Arc::clone(db.backend()));
    }
    create_backend(kind, config)
}

/// Executes the `migrate_database` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the migration fails.
pub fn execute_migrate_database(
    db: &MemoryDatabase,
    config: &MemoryGraphConfig,
    arguments: Value,
) -> Result<ToolResult> {
    let args: MigrateArgs = parse_args(arguments)?;
    if args.source_backend == args.target_backend {
        return Err(Error::Validation(
            "source and target backends must differ".to_string(),
        ));
    }
    let mode = match args.mode.as_deref() {
        None | Some("refuse") => ImportMode::RefuseIfExists,
        Some("merge") => ImportMode::MergeById,
        Some(other) => {
            return Err(Error::Validation(format!(
                "unknown mode: {other} (expected merge or refuse)"
            )));
        },
    };
    let source = resolve_backend(&args.source_backend, db, config)?;
    let target_backend = resolve_backend(&args.target_backend, db, config)?;
    let target = MemoryDatabase::new(target_backend, config);

    let report = migrate(&source, &target, mode, args.dry_run.unwrap_or(false))?;

    let heading = if report.dry_run {
        "**Migration Dry Run**"
    } else {
        "**Migration Complete**"
    };
    let text = format!(
        "{heading}\n\n\
         - **Source**: {} -> **Target**: {}\n\
         - **Memories**: {} | **Relationships**: {}\n\
         - **Checksum**: `{}`\n\
         - **Verified**: {}\n",
        report.source,
        report.target,
        report.counts.memories,
        report.counts.relationships,
        report.source_checksum,
        report.verified,
    );
    Ok(ToolResult::text(text))
}

/// Executes the `validate_migration` tool.
///
/// # Errors
///
/// Returns an error if argument parsing or the comparison fails.
pub fn execute_validate_migration(
    db: &MemoryDatabase,
    config: &MemoryGraphConfig,
    arguments: Value,
) -> Result<ToolResult> {
    let args: ValidateMigrationArgs = parse_args(arguments)?;
    let source = resolve_backend(&args.source_backend, db, config)?;
    let target = resolve_backend(&args.target_backend, db, config)?;
    let report = validate_migration(&source, &target)?;

    let verdict = if report.matches {
        "counts equal and checksum equal"
    } else {
        "MISMATCH"
    };
    let text = format!(
        "**Migration Validation**: {verdict}\n\n\
         - Source: {}/{} rows, checksum `{}`\n\
         - Target: {}/{} rows, checksum `{}`\n",
        report.source_counts.memories,
        report.source_counts.relationships,
        report.source_checksum,
        report.target_counts.memories,
        report.target_counts.relationships,
        report.target_checksum,
    );
    Ok(ToolResult::text(text))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::storage::SqliteBackend;

    fn db() -> (MemoryDatabase, MemoryGraphConfig) {
        let config = MemoryGraphConfig::default();
        let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
        (MemoryDatabase::new(backend, &config), config)
    }

    #[test]
    fn test_same_source_and_target_rejected() {
        let (db, config) = db();
        let err = execute_migrate_database(
            &db,
            &config,
            serde_json::json!({"source_backend": "sqlite", "target_backend": "sqlite"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let (db, config) = db();
        let err = execute_validate_migration(
            &db,
            &config,
            serde_json::json!({"source_backend": "sqlite", "target_backend": "mongo"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown backend"));
    }
}
