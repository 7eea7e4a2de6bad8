//! CLI command handlers.

// CLI output goes to stdout by design.
#![allow(clippy::print_stdout)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendKind, MemoryGraphConfig};
use crate::db::MemoryDatabase;
use crate::mcp::{McpServer, StdioTransport, ToolRegistry};
use crate::migration::{
    ImportMode, export_snapshot, import_snapshot, migrate, read_snapshot_file,
    snapshot_checksum, write_snapshot_file,
};
use crate::observability::check_health;
use crate::storage::{MemoryOperations, create_backend};
use crate::{Error, Result};

/// Runs the MCP server over stdio until stdin closes.
///
/// # Errors
///
/// Returns an error if the transport fails mid-run (treated as
/// unrecoverable by the caller).
pub async fn cmd_serve(config: MemoryGraphConfig) -> Result<()> {
    let db = Arc::new(MemoryDatabase::open(&config)?);
    let registry = Arc::new(ToolRegistry::new(db, config));
    let server = McpServer::new(registry);

    // Clean shutdown on Ctrl-C; in-flight writes are transactional.
    ctrlc::set_handler(|| {
        tracing::info!("shutting down");
        std::process::exit(0);
    })
    .map_err(|e| Error::Internal(format!("cannot install signal handler: {e}")))?;

    tracing::info!("memorygraph MCP server listening on stdio");
    StdioTransport::new()
        .run(server)
        .await
        .map_err(|e| Error::BackendUnavailable {
            operation: "serve".to_string(),
            cause: e.to_string(),
        })
}

/// Exports the active backend to a snapshot file.
///
/// # Errors
///
/// Returns backend or I/O errors.
pub fn cmd_export(config: &MemoryGraphConfig, output: &Path) -> Result<()> {
    let backend = create_backend(config.backend, config)?;
    let snapshot = export_snapshot(&backend)?;
    write_snapshot_file(&snapshot, output)?;
    println!(
        "Exported {} memories and {} relationships to {} (checksum {})",
        snapshot.counts.memories,
        snapshot.counts.relationships,
        output.display(),
        snapshot_checksum(&snapshot)?,
    );
    Ok(())
}

/// Imports a snapshot file into the active backend.
///
/// # Errors
///
/// Returns validation, conflict, or backend errors.
pub fn cmd_import(config: &MemoryGraphConfig, input: &Path, merge: bool) -> Result<()> {
    let snapshot = read_snapshot_file(input)?;
    let db = MemoryDatabase::open(config)?;
    let mode = if merge {
        ImportMode::MergeById
    } else {
        ImportMode::RefuseIfExists
    };
    let stats = import_snapshot(&db, &snapshot, mode)?;
    println!(
        "Imported {} memories and {} relationships from {}",
        stats.memories,
        stats.relationships,
        input.display(),
    );
    Ok(())
}

/// Migrates all data between two backends.
///
/// # Errors
///
/// Returns verification or backend errors.
pub fn cmd_migrate(
    config: &MemoryGraphConfig,
    source: &str,
    target: &str,
    dry_run: bool,
    merge: bool,
) -> Result<()> {
    let source_kind = BackendKind::parse(source)
        .ok_or_else(|| Error::Validation(format!("unknown backend: {source}")))?;
    let target_kind = BackendKind::parse(target)
        .ok_or_else(|| Error::Validation(format!("unknown backend: {target}")))?;
    if source_kind == target_kind {
        return Err(Error::Validation(
            "source and target backends must differ".to_string(),
        ));
    }

    let source_backend = create_backend(source_kind, config)?;
    let target_backend = create_backend(target_kind, config)?;
    let target_db = MemoryDatabase::new(target_backend, config);
    let mode = if merge {
        ImportMode::MergeById
    } else {
        ImportMode::RefuseIfExists
    };

    let report = migrate(&source_backend, &target_db, mode, dry_run)?;
    if report.dry_run {
        println!(
            "Dry run: would migrate {} memories and {} relationships from {} to {}",
            report.counts.memories, report.counts.relationships, report.source, report.target,
        );
    } else {
        println!(
            "Migrated {} memories and {} relationships from {} to {} (verified, checksum {})",
            report.counts.memories,
            report.counts.relationships,
            report.source,
            report.target,
            report.source_checksum,
        );
    }
    Ok(())
}

/// Probes the active backend.
///
/// # Errors
///
/// Returns an error if the backend cannot even be constructed; an
/// unhealthy probe is reported on stdout, not as an error.
pub fn cmd_health(config: &MemoryGraphConfig) -> Result<bool> {
    let backend = create_backend(config.backend, config)?;
    let status = check_health(&backend, Duration::from_secs(config.health_timeout_secs));
    if status.healthy {
        println!(
            "healthy: backend={} memories={} latency={}ms",
            status.backend,
            status.memory_count.unwrap_or(0),
            status.latency_ms,
        );
    } else {
        println!(
            "unhealthy: backend={} error={} latency={}ms",
            status.backend,
            status.error.as_deref().unwrap_or("unknown"),
            status.latency_ms,
        );
    }
    Ok(status.healthy)
}

/// Prints backend statistics.
///
/// # Errors
///
/// Returns backend errors.
pub fn cmd_status(config: &MemoryGraphConfig) -> Result<()> {
    let backend = create_backend(config.backend, config)?;
    let memories = backend.count_memories()?;
    let relationships = backend.count_relationships()?;
    println!("backend: {}", backend.backend_name());
    println!("memories: {memories}");
    println!("relationships: {relationships}");
    if config.backend == BackendKind::Sqlite {
        println!("database: {}", config.sqlite_path.display());
    }
    Ok(())
}
