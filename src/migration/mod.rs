//! Backend-neutral migration and export.
//!
//! Everything here speaks only through the backend capability set, so any
//! source/target pairing works. The canonical artifact is the
//! [`Snapshot`]: every memory and every relationship (invalidated ones
//! included), ordered by `(created_at, id)`. Import re-inserts through the
//! facade so the graph invariants are re-checked, and migration verifies
//! counts plus a SHA-256 over the canonical body before it is considered
//! done; the pre-migration state of the target is kept for rollback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::db::MemoryDatabase;
use crate::models::{Memory, Relationship, utc_now};
use crate::storage::MemoryOperations;
use crate::{Error, Result};

/// Version of the snapshot format.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Entity counts inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCounts {
    /// Number of memories.
    pub memories: usize,
    /// Number of relationships (invalidated ones included).
    pub relationships: usize,
}

/// The canonical export artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version.
    pub schema_version: u32,
    /// When the snapshot was produced.
    pub generated_at: DateTime<Utc>,
    /// Entity counts, also used for verification.
    pub counts: SnapshotCounts,
    /// All memories, ordered by `(created_at, id)`.
    pub memories: Vec<Memory>,
    /// All relationships, ordered by `(created_at, id)`.
    pub relationships: Vec<Relationship>,
}

/// Canonical body used for checksums: everything except `generated_at`,
/// which legitimately differs between two exports of identical data.
#[derive(Serialize)]
struct CanonicalBody<'a> {
    counts: SnapshotCounts,
    memories: &'a [Memory],
    relationships: &'a [Relationship],
}

/// How import treats rows that already exist in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Replace existing rows by ID (backend merge semantics apply).
    MergeById,
    /// Fail if any snapshot ID already exists in the target.
    #[default]
    RefuseIfExists,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ImportStats {
    /// Memories written.
    pub memories: usize,
    /// Relationships written.
    pub relationships: usize,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Source backend name.
    pub source: String,
    /// Target backend name.
    pub target: String,
    /// Whether this was a dry run (no writes).
    pub dry_run: bool,
    /// Counts transferred (or that would transfer).
    pub counts: SnapshotCounts,
    /// Checksum of the source snapshot.
    pub source_checksum: String,
    /// Checksum of the target after import (`None` on dry run).
    pub target_checksum: Option<String>,
    /// Whether verification passed (vacuously true on dry run).
    pub verified: bool,
}

/// Outcome of comparing two backends.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Counts on the source side.
    pub source_counts: SnapshotCounts,
    /// Counts on the target side.
    pub target_counts: SnapshotCounts,
    /// Source snapshot checksum.
    pub source_checksum: String,
    /// Target snapshot checksum.
    pub target_checksum: String,
    /// Whether counts and checksums both match.
    pub matches: bool,
}

/// Exports the full contents of a backend as a snapshot.
///
/// # Errors
///
/// Returns backend errors.
pub fn export_snapshot(backend: &Arc<dyn MemoryOperations>) -> Result<Snapshot> {
    let mut memories = backend.list_memories()?;
    memories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let mut relationships = backend.list_relationships()?;
    relationships.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    Ok(Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        generated_at: utc_now(),
        counts: SnapshotCounts {
            memories: memories.len(),
            relationships: relationships.len(),
        },
        memories,
        relationships,
    })
}

/// SHA-256 over the canonical snapshot body, hex-encoded.
///
/// # Errors
///
/// Returns [`Error::Internal`] if serialization fails.
pub fn snapshot_checksum(snapshot: &Snapshot) -> Result<String> {
    let body = serde_json::to_vec(&CanonicalBody {
        counts: snapshot.counts,
        memories: &snapshot.memories,
        relationships: &snapshot.relationships,
    })
    .map_err(|e| Error::Internal(format!("snapshot serialization failed: {e}")))?;
    let mut hasher = Sha256::new();
    hasher.update(&body);
    Ok(hex::encode(hasher.finalize()))
}

/// Validates snapshot integrity before import: format version and
/// intra-snapshot ID uniqueness.
///
/// # Errors
///
/// Returns [`Error::Validation`] on any violation.
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<()> {
    if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
        return Err(Error::Validation(format!(
            "unsupported snapshot schema_version {} (expected {SNAPSHOT_SCHEMA_VERSION})",
            snapshot.schema_version
        )));
    }
    if snapshot.counts.memories != snapshot.memories.len()
        || snapshot.counts.relationships != snapshot.relationships.len()
    {
        return Err(Error::Validation(
            "snapshot counts do not match its contents".to_string(),
        ));
    }
    let mut memory_ids = HashSet::new();
    for memory in &snapshot.memories {
        if !memory_ids.insert(memory.id.as_str()) {
            return Err(Error::Validation(format!(
                "duplicate memory id in snapshot: {}",
                memory.id
            )));
        }
    }
    let mut relationship_ids = HashSet::new();
    for relationship in &snapshot.relationships {
        if !relationship_ids.insert(relationship.id.as_str()) {
            return Err(Error::Validation(format!(
                "duplicate relationship id in snapshot: {}",
                relationship.id
            )));
        }
    }
    Ok(())
}

/// Imports a snapshot into a target through the facade, re-checking every
/// invariant. IDs and temporal fields are preserved verbatim so a
/// re-export hashes identically.
///
/// Relationships insert in two passes: first without `invalidated_by`
/// (which may point at a later row), then the supersession links are
/// applied.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a bad snapshot, [`Error::Conflict`]
/// when `RefuseIfExists` finds an existing ID, and facade/backend errors.
pub fn import_snapshot(
    target: &MemoryDatabase,
    snapshot: &Snapshot,
    mode: ImportMode,
) -> Result<ImportStats> {
    validate_snapshot(snapshot)?;

    if mode == ImportMode::RefuseIfExists {
        for memory in &snapshot.memories {
            if target.backend().get_memory(&memory.id)?.is_some() {
                return Err(Error::Conflict(format!(
                    "memory {} already exists in target",
                    memory.id
                )));
            }
        }
        for relationship in &snapshot.relationships {
            if target
                .backend()
                .get_relationship(&relationship.id)?
                .is_some()
            {
                return Err(Error::Conflict(format!(
                    "relationship {} already exists in target",
                    relationship.id
                )));
            }
        }
    }

    let mut stats = ImportStats::default();
    for memory in &snapshot.memories {
        target.restore_memory(memory)?;
        stats.memories += 1;
    }
    for relationship in &snapshot.relationships {
        let mut first_pass = relationship.clone();
        first_pass.invalidated_by = None;
        target.restore_relationship(&first_pass)?;
        stats.relationships += 1;
    }
    for relationship in &snapshot.relationships {
        if relationship.invalidated_by.is_some() {
            target.backend().update_relationship(relationship)?;
        }
    }
    Ok(stats)
}

/// Migrates `source` into `target`: export, import, verify.
///
/// The target's pre-migration contents are exported first and restored if
/// the import or verification fails, so a broken run never leaves the
/// target in a half-migrated state. Dry runs only report what would
/// transfer.
///
/// # Errors
///
/// Returns [`Error::VerificationFailed`] when counts or checksums do not
/// match after import, or the underlying import error (rollback has then
/// already run).
pub fn migrate(
    source: &Arc<dyn MemoryOperations>,
    target: &MemoryDatabase,
    mode: ImportMode,
    dry_run: bool,
) -> Result<MigrationReport> {
    let snapshot = export_snapshot(source)?;
    let source_checksum = snapshot_checksum(&snapshot)?;

    if dry_run {
        return Ok(MigrationReport {
            source: source.backend_name().to_string(),
            target: target.backend().backend_name().to_string(),
            dry_run: true,
            counts: snapshot.counts,
            source_checksum,
            target_checksum: None,
            verified: true,
        });
    }

    let rollback = export_snapshot(target.backend())?;

    if let Err(import_err) = import_snapshot(target, &snapshot, mode) {
        roll_back(target, &rollback)?;
        return Err(import_err);
    }

    let after = export_snapshot(target.backend())?;
    let target_checksum = snapshot_checksum(&after)?;
    if after.counts != snapshot.counts || target_checksum != source_checksum {
        roll_back(target, &rollback)?;
        return Err(Error::VerificationFailed(format!(
            "expected {}/{} rows with checksum {}, found {}/{} with {}",
            snapshot.counts.memories,
            snapshot.counts.relationships,
            source_checksum,
            after.counts.memories,
            after.counts.relationships,
            target_checksum,
        )));
    }

    tracing::info!(
        memories = snapshot.counts.memories,
        relationships = snapshot.counts.relationships,
        "migration verified"
    );
    Ok(MigrationReport {
        source: source.backend_name().to_string(),
        target: target.backend().backend_name().to_string(),
        dry_run: false,
        counts: snapshot.counts,
        source_checksum,
        target_checksum: Some(target_checksum),
        verified: true,
    })
}

/// Restores the target to its pre-migration snapshot.
fn roll_back(target: &MemoryDatabase, rollback: &Snapshot) -> Result<()> {
    tracing::warn!("migration failed, rolling target back to pre-migration snapshot");
    // Deleting every memory cascades all relationships away.
    for memory in target.backend().list_memories()? {
        target.backend().delete_memory(&memory.id)?;
    }
    import_snapshot(target, rollback, ImportMode::MergeById)?;
    Ok(())
}

/// Compares two backends by counts and canonical checksum.
///
/// # Errors
///
/// Returns backend errors.
pub fn validate_migration(
    source: &Arc<dyn MemoryOperations>,
    target: &Arc<dyn MemoryOperations>,
) -> Result<ValidationReport> {
    let source_snapshot = export_snapshot(source)?;
    let target_snapshot = export_snapshot(target)?;
    let source_checksum = snapshot_checksum(&source_snapshot)?;
    let target_checksum = snapshot_checksum(&target_snapshot)?;
    let matches =
        source_snapshot.counts == target_snapshot.counts && source_checksum == target_checksum;
    Ok(ValidationReport {
        source_counts: source_snapshot.counts,
        target_counts: target_snapshot.counts,
        source_checksum,
        target_checksum,
        matches,
    })
}

/// Writes a snapshot to disk as pretty JSON.
///
/// # Errors
///
/// Returns [`Error::Internal`] on serialization or I/O failure.
pub fn write_snapshot_file(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| Error::Internal(format!("snapshot serialization failed: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| Error::Internal(format!("cannot write snapshot file: {e}")))
}

/// Reads a snapshot from disk.
///
/// # Errors
///
/// Returns [`Error::Internal`] on I/O failure and [`Error::Validation`]
/// when the file is not a snapshot.
pub fn read_snapshot_file(path: &Path) -> Result<Snapshot> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Internal(format!("cannot read snapshot file: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| Error::Validation(format!("not a valid snapshot file: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::MemoryGraphConfig;
    use crate::models::{MemoryInput, MemoryType, RelationshipInput};
    use crate::storage::SqliteBackend;

    fn database() -> MemoryDatabase {
        let config = MemoryGraphConfig::default();
        let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
        MemoryDatabase::new(backend, &config)
    }

    fn populate(db: &MemoryDatabase) {
        let mut ids = Vec::new();
        for i in 0..4 {
            let memory = db
                .store_memory(MemoryInput {
                    memory_type: MemoryType::General,
                    title: format!("memory {i}"),
                    content: format!("content {i}"),
                    ..Default::default()
                })
                .unwrap();
            ids.push(memory.id);
        }
        let rel = db
            .create_relationship(RelationshipInput {
                from_memory_id: ids[0].as_str().to_string(),
                to_memory_id: ids[1].as_str().to_string(),
                relationship_type: "SOLVES".to_string(),
                strength: Some(0.8),
                confidence: None,
                context: Some("fully resolves the issue".to_string()),
                valid_from: None,
            })
            .unwrap();
        let successor = db
            .create_relationship(RelationshipInput {
                from_memory_id: ids[2].as_str().to_string(),
                to_memory_id: ids[1].as_str().to_string(),
                relationship_type: "SOLVES".to_string(),
                strength: None,
                confidence: None,
                context: None,
                valid_from: None,
            })
            .unwrap();
        // One invalidated relationship with a supersession link.
        db.invalidate_relationship(&rel.id, Some(successor.id), None).unwrap();
    }

    #[test]
    fn test_export_counts_and_order() {
        let db = database();
        populate(&db);
        let snapshot = export_snapshot(db.backend()).unwrap();
        assert_eq!(snapshot.counts.memories, 4);
        assert_eq!(snapshot.counts.relationships, 2);
        assert!(
            snapshot
                .memories
                .windows(2)
                .all(|w| (w[0].created_at, &w[0].id) <= (w[1].created_at, &w[1].id))
        );
    }

    #[test]
    fn test_round_trip_preserves_checksum() {
        let source_db = database();
        populate(&source_db);
        let snapshot = export_snapshot(source_db.backend()).unwrap();
        let source_checksum = snapshot_checksum(&snapshot).unwrap();

        let target_db = database();
        let stats = import_snapshot(&target_db, &snapshot, ImportMode::RefuseIfExists).unwrap();
        assert_eq!(stats.memories, 4);
        assert_eq!(stats.relationships, 2);

        let re_exported = export_snapshot(target_db.backend()).unwrap();
        assert_eq!(snapshot_checksum(&re_exported).unwrap(), source_checksum);
        // Supersession link survived the two-pass insert.
        assert!(
            re_exported
                .relationships
                .iter()
                .any(|r| r.invalidated_by.is_some())
        );
    }

    #[test]
    fn test_migrate_and_validate() {
        let source_db = database();
        populate(&source_db);
        let target_db = database();

        let dry = migrate(source_db.backend(), &target_db, ImportMode::default(), true).unwrap();
        assert!(dry.dry_run);
        assert_eq!(target_db.backend().count_memories().unwrap(), 0);

        let report =
            migrate(source_db.backend(), &target_db, ImportMode::default(), false).unwrap();
        assert!(report.verified);
        assert_eq!(report.target_checksum.as_ref(), Some(&report.source_checksum));

        let validation = validate_migration(source_db.backend(), target_db.backend()).unwrap();
        assert!(validation.matches);
    }

    #[test]
    fn test_refuse_if_exists() {
        let source_db = database();
        populate(&source_db);
        let snapshot = export_snapshot(source_db.backend()).unwrap();

        let target_db = database();
        import_snapshot(&target_db, &snapshot, ImportMode::RefuseIfExists).unwrap();
        let err = import_snapshot(&target_db, &snapshot, ImportMode::RefuseIfExists).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        // Merge mode accepts the re-import.
        import_snapshot(&target_db, &snapshot, ImportMode::MergeById).unwrap();
    }

    #[test]
    fn test_import_rejects_bad_snapshot() {
        let db = database();
        populate(&db);
        let mut snapshot = export_snapshot(db.backend()).unwrap();
        snapshot.schema_version = 99;
        let target = database();
        assert!(matches!(
            import_snapshot(&target, &snapshot, ImportMode::default()),
            Err(Error::Validation(_))
        ));

        let mut duplicated = export_snapshot(db.backend()).unwrap();
        let first = duplicated.memories[0].clone();
        duplicated.memories.push(first);
        duplicated.counts.memories += 1;
        assert!(matches!(
            import_snapshot(&target, &duplicated, ImportMode::default()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_failed_import_rolls_back() {
        let source_db = database();
        populate(&source_db);

        // A target that already has one of the snapshot's rows plus its own
        // data; RefuseIfExists import must fail and leave the target as-is.
        let target_db = database();
        let own = target_db
            .store_memory(MemoryInput {
                title: "own data".to_string(),
                content: "kept".to_string(),
                ..Default::default()
            })
            .unwrap();
        let snapshot = export_snapshot(source_db.backend()).unwrap();
        import_snapshot(&target_db, &snapshot, ImportMode::MergeById).unwrap();

        let before = export_snapshot(target_db.backend()).unwrap();
        let err = migrate(
            source_db.backend(),
            &target_db,
            ImportMode::RefuseIfExists,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let after = export_snapshot(target_db.backend()).unwrap();
        assert_eq!(
            snapshot_checksum(&after).unwrap(),
            snapshot_checksum(&before).unwrap()
        );
        assert!(target_db.get_memory(&own.id, false).is_ok());
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let db = database();
        populate(&db);
        let snapshot = export_snapshot(db.backend()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        write_snapshot_file(&snapshot, &path).unwrap();
        let loaded = read_snapshot_file(&path).unwrap();
        assert_eq!(
            snapshot_checksum(&loaded).unwrap(),
            snapshot_checksum(&snapshot).unwrap()
        );
    }
}
