//! Shared connection handling for the SQLite backend.
//!
//! Manages the `Mutex<Connection>` with poison recovery and applies the
//! pragmas the backend relies on (WAL, busy timeout, foreign keys).

use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

use crate::{Error, Result};

/// Acquires the connection mutex, recovering from poison.
///
/// If a previous operation panicked while holding the lock, the connection
/// state is still valid (rusqlite rolls back open transactions on drop), so
/// we recover the inner value and log a warning instead of cascading the
/// failure.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("memorygraph_sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Applies the standard pragmas to a fresh connection.
///
/// - WAL journal mode: concurrent readers with a single writer
/// - NORMAL synchronous: durability/performance balance
/// - `busy_timeout` 5000ms: wait for locks instead of failing immediately
/// - `foreign_keys` ON: endpoint deletes cascade to relationships
pub fn configure_connection(conn: &Connection) {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
    let _ = conn.pragma_update(None, "foreign_keys", "ON");
}

/// Maps a rusqlite error onto the crate taxonomy.
///
/// Lock contention becomes `BackendUnavailable` (the facade retries once);
/// constraint violations become `Relationship` errors since the only
/// constraints in the schema are relationship endpoint foreign keys and
/// primary keys; everything else is `Internal`.
pub fn map_sqlite_error(operation: &str, err: &rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                metrics::counter!("memorygraph_sqlite_locked_total").increment(1);
                Error::BackendUnavailable {
                    operation: operation.to_string(),
                    cause: "database is locked".to_string(),
                }
            },
            rusqlite::ErrorCode::ConstraintViolation => Error::Relationship(
                message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string()),
            ),
            rusqlite::ErrorCode::CannotOpen => Error::BackendUnavailable {
                operation: operation.to_string(),
                cause: "cannot open database file".to_string(),
            },
            _ => Error::Internal(format!("sqlite failure in {operation}: {err}")),
        },
        _ => Error::Internal(format!("sqlite error in {operation}: {err}")),
    }
}

/// Shorthand for `result.map_err(|e| map_sqlite_error(op, &e))`.
pub fn sql_ctx<T>(operation: &str, result: rusqlite::Result<T>) -> Result<T> {
    result.map_err(|e| map_sqlite_error(operation, &e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_locked_error() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::DatabaseBusy,
                extended_code: 5,
            },
            None,
        );
        let mapped = map_sqlite_error("store_memory", &err);
        assert!(mapped.is_transient());
    }

    #[test]
    fn test_map_constraint_error() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code: 787,
            },
            Some("FOREIGN KEY constraint failed".to_string()),
        );
        let mapped = map_sqlite_error("create_relationship", &err);
        assert!(matches!(mapped, Error::Relationship(_)));
    }
}
