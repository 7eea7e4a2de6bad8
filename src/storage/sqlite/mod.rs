//! Embedded SQLite backend.
//!
//! The reference backend and the only one guaranteed to exist in every
//! deployment. Memories live in a `nodes` table with JSON-encoded
//! properties; relationships live in a `relationships` table carrying the
//! bi-temporal quartet as dedicated columns. The on-disk format is stable
//! and versioned by a `schema_version` row written at init.
//!
//! # Concurrency Model
//!
//! A `Mutex<Connection>` serializes access; WAL mode and `busy_timeout`
//! keep concurrent processes from failing immediately on contention.

mod connection;
mod row;
mod sql;

pub use connection::{acquire_lock, configure_connection, map_sqlite_error};
pub use sql::{SCHEMA_VERSION, escape_like_wildcards};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::{
    MatchMode, Memory, MemoryId, Relationship, RelationshipId, RelationshipType, SearchQuery,
    utc_now,
};
use crate::storage::traits::MemoryOperations;
use crate::{Error, Result};

use connection::sql_ctx;
use row::{
    decode_memory, decode_relationship_row, encode_memory, encode_relationship_properties,
    format_timestamp,
};

/// Qualified relationship column list for joined queries.
const REL_COLUMNS_QUALIFIED: &str = "r.id, r.from_id, r.to_id, r.rel_type, r.properties, \
     r.valid_from, r.valid_until, r.recorded_at, r.invalidated_by, r.created_at";

/// SQLite-backed implementation of [`MemoryOperations`].
#[derive(Debug)]
pub struct SqliteBackend {
    /// Serialized connection.
    conn: Mutex<Connection>,
    /// Path to the database file (`None` for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Opens (creating if needed) a database file and initializes the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or schema init fails.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::BackendUnavailable {
                operation: "open_sqlite".to_string(),
                cause: format!("cannot create data directory: {e}"),
            })?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::BackendUnavailable {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        backend.initialize()?;
        Ok(backend)
    }

    /// Creates an in-memory database (useful for tests and dry runs).
    ///
    /// # Errors
    ///
    /// Returns an error if schema init fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::BackendUnavailable {
            operation: "open_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        backend.initialize()?;
        Ok(backend)
    }

    /// Returns the database path, if file-backed.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Initializes the schema. Idempotent: every statement is
    /// `CREATE ... IF NOT EXISTS`, and the version row is written only once.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn);

        sql_ctx("create_nodes", conn.execute(sql::CREATE_NODES, []))?;
        sql_ctx(
            "create_relationships",
            conn.execute(sql::CREATE_RELATIONSHIPS, []),
        )?;
        sql_ctx(
            "create_schema_version",
            conn.execute(sql::CREATE_SCHEMA_VERSION, []),
        )?;
        for index in sql::CREATE_INDEXES {
            sql_ctx("create_index", conn.execute(index, []))?;
        }

        let versions: i64 = sql_ctx(
            "count_schema_version",
            conn.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0)),
        )?;
        if versions == 0 {
            sql_ctx(
                "write_schema_version",
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![sql::SCHEMA_VERSION],
                ),
            )?;
        }
        Ok(())
    }

    /// Reads the stored schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version row cannot be read.
    pub fn schema_version(&self) -> Result<i64> {
        let conn = acquire_lock(&self.conn);
        sql_ctx(
            "read_schema_version",
            conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |r| {
                r.get(0)
            }),
        )
    }

    /// Appends the temporal visibility clause for `as_of` to a SQL string,
    /// pushing parameters as needed.
    fn push_temporal_clause(
        sql: &mut String,
        sql_params: &mut Vec<Box<dyn rusqlite::ToSql>>,
        as_of: Option<DateTime<Utc>>,
    ) {
        match as_of {
            None => sql.push_str(" AND valid_until IS NULL"),
            Some(ts) => {
                let text = format_timestamp(ts);
                sql.push_str(" AND valid_from <= ? AND (valid_until IS NULL OR valid_until > ?)");
                sql_params.push(Box::new(text.clone()));
                sql_params.push(Box::new(text));
            },
        }
    }

    fn query_relationships(
        &self,
        operation: &str,
        sql: &str,
        sql_params: Vec<Box<dyn rusqlite::ToSql>>,
    ) -> Result<Vec<Relationship>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = sql_ctx(operation, conn.prepare(sql))?;
        let mut rows = sql_ctx(
            operation,
            stmt.query(rusqlite::params_from_iter(sql_params.iter())),
        )?;
        let mut out = Vec::new();
        while let Some(db_row) = sql_ctx(operation, rows.next())? {
            out.push(decode_relationship_row(db_row)?);
        }
        Ok(out)
    }
}

impl MemoryOperations for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn store_memory(&self, memory: &Memory) -> Result<Memory> {
        let mut conn = acquire_lock(&self.conn);
        let tx = sql_ctx("store_memory_begin", conn.transaction())?;

        let existing: Option<String> = sql_ctx(
            "store_memory_lookup",
            tx.query_row(
                "SELECT properties FROM nodes WHERE id = ?1",
                params![memory.id.as_str()],
                |r| r.get(0),
            )
            .optional(),
        )?;

        // Merge semantics: replace in full, preserve created_at, refresh
        // updated_at, bump version.
        let stored = match existing {
            Some(properties) => {
                let previous = decode_memory(&properties)?;
                let mut merged = memory.clone();
                merged.created_at = previous.created_at;
                merged.version = previous.version + 1;
                merged.updated_at = utc_now();
                merged
            },
            None => memory.clone(),
        };

        sql_ctx(
            "store_memory",
            tx.execute(
                "INSERT INTO nodes (id, label, properties, created_at, updated_at)
                 VALUES (?1, 'Memory', ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     properties = excluded.properties,
                     updated_at = excluded.updated_at",
                params![
                    stored.id.as_str(),
                    encode_memory(&stored)?,
                    format_timestamp(stored.created_at),
                    format_timestamp(stored.updated_at),
                ],
            ),
        )?;
        sql_ctx("store_memory_commit", tx.commit())?;
        Ok(stored)
    }

    fn get_memory(&self, id: &MemoryId) -> Result<Option<Memory>> {
        let conn = acquire_lock(&self.conn);
        let properties: Option<String> = sql_ctx(
            "get_memory",
            conn.query_row(
                "SELECT properties FROM nodes WHERE id = ?1 AND label = 'Memory'",
                params![id.as_str()],
                |r| r.get(0),
            )
            .optional(),
        )?;
        properties.map(|p| decode_memory(&p)).transpose()
    }

    fn update_memory(&self, memory: &Memory) -> Result<Memory> {
        let conn = acquire_lock(&self.conn);
        let changed = sql_ctx(
            "update_memory",
            conn.execute(
                "UPDATE nodes SET properties = ?2, updated_at = ?3 WHERE id = ?1",
                params![
                    memory.id.as_str(),
                    encode_memory(memory)?,
                    format_timestamp(memory.updated_at),
                ],
            ),
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("memory {}", memory.id)));
        }
        Ok(memory.clone())
    }

    fn delete_memory(&self, id: &MemoryId) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let deleted = sql_ctx(
            "delete_memory",
            conn.execute("DELETE FROM nodes WHERE id = ?1", params![id.as_str()]),
        )?;
        Ok(deleted > 0)
    }

    fn search_memories(&self, query: &SearchQuery) -> Result<Vec<Memory>> {
        let mut sql = String::from("SELECT properties FROM nodes WHERE label = 'Memory'");
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        // Structural pushdown narrows the candidate set only when every
        // filter must hold; in `any` mode a structurally-excluded row could
        // still match through the text query, so the facade sees everything.
        if query.match_mode == MatchMode::All {
            if !query.memory_types.is_empty() {
                let placeholders = vec!["?"; query.memory_types.len()].join(", ");
                sql.push_str(&format!(
                    " AND json_extract(properties, '$.type') IN ({placeholders})"
                ));
                for memory_type in &query.memory_types {
                    sql_params.push(Box::new(memory_type.as_str()));
                }
            }
            if let Some(min) = query.min_importance {
                sql.push_str(" AND CAST(json_extract(properties, '$.importance') AS REAL) >= ?");
                sql_params.push(Box::new(min));
            }
            if let Some(max) = query.max_importance {
                sql.push_str(" AND CAST(json_extract(properties, '$.importance') AS REAL) <= ?");
                sql_params.push(Box::new(max));
            }
            if let Some(min) = query.min_confidence {
                sql.push_str(" AND CAST(json_extract(properties, '$.confidence') AS REAL) >= ?");
                sql_params.push(Box::new(min));
            }
            if let Some(project_path) = &query.project_path {
                sql.push_str(
                    " AND json_extract(properties, '$.context.project_path') LIKE ? ESCAPE '\\'",
                );
                sql_params.push(Box::new(format!(
                    "%{}%",
                    escape_like_wildcards(project_path)
                )));
            }
            if let Some(from) = query.date_from {
                sql.push_str(" AND updated_at >= ?");
                sql_params.push(Box::new(format_timestamp(from)));
            }
            if let Some(to) = query.date_to {
                sql.push_str(" AND updated_at <= ?");
                sql_params.push(Box::new(format_timestamp(to)));
            }
        }

        sql.push_str(
            " ORDER BY CAST(json_extract(properties, '$.importance') AS REAL) DESC, \
             updated_at DESC, id ASC",
        );

        let conn = acquire_lock(&self.conn);
        let mut stmt = sql_ctx("search_memories", conn.prepare(&sql))?;
        let mut rows = sql_ctx(
            "search_memories",
            stmt.query(rusqlite::params_from_iter(sql_params.iter())),
        )?;
        let mut out = Vec::new();
        while let Some(db_row) = sql_ctx("search_memories", rows.next())? {
            let properties: String = sql_ctx("search_memories", db_row.get(0))?;
            out.push(decode_memory(&properties)?);
        }
        Ok(out)
    }

    fn count_memories(&self) -> Result<u64> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = sql_ctx(
            "count_memories",
            conn.query_row(
                "SELECT COUNT(*) FROM nodes WHERE label = 'Memory'",
                [],
                |r| r.get(0),
            ),
        )?;
        Ok(count.unsigned_abs())
    }

    fn list_memories(&self) -> Result<Vec<Memory>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = sql_ctx(
            "list_memories",
            conn.prepare(
                "SELECT properties FROM nodes WHERE label = 'Memory' \
                 ORDER BY created_at ASC, id ASC",
            ),
        )?;
        let mut rows = sql_ctx("list_memories", stmt.query([]))?;
        let mut out = Vec::new();
        while let Some(db_row) = sql_ctx("list_memories", rows.next())? {
            let properties: String = sql_ctx("list_memories", db_row.get(0))?;
            out.push(decode_memory(&properties)?);
        }
        Ok(out)
    }

    fn create_relationship(&self, relationship: &Relationship) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        sql_ctx(
            "create_relationship",
            conn.execute(
                "INSERT INTO relationships (id, from_id, to_id, rel_type, properties, \
                 valid_from, valid_until, recorded_at, invalidated_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    relationship.id.as_str(),
                    relationship.from_memory_id.as_str(),
                    relationship.to_memory_id.as_str(),
                    relationship.relationship_type.as_str(),
                    encode_relationship_properties(relationship)?,
                    format_timestamp(relationship.valid_from),
                    relationship.valid_until.map(format_timestamp),
                    format_timestamp(relationship.recorded_at),
                    relationship.invalidated_by.as_ref().map(|r| r.as_str().to_string()),
                    format_timestamp(relationship.created_at),
                ],
            ),
        )?;
        Ok(())
    }

    fn get_relationship(&self, id: &RelationshipId) -> Result<Option<Relationship>> {
        let sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED} FROM relationships r WHERE r.id = ?"
        );
        let rows = self.query_relationships(
            "get_relationship",
            &sql,
            vec![Box::new(id.as_str().to_string())],
        )?;
        Ok(rows.into_iter().next())
    }

    fn update_relationship(&self, relationship: &Relationship) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        let changed = sql_ctx(
            "update_relationship",
            conn.execute(
                "UPDATE relationships SET properties = ?2, valid_from = ?3, valid_until = ?4, \
                 invalidated_by = ?5 WHERE id = ?1",
                params![
                    relationship.id.as_str(),
                    encode_relationship_properties(relationship)?,
                    format_timestamp(relationship.valid_from),
                    relationship.valid_until.map(format_timestamp),
                    relationship.invalidated_by.as_ref().map(|r| r.as_str().to_string()),
                ],
            ),
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("relationship {}", relationship.id)));
        }
        Ok(())
    }

    fn relationships_from(
        &self,
        id: &MemoryId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<Relationship>> {
        let mut sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED} FROM relationships r WHERE r.from_id = ?"
        );
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(id.as_str().to_string())];
        Self::push_temporal_clause(&mut sql, &mut sql_params, as_of);
        sql.push_str(" ORDER BY r.created_at ASC, r.id ASC");
        self.query_relationships("relationships_from", &sql, sql_params)
    }

    fn relationships_to(
        &self,
        id: &MemoryId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<Relationship>> {
        let mut sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED} FROM relationships r WHERE r.to_id = ?"
        );
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(id.as_str().to_string())];
        Self::push_temporal_clause(&mut sql, &mut sql_params, as_of);
        sql.push_str(" ORDER BY r.created_at ASC, r.id ASC");
        self.query_relationships("relationships_to", &sql, sql_params)
    }

    fn relationships_touching(&self, id: &MemoryId) -> Result<Vec<Relationship>> {
        let sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED} FROM relationships r \
             WHERE r.from_id = ?1 OR r.to_id = ?1 ORDER BY r.valid_from ASC, r.id ASC"
        );
        self.query_relationships(
            "relationships_touching",
            &sql,
            vec![Box::new(id.as_str().to_string())],
        )
    }

    fn relationships_recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<Relationship>> {
        let sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED} FROM relationships r \
             WHERE r.recorded_at >= ? ORDER BY r.recorded_at ASC, r.id ASC"
        );
        self.query_relationships(
            "relationships_recorded_since",
            &sql,
            vec![Box::new(format_timestamp(since))],
        )
    }

    fn relationships_invalidated_since(&self, since: DateTime<Utc>) -> Result<Vec<Relationship>> {
        let sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED} FROM relationships r \
             WHERE r.valid_until IS NOT NULL AND r.valid_until >= ? \
             ORDER BY r.valid_until ASC, r.id ASC"
        );
        self.query_relationships(
            "relationships_invalidated_since",
            &sql,
            vec![Box::new(format_timestamp(since))],
        )
    }

    fn list_relationships(&self) -> Result<Vec<Relationship>> {
        let sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED} FROM relationships r \
             ORDER BY r.created_at ASC, r.id ASC"
        );
        self.query_relationships("list_relationships", &sql, Vec::new())
    }

    fn count_relationships(&self) -> Result<u64> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = sql_ctx(
            "count_relationships",
            conn.query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get(0)),
        )?;
        Ok(count.unsigned_abs())
    }

    fn get_related_memories(
        &self,
        id: &MemoryId,
        types: Option<&[RelationshipType]>,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<(Memory, Relationship)>> {
        let mut sql = format!(
            "SELECT {REL_COLUMNS_QUALIFIED}, n.properties FROM relationships r \
             JOIN nodes n ON n.id = r.to_id WHERE r.from_id = ?"
        );
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(id.as_str().to_string())];
        Self::push_temporal_clause(&mut sql, &mut sql_params, as_of);
        if let Some(types) = types
            && !types.is_empty()
        {
            let placeholders = vec!["?"; types.len()].join(", ");
            sql.push_str(&format!(" AND r.rel_type IN ({placeholders})"));
            for relationship_type in types {
                sql_params.push(Box::new(relationship_type.as_str()));
            }
        }
        sql.push_str(" ORDER BY r.created_at ASC, r.id ASC");

        let conn = acquire_lock(&self.conn);
        let mut stmt = sql_ctx("get_related_memories", conn.prepare(&sql))?;
        let mut rows = sql_ctx(
            "get_related_memories",
            stmt.query(rusqlite::params_from_iter(sql_params.iter())),
        )?;
        let mut out = Vec::new();
        while let Some(db_row) = sql_ctx("get_related_memories", rows.next())? {
            let relationship = decode_relationship_row(db_row)?;
            let properties: String = sql_ctx("get_related_memories", db_row.get(10))?;
            out.push((decode_memory(&properties)?, relationship));
        }
        Ok(out)
    }
}
