//! Schema DDL and SQL helpers for the SQLite backend.
//!
//! Column names and index definitions are part of the stable on-disk
//! format; the snapshot/migration pipeline depends on them staying put.

/// On-disk schema version written at init.
pub const SCHEMA_VERSION: i64 = 1;

/// Nodes table: one row per memory, properties JSON-encoded.
pub const CREATE_NODES: &str = "CREATE TABLE IF NOT EXISTS nodes (
    id          TEXT PRIMARY KEY,
    label       TEXT NOT NULL,
    properties  TEXT NOT NULL,
    created_at  TIMESTAMP,
    updated_at  TIMESTAMP
)";

/// Relationships table: directed edges with the bi-temporal quartet.
pub const CREATE_RELATIONSHIPS: &str = "CREATE TABLE IF NOT EXISTS relationships (
    id             TEXT PRIMARY KEY,
    from_id        TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    to_id          TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    rel_type       TEXT NOT NULL,
    properties     TEXT NOT NULL,
    valid_from     TIMESTAMP NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    valid_until    TIMESTAMP,
    recorded_at    TIMESTAMP NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    invalidated_by TEXT REFERENCES relationships(id) ON DELETE SET NULL,
    created_at     TIMESTAMP DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
)";

/// Schema version table; a single row written at init.
pub const CREATE_SCHEMA_VERSION: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
)";

/// Index definitions, applied idempotently after table creation.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_created ON nodes(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_rel_from ON relationships(from_id)",
    "CREATE INDEX IF NOT EXISTS idx_rel_to ON relationships(to_id)",
    "CREATE INDEX IF NOT EXISTS idx_rel_type ON relationships(rel_type)",
    "CREATE INDEX IF NOT EXISTS idx_relationships_temporal ON relationships(valid_from, valid_until)",
    "CREATE INDEX IF NOT EXISTS idx_relationships_current ON relationships(valid_until) WHERE valid_until IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_relationships_recorded ON relationships(recorded_at)",
];

/// Escapes SQL LIKE wildcards in a string to make them literal.
///
/// `%`, `_`, and the escape character itself are prefixed with a backslash
/// so user input in LIKE clauses stays literal.
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}
