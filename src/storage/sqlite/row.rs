//! Row conversion between database rows and model types.
//!
//! Memories serialize whole into `nodes.properties`; relationships split
//! across dedicated columns (temporal quartet, endpoints, type) plus a
//! `properties` JSON column. The relationship row's `updated_at` rides
//! inside that JSON so the wire schema keeps its published column set.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::models::{Memory, Relationship, RelationshipId, RelationshipProperties, RelationshipType};
use crate::{Error, Result};

/// Formats a timestamp for storage: RFC-3339 UTC with fixed microsecond
/// precision, so lexicographic order equals temporal order.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp back into a timezone-aware UTC value.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the stored text is not valid RFC-3339.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("malformed stored timestamp '{text}': {e}")))
}

/// Decodes a memory from its JSON-encoded properties.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the JSON does not decode to a [`Memory`].
pub fn decode_memory(properties: &str) -> Result<Memory> {
    serde_json::from_str(properties)
        .map_err(|e| Error::Internal(format!("malformed memory properties: {e}")))
}

/// Encodes a memory into its JSON properties form.
///
/// # Errors
///
/// Returns [`Error::Internal`] if serialization fails.
pub fn encode_memory(memory: &Memory) -> Result<String> {
    serde_json::to_string(memory)
        .map_err(|e| Error::Internal(format!("failed to encode memory: {e}")))
}

/// The relationship `properties` column: the model properties plus the
/// row's `updated_at`, which has no dedicated column.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRelationshipProperties {
    #[serde(flatten)]
    properties: RelationshipProperties,
    updated_at: DateTime<Utc>,
}

/// Encodes relationship properties for the `properties` column.
///
/// # Errors
///
/// Returns [`Error::Internal`] if serialization fails.
pub fn encode_relationship_properties(relationship: &Relationship) -> Result<String> {
    serde_json::to_string(&StoredRelationshipProperties {
        properties: relationship.properties.clone(),
        updated_at: relationship.updated_at,
    })
    .map_err(|e| Error::Internal(format!("failed to encode relationship properties: {e}")))
}

/// Reconstructs a relationship from a `SELECT id, from_id, to_id, rel_type,
/// properties, valid_from, valid_until, recorded_at, invalidated_by,
/// created_at` row.
///
/// # Errors
///
/// Returns [`Error::Internal`] on malformed stored data.
pub fn decode_relationship_row(row: &Row<'_>) -> Result<Relationship> {
    let read = |idx: usize| -> Result<String> {
        row.get::<_, String>(idx)
            .map_err(|e| Error::Internal(format!("relationship column {idx}: {e}")))
    };
    let read_opt = |idx: usize| -> Result<Option<String>> {
        row.get::<_, Option<String>>(idx)
            .map_err(|e| Error::Internal(format!("relationship column {idx}: {e}")))
    };

    let id = read(0)?;
    let from_id = read(1)?;
    let to_id = read(2)?;
    let rel_type_text = read(3)?;
    let properties_json = read(4)?;
    let valid_from = parse_timestamp(&read(5)?)?;
    let valid_until = read_opt(6)?.map(|t| parse_timestamp(&t)).transpose()?;
    let recorded_at = parse_timestamp(&read(7)?)?;
    let invalidated_by = read_opt(8)?.map(RelationshipId::new);
    let created_at = read_opt(9)?
        .map(|t| parse_timestamp(&t))
        .transpose()?
        .unwrap_or(recorded_at);

    let relationship_type = RelationshipType::parse(&rel_type_text)
        .ok_or_else(|| Error::Internal(format!("unknown stored rel_type '{rel_type_text}'")))?;

    let stored: StoredRelationshipProperties = serde_json::from_str(&properties_json)
        .map_err(|e| Error::Internal(format!("malformed relationship properties: {e}")))?;

    Ok(Relationship {
        id: RelationshipId::new(id),
        from_memory_id: from_id.into(),
        to_memory_id: to_id.into(),
        relationship_type,
        properties: stored.properties,
        valid_from,
        valid_until,
        recorded_at,
        invalidated_by,
        created_at,
        updated_at: stored.updated_at,
    })
}
