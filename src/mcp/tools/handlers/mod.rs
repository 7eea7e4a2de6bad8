//! Tool execution handlers.
//!
//! One handler per tool: parse arguments, delegate to the facade, format a
//! markdown text response. Error classification happens a layer up.

pub mod analytics;
pub mod core;
pub mod graph;
pub mod migrate;
pub mod temporal;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

/// Deserializes tool arguments, mapping serde's missing-field failures to
/// [`Error::MissingField`] so the decorator classifies them correctly.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| {
        let message = e.to_string();
        message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
            .map_or_else(
                || Error::Validation(format!("invalid arguments: {message}")),
                |field| Error::MissingField(field.to_string()),
            )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tool_types::DeleteMemoryArgs;

    #[test]
    fn test_missing_field_classified() {
        let err = parse_args::<DeleteMemoryArgs>(serde_json::json!({})).unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "memory_id"));
    }

    #[test]
    fn test_wrong_type_is_validation() {
        let err =
            parse_args::<DeleteMemoryArgs>(serde_json::json!({"memory_id": 42})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
