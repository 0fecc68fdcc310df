//! Validation errors for requests built from user or event input.

use thiserror::Error;

/// A request could not be constructed from its raw input.
///
/// Validation happens before any network cost is incurred, so these errors
/// never reach the remote boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("{field} is not defined")]
    Missing {
        /// Name of the field.
        field: &'static str,
    },

    /// A field that must be text held another JSON type.
    #[error("{field} is not a string (found {found})")]
    NotText {
        /// Name of the field.
        field: &'static str,
        /// JSON type that was found instead.
        found: &'static str,
    },
}

/// Returns the JSON type name of a value, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Extracts a required, non-empty text field from a JSON event.
pub(crate) fn require_text(
    event: &serde_json::Value,
    field: &'static str,
) -> Result<String, ValidationError> {
    match event.get(field) {
        None | Some(serde_json::Value::Null) => Err(ValidationError::Missing { field }),
        Some(serde_json::Value::String(s)) if s.is_empty() => {
            Err(ValidationError::Missing { field })
        }
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::NotText {
            field,
            found: json_type_name(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_text() {
        let event = json!({"a": "x", "b": "", "c": 3, "d": null});
        assert_eq!(require_text(&event, "a").unwrap(), "x");
        assert_eq!(
            require_text(&event, "b"),
            Err(ValidationError::Missing { field: "b" })
        );
        assert_eq!(
            require_text(&event, "c"),
            Err(ValidationError::NotText {
                field: "c",
                found: "number"
            })
        );
        assert_eq!(
            require_text(&event, "d"),
            Err(ValidationError::Missing { field: "d" })
        );
        assert_eq!(
            require_text(&event, "e"),
            Err(ValidationError::Missing { field: "e" })
        );
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::NotText {
            field: "query",
            found: "array",
        };
        assert_eq!(err.to_string(), "query is not a string (found array)");
    }
}
