//! Client-side decoding of query function responses.
//!
//! The response body is a JSON envelope whose `results` field holds a second
//! JSON document, the array of rows. Both layers are parsed here. A body
//! carrying `errorMessage` is reported as [`DecodeError::Remote`] without
//! touching `results`.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use smallquery_common::Value;

use crate::error::DecodeError;

/// A decoded result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    /// Column names in cursor order.
    pub column_names: Vec<String>,
    /// Rows, each with one value per column.
    pub rows: Vec<Vec<Value>>,
    /// Time the remote side spent fetching rows, in milliseconds.
    pub query_ms: f64,
}

impl ResultSet {
    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Returns true if no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    results: Option<JsonValue>,
    #[serde(default)]
    column_names: Option<Vec<String>>,
    #[serde(default)]
    query_ms: Option<f64>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
}

/// Decodes a query function response body.
pub fn decode(body: &[u8]) -> Result<ResultSet, DecodeError> {
    let envelope: RawEnvelope = serde_json::from_slice(body).map_err(DecodeError::Envelope)?;

    if let Some(message) = envelope.error_message {
        return Err(DecodeError::Remote {
            message,
            error_type: envelope.error_type,
        });
    }

    let column_names = envelope
        .column_names
        .ok_or(DecodeError::MissingField("column_names"))?;
    let query_ms = envelope
        .query_ms
        .ok_or(DecodeError::MissingField("query_ms"))?;
    let results = envelope
        .results
        .ok_or(DecodeError::MissingField("results"))?;

    let rows: Vec<Vec<Value>> = match results {
        JsonValue::String(document) => {
            serde_json::from_str(&document).map_err(DecodeError::Results)?
        }
        // Single-layer encoding, accepted for older deployments.
        array @ JsonValue::Array(_) => {
            serde_json::from_value(array).map_err(DecodeError::Results)?
        }
        JsonValue::Null => return Err(DecodeError::ResultsType("null")),
        JsonValue::Bool(_) => return Err(DecodeError::ResultsType("boolean")),
        JsonValue::Number(_) => return Err(DecodeError::ResultsType("number")),
        JsonValue::Object(_) => return Err(DecodeError::ResultsType("object")),
    };

    let expected = column_names.len();
    if let Some((row, values)) = rows
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != expected)
    {
        return Err(DecodeError::RowWidth {
            row,
            expected,
            actual: values.len(),
        });
    }

    Ok(ResultSet {
        column_names,
        rows,
        query_ms,
    })
}
