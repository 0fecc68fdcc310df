//! Requests sent to the remote functions.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::constants::{DEFAULT_ROWS, MAX_ROWS};
use crate::error::{require_text, ValidationError};

// =============================================================================
// QueryRequest
// =============================================================================

/// A validated, immutable query submission.
///
/// The SQL text is never parsed here; it only has to be present. The row
/// limit is permissive: whatever was requested is clamped into
/// `[1, MAX_ROWS]`, and a missing limit becomes `DEFAULT_ROWS`.
///
/// Serializes to `{"query": <sql>, "limit": <limit>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    #[serde(rename = "query")]
    sql: String,
    limit: usize,
}

impl QueryRequest {
    /// Builds a request from SQL text and an optional requested limit.
    pub fn new(sql: impl Into<String>, requested_limit: Option<i64>) -> Result<Self, ValidationError> {
        let sql = sql.into();
        if sql.is_empty() {
            return Err(ValidationError::Missing { field: "query" });
        }

        Ok(Self {
            sql,
            limit: Self::clamp_limit(requested_limit),
        })
    }

    /// Builds a request from a raw invocation event.
    ///
    /// `query` must be non-empty text. `limit` may be an integer, a float
    /// (truncated) or a numeric string; anything else is treated as absent.
    pub fn from_event(event: &JsonValue) -> Result<Self, ValidationError> {
        let sql = require_text(event, "query")?;
        let limit = event.get("limit").and_then(parse_limit);
        Self::new(sql, limit)
    }

    /// Clamps a requested limit into `[1, MAX_ROWS]`.
    pub fn clamp_limit(requested: Option<i64>) -> usize {
        match requested {
            None => DEFAULT_ROWS,
            Some(n) if n < 1 => 1,
            Some(n) => usize::try_from(n).map_or(MAX_ROWS, |n| n.min(MAX_ROWS)),
        }
    }

    /// Returns the SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the effective row limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the canonical transport form.
    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({ "query": self.sql, "limit": self.limit })
    }
}

fn parse_limit(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Upload
// =============================================================================

/// A request to copy a public resource into the data bucket.
///
/// Serializes to `{"from_url": <url>, "to_path": <path>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upload {
    from_url: String,
    to_path: String,
}

impl Upload {
    /// Builds an upload request; both fields must be non-empty.
    pub fn new(
        from_url: impl Into<String>,
        to_path: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let from_url = from_url.into();
        let to_path = to_path.into();
        if from_url.is_empty() {
            return Err(ValidationError::Missing { field: "from_url" });
        }
        if to_path.is_empty() {
            return Err(ValidationError::Missing { field: "to_path" });
        }
        Ok(Self { from_url, to_path })
    }

    /// Builds an upload request from a raw invocation event.
    pub fn from_event(event: &JsonValue) -> Result<Self, ValidationError> {
        let from_url = require_text(event, "from_url")?;
        let to_path = require_text(event, "to_path")?;
        Self::new(from_url, to_path)
    }

    /// External public URL used as the data source.
    pub fn from_url(&self) -> &str {
        &self.from_url
    }

    /// Path under the data bucket where the data is written.
    pub fn to_path(&self) -> &str {
        &self.to_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_limit_clamped_to_max() {
        for requested in [1001, 5000, i64::MAX] {
            let request = QueryRequest::new("select 1", Some(requested)).unwrap();
            assert_eq!(request.limit(), MAX_ROWS);
        }
    }

    #[test]
    fn test_limit_in_range_unchanged() {
        for requested in [1, 10, 999, 1000] {
            let request = QueryRequest::new("select 1", Some(requested)).unwrap();
            assert_eq!(request.limit(), requested as usize);
        }
    }

    #[test]
    fn test_limit_defaults_and_lower_bound() {
        assert_eq!(QueryRequest::new("select 1", None).unwrap().limit(), 10);
        assert_eq!(QueryRequest::new("select 1", Some(0)).unwrap().limit(), 1);
        assert_eq!(QueryRequest::new("select 1", Some(-7)).unwrap().limit(), 1);
    }

    #[test]
    fn test_empty_sql_rejected() {
        assert_eq!(
            QueryRequest::new("", Some(10)),
            Err(ValidationError::Missing { field: "query" })
        );
    }

    #[test]
    fn test_from_event() {
        let request = QueryRequest::from_event(&json!({"query": "select 1", "limit": 5000})).unwrap();
        assert_eq!(request.sql(), "select 1");
        assert_eq!(request.limit(), 1000);

        let request = QueryRequest::from_event(&json!({"query": "select 1"})).unwrap();
        assert_eq!(request.limit(), 10);

        let request = QueryRequest::from_event(&json!({"query": "select 1", "limit": "25"})).unwrap();
        assert_eq!(request.limit(), 25);

        let request = QueryRequest::from_event(&json!({"query": "select 1", "limit": 7.9})).unwrap();
        assert_eq!(request.limit(), 7);

        let request = QueryRequest::from_event(&json!({"query": "select 1", "limit": [1]})).unwrap();
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn test_from_event_rejects_non_text() {
        assert_eq!(
            QueryRequest::from_event(&json!({"query": 42})),
            Err(ValidationError::NotText {
                field: "query",
                found: "number"
            })
        );
        assert_eq!(
            QueryRequest::from_event(&json!({"limit": 10})),
            Err(ValidationError::Missing { field: "query" })
        );
        assert!(QueryRequest::from_event(&json!({"query": ""})).is_err());
    }

    #[test]
    fn test_transport_form() {
        let request = QueryRequest::new("select 1", Some(5000)).unwrap();
        assert_eq!(request.to_json(), json!({"query": "select 1", "limit": 1000}));
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"query":"select 1","limit":1000}"#
        );
    }

    #[test]
    fn test_upload_validation() {
        let upload = Upload::new("https://example.com/a.parquet", "uploads/a.parquet").unwrap();
        assert_eq!(upload.from_url(), "https://example.com/a.parquet");
        assert_eq!(upload.to_path(), "uploads/a.parquet");

        assert_eq!(
            Upload::new("", "x"),
            Err(ValidationError::Missing { field: "from_url" })
        );
        assert_eq!(
            Upload::new("https://example.com", ""),
            Err(ValidationError::Missing { field: "to_path" })
        );
        assert_eq!(
            Upload::from_event(&json!({"from_url": "u", "to_path": 3})),
            Err(ValidationError::NotText {
                field: "to_path",
                found: "number"
            })
        );
    }

    #[test]
    fn test_upload_transport_form() {
        let upload = Upload::new("https://example.com/a.csv", "uploads/a.csv").unwrap();
        assert_eq!(
            serde_json::to_value(&upload).unwrap(),
            json!({"from_url": "https://example.com/a.csv", "to_path": "uploads/a.csv"})
        );
    }
}
