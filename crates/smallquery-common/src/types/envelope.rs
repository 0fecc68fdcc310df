//! Response envelopes returned by the remote query function.

use serde::{Deserialize, Serialize};

/// Successful response of the query function.
///
/// `results` is itself a JSON document (an array of row arrays) embedded as
/// a string inside the envelope, which is encoded again for transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// JSON-encoded array of rows.
    pub results: String,
    /// Column names in cursor order.
    pub column_names: Vec<String>,
    /// Time spent fetching rows, in milliseconds.
    pub query_ms: f64,
}

/// Failure response of a remote function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionError {
    /// Human readable failure message.
    #[serde(rename = "errorMessage")]
    pub error_message: String,
    /// Error category, when the host reports one.
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl FunctionError {
    /// Creates a failure response.
    pub fn new(error_message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            error_type: Some(error_type.into()),
        }
    }
}
