//! Error types for the client library.

use smallquery_common::{StoreError, ValidationError};
use thiserror::Error;

/// The table mapping could not be used to resolve a query.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No bucket is configured, so there is nowhere to read the mapping from.
    #[error("no bucket configured for table metadata")]
    NotConfigured,

    /// No mapping has been registered yet.
    #[error("no table mapping found at {key}")]
    NotFound {
        /// Metadata key that was read.
        key: String,
    },

    /// The metadata object could not be read.
    #[error("unable to read table mapping at {key}: {source}")]
    Read {
        /// Metadata key that was read.
        key: String,
        /// Storage failure.
        source: object_store::Error,
    },

    /// The metadata object is not a valid mapping.
    #[error("malformed table mapping at {key}: {source}")]
    Malformed {
        /// Metadata key that was read.
        key: String,
        /// Parse failure.
        source: serde_json::Error,
    },
}

/// A remote function could not be invoked.
///
/// Every variant names the function that was targeted.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The payload could not be serialized.
    #[error("unable to encode payload for function {target}: {source}")]
    Payload {
        /// Function name.
        target: String,
        /// Serialization failure.
        source: serde_json::Error,
    },

    /// The request did not complete.
    #[error("unable to invoke function {target}: {source}")]
    Transport {
        /// Function name.
        target: String,
        /// Transport failure.
        source: reqwest::Error,
    },

    /// The invocation service rejected the call.
    #[error("function {target} rejected the invocation (HTTP {status}): {message}")]
    Service {
        /// Function name.
        target: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },
}

impl InvocationError {
    /// Returns the function the failed invocation targeted.
    pub fn target(&self) -> &str {
        match self {
            InvocationError::Payload { target, .. }
            | InvocationError::Transport { target, .. }
            | InvocationError::Service { target, .. } => target,
        }
    }
}

/// A response payload could not be turned into a result set.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The function reported a failure; `results` was not looked at.
    #[error("query failed: {message}")]
    Remote {
        /// Message reported by the function.
        message: String,
        /// Error category, if reported.
        error_type: Option<String>,
    },

    /// The outer envelope is not valid JSON of the expected shape.
    #[error("malformed response envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// A required envelope field is absent.
    #[error("response envelope is missing '{0}'")]
    MissingField(&'static str),

    /// The inner results document is not an array of scalar rows.
    #[error("malformed results document: {0}")]
    Results(#[source] serde_json::Error),

    /// `results` is neither an encoded document nor an array.
    #[error("results must be an encoded document or an array, found {0}")]
    ResultsType(&'static str),

    /// A row does not have one value per column.
    #[error("row {row} has {actual} values but there are {expected} columns")]
    RowWidth {
        /// Zero-based row index.
        row: usize,
        /// Number of columns.
        expected: usize,
        /// Number of values in the row.
        actual: usize,
    },
}

impl DecodeError {
    /// Returns true if the function itself reported the failure.
    pub fn is_remote(&self) -> bool {
        matches!(self, DecodeError::Remote { .. })
    }
}

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request was malformed.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Table resolution failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The remote function could not be invoked.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// The response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The upload function ran but reported an error.
    #[error("upload to {to_path} failed on the remote side")]
    UploadFailed {
        /// Destination path of the upload.
        to_path: String,
    },

    /// The table mapping could not be written.
    #[error("unable to write table mapping: {0}")]
    Metadata(#[from] object_store::Error),

    /// The bucket could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
