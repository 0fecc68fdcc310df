//! The singleton friendly-name to storage-path mapping.

use serde::{Deserialize, Serialize};
use url::Url;

/// Maps a friendly table name to a physical storage location.
///
/// Only one mapping exists at a time; it lives under
/// [`METADATA_KEY`](crate::constants::METADATA_KEY) and every registration
/// overwrites the previous one.
///
/// `path` is already quoted for inline substitution into SQL, e.g.
/// `'s3://bucket/uploads/taxi_2019_04.parquet'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMapping {
    /// Friendly identifier used in queries.
    pub table_name: String,
    /// Quoted storage URI.
    pub path: String,
}

impl TableMapping {
    /// Creates a mapping from a name and an already quoted path.
    pub fn new(table_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            path: path.into(),
        }
    }

    /// Creates the mapping registered after uploading to `to_path` in the
    /// bucket at `bucket`.
    ///
    /// The path keeps the URL's serialized (percent-encoded) form, the same
    /// form the store was opened from.
    pub fn for_upload(table_name: impl Into<String>, bucket: &Url, to_path: &str) -> Self {
        let path = format!(
            "'{}/{}'",
            bucket.as_str().trim_end_matches('/'),
            to_path.trim_start_matches('/')
        );
        Self::new(table_name, path)
    }
}
