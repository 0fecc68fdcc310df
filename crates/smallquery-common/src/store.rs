//! Opening object stores from bucket URLs.
//!
//! Supported schemes:
//! - `s3://bucket` - Amazon S3, configured from `AWS_*` environment variables
//! - `file:///path` - local directory, created if missing
//! - `memory://` - process-local in-memory store

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use thiserror::Error;
use url::Url;

/// Failed to open an object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The URL could not be parsed.
    #[error("invalid bucket url '{url}': {source}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// The URL scheme has no backing store.
    #[error("unsupported bucket url scheme '{scheme}' in '{url}'")]
    UnsupportedScheme {
        /// The offending URL.
        url: String,
        /// Its scheme.
        scheme: String,
    },

    /// The backing store failed to initialize.
    #[error("failed to create object store for {url}")]
    Backend {
        /// The offending URL.
        url: String,
        /// Backend failure.
        #[source]
        source: object_store::Error,
    },

    /// A `file://` URL that does not name a local directory.
    #[error("bucket url '{url}' is not a local path")]
    NotLocalPath {
        /// The offending URL.
        url: String,
    },

    /// The local directory could not be created.
    #[error("failed to create directory for {url}")]
    Io {
        /// The offending URL.
        url: String,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Parses a bucket URL.
pub fn parse_bucket_url(url: &str) -> Result<Url, StoreError> {
    Url::parse(url).map_err(|source| StoreError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

/// Opens the object store rooted at the bucket identified by `url`.
///
/// Paths used with the returned store are relative to the bucket root (or
/// the directory, for `file://` URLs).
pub fn open(url: &Url) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match url.scheme() {
        "s3" => {
            let store = AmazonS3Builder::from_env()
                .with_url(url.as_str())
                .build()
                .map_err(|source| StoreError::Backend {
                    url: url.to_string(),
                    source,
                })?;
            Ok(Arc::new(store))
        }
        "file" => {
            let dir = url.to_file_path().map_err(|()| StoreError::NotLocalPath {
                url: url.to_string(),
            })?;
            std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
                url: url.to_string(),
                source,
            })?;
            let store = LocalFileSystem::new_with_prefix(&dir).map_err(|source| {
                StoreError::Backend {
                    url: url.to_string(),
                    source,
                }
            })?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(InMemory::new())),
        scheme => Err(StoreError::UnsupportedScheme {
            url: url.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}
