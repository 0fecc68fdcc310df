//! System-wide constants for SmallQuery.

// =============================================================================
// Row Limits
// =============================================================================

/// Maximum number of rows a single query may return.
pub const MAX_ROWS: usize = 1000;

/// Row limit applied when a request does not specify one.
pub const DEFAULT_ROWS: usize = 10;

// =============================================================================
// Metadata
// =============================================================================

/// Key of the singleton table mapping inside the data bucket.
pub const METADATA_KEY: &str = "metadata/table.json";

// =============================================================================
// Remote Functions
// =============================================================================

/// Default name of the remote function that runs queries.
pub const DEFAULT_QUERY_FUNCTION: &str = "smallquery-RunQueryFunction";

/// Default name of the remote function that copies external data into the bucket.
pub const DEFAULT_UPLOAD_FUNCTION: &str = "smallquery-UploadDataFunction";

/// Amount of invocation diagnostics returned when a log tail is requested (4 KB).
pub const LOG_TAIL_BYTES: usize = 4 * 1024;
