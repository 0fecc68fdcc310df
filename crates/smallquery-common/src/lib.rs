//! # smallquery-common
//!
//! Common types, errors, and utilities for SmallQuery.
//!
//! This crate holds everything the client and the remote execution unit must
//! agree on. It includes:
//!
//! - **Types**: the query request, upload request, table mapping, scalar
//!   values and the response envelope as they travel over the wire
//! - **Errors**: `ValidationError` for malformed requests
//! - **Constants**: row limits, well-known keys and function names
//! - **Protocol**: headers and paths of the function invocation protocol
//! - **Store**: opening an object store from a bucket URL
//!
//! ## Example
//!
//! ```rust
//! use smallquery_common::types::QueryRequest;
//!
//! let request = QueryRequest::new("SELECT 1", Some(5000)).unwrap();
//! assert_eq!(request.limit(), 1000);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod protocol;
pub mod store;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::ValidationError;
pub use store::StoreError;
pub use types::{
    FunctionError, QueryRequest, QueryResponse, TableMapping, Upload, Value,
};
