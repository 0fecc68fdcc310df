//! # smallquery-client
//!
//! Client library for SmallQuery.
//!
//! This crate drives one query submission end to end:
//!
//! - **Resolution**: rewrite a friendly table name into its storage path
//!   using the singleton mapping kept in the data bucket
//! - **Invocation**: one synchronous call to the remote query function
//! - **Decoding**: turn the response envelope back into typed rows
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smallquery_client::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(
//!         ClientConfig::new()
//!             .endpoint("http://localhost:3001")
//!             .bucket_url("s3://query-data"),
//!     )?;
//!
//!     let sql = client.resolve("SELECT * FROM taxi").await?;
//!     let outcome = client.query(&sql, Some(10)).await?;
//!     println!("{} rows in {}ms", outcome.result.row_count(), outcome.result.query_ms);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Client façade.
pub mod client;

/// Response decoding.
pub mod codec;

/// Remote function invocation.
pub mod invoker;

/// Table name resolution.
pub mod resolver;

// Re-exports
pub use client::{Client, ClientConfig, QueryOutcome, UploadOutcome};
pub use codec::{decode, ResultSet};
pub use error::{ClientError, ClientResult, DecodeError, InvocationError, ResolutionError};
pub use invoker::{InvokeResponse, LambdaInvoker, RemoteInvoker};
pub use resolver::{rewrite_table_name, MetadataStore, TableResolver};
pub use smallquery_common::Value;
