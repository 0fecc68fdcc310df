//! # smallquery-server
//!
//! The remote execution unit of SmallQuery.
//!
//! This crate provides:
//!
//! - **Engine**: an explicitly owned handle to the analytical engine
//!   session, created on first use and reused while the process stays warm
//!
//! - **Codec**: encoding of engine rows into the transport envelope
//!
//! - **Functions**: the `run_query` and `upload_data` functions
//!
//! - **HTTP host**: serves the functions over the invocation protocol so
//!   the client can reach them without a hosted function platform
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use smallquery_server::config::ServerConfig;
//! use smallquery_server::functions::Functions;
//! use smallquery_server::http::HttpServer;
//!
//! let config = ServerConfig::default();
//! let functions = Arc::new(Functions::from_config(&config)?);
//! HttpServer::new(functions, &config).serve().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Server configuration.
pub mod config;

/// Engine session handle and cursors.
pub mod engine;

/// Remote-side result encoding.
pub mod codec;

/// The query and upload functions.
pub mod functions;

/// HTTP invocation host.
pub mod http;

// Re-export commonly used types
pub use codec::{encode, EncodeError};
pub use config::ServerConfig;
pub use engine::{Cursor, EngineError, EngineHandle};
pub use functions::{Functions, HandlerError, InvocationLog};
pub use http::HttpServer;
