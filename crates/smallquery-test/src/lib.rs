//! # smallquery-test
//!
//! Integration tests for SmallQuery.
//!
//! This crate contains end-to-end tests that run the function host
//! in-process and drive it with the real client.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;
