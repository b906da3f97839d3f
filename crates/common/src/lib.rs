//! Signpose Common Utilities
//!
//! Shared infrastructure for all Signpose crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading
//! - External tool discovery

pub mod config;
pub mod error;
pub mod logging;
pub mod process;

pub use config::*;
pub use error::*;
