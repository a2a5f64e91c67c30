//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - The logger
//! - HTTP clients (API calls and match probes)
//! - The cancellation token every flow listens to
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use tokio_util::sync::CancellationToken;

// Re-export public API
pub use client::{init_client, init_probe_client};
pub use logger::init_logger_with;

/// Initializes the root cancellation token.
///
/// Each analysis run derives a child token from it, so cancelling the root
/// abandons every in-flight flow (polling, validation probes, progress).
pub fn init_cancellation() -> CancellationToken {
    CancellationToken::new()
}
