//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (endpoint paths, poll budgets, probe timeouts)
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{CheckKind, Config, LogFormat, LogLevel};
