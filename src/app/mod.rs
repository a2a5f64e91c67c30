//! Main application modules.
//!
//! This module provides URL normalization and favicon helpers used by the
//! validator and the profile flow, and progress logging used by the CLI.

pub mod logging;
pub mod url;

// Re-export public API
pub use logging::log_progress;
pub use url::{favicon_url, img_url_query_param, normalized_web_url, DEFAULT_FAVICON_SIZE};
