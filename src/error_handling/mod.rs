//! Error handling.
//!
//! This module provides:
//! - The error type every analysis flow returns
//! - Error categorization for log lines
//! - Retry strategy configuration for transient failures
//!
//! Flows never surface raw errors to the presentation layer. Each error carries
//! a user-facing message (see [`AnalysisError::user_message`]) and a category
//! (see [`AnalysisError::error_type`]) that is logged alongside it.

mod categorization;
mod types;

// Re-export public API
pub use categorization::{categorize_reqwest_error, get_retry_strategy, is_retriable_error};
pub use types::{AnalysisError, ErrorType, InitializationError};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_category_is_distinct() {
        let all: Vec<ErrorType> = ErrorType::iter().collect();
        let unique: std::collections::HashSet<&str> = all.iter().map(|e| e.as_str()).collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn test_error_display_matches_category_display() {
        let err = AnalysisError::NoEngines;
        assert_eq!(err.error_type().to_string(), "No engines returned");
    }
}
