//! Error categorization and retry strategy.
//!
//! This module provides functions to categorize errors and configure retry strategies.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::{AnalysisError, ErrorType};

/// Creates an exponential backoff retry strategy.
///
/// Returns a retry strategy configured with:
/// - Initial delay: `RETRY_INITIAL_DELAY_MS` milliseconds
/// - Backoff factor: `RETRY_FACTOR` (doubles delay each retry)
/// - Maximum delay: `RETRY_MAX_DELAY_SECS` seconds
/// - Maximum attempts: `RETRY_MAX_ATTEMPTS`
///
/// Only the authentication calls are retried. Task submission and polling have
/// their own budgets and never go through this strategy.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::RETRY_INITIAL_DELAY_MS)
        .factor(crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(crate::config::RETRY_MAX_ATTEMPTS)
}

/// Categorizes a `reqwest::Error` into an `ErrorType`.
///
/// # Arguments
///
/// * `error` - The `reqwest::Error` to categorize
///
/// # Returns
///
/// The appropriate `ErrorType` for the error.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if let Some(status) = error.status() {
        return ErrorType::from_status(status.as_u16());
    }

    if error.is_builder() {
        ErrorType::HttpRequestBuilderError
    } else if error.is_redirect() {
        ErrorType::HttpRequestRedirectError
    } else if error.is_timeout() {
        ErrorType::HttpRequestTimeoutError
    } else if error.is_connect() {
        ErrorType::HttpRequestConnectError
    } else if error.is_body() {
        ErrorType::HttpRequestBodyError
    } else if error.is_decode() {
        ErrorType::HttpRequestDecodeError
    } else {
        ErrorType::HttpRequestOtherError
    }
}

/// Determines if an error is transient and worth another attempt.
///
/// Retriable: timeouts, connection failures, 5xx responses and 429.
/// Everything else (other 4xx, decode failures, configuration problems,
/// cancellation) is permanent.
pub fn is_retriable_error(error: &AnalysisError) -> bool {
    match error {
        AnalysisError::Transport(e) => {
            if let Some(status) = e.status() {
                return is_retriable_status(status.as_u16());
            }
            if e.is_redirect() || e.is_decode() || e.is_builder() {
                return false;
            }
            e.is_timeout() || e.is_connect() || e.is_request()
        }
        AnalysisError::BadServerResponse { status, .. } => is_retriable_status(*status),
        _ => false,
    }
}

fn is_retriable_status(status: u16) -> bool {
    status == crate::config::HTTP_STATUS_TOO_MANY_REQUESTS || (500..600).contains(&status)
}
