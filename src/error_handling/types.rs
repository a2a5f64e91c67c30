//! Error type definitions.
//!
//! This module defines the error taxonomy of the analysis pipeline and the
//! categories used when logging failures.

use std::path::PathBuf;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Everything that can go wrong while running one analysis flow.
///
/// Orchestrators never hand these to the presentation layer directly; they are
/// converted with [`AnalysisError::user_message`] and rendered inline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Network or connectivity failure (DNS, TLS, reset, socket timeout).
    #[error("Network error: {0}")]
    Transport(#[from] ReqwestError),

    /// A non-2xx status on a call that must succeed.
    #[error("Server responded with HTTP {status}")]
    BadServerResponse { status: u16, body: String },

    /// The body did not match any expected shape.
    #[error("Could not decode server response: {0}")]
    Decode(String),

    /// The poll budget ran out before the task reached a terminal status.
    #[error("Task {task_id} did not finish after {attempts} polling attempts")]
    TimedOut { task_id: String, attempts: u32 },

    /// Every candidate match was rejected by the validator.
    #[error("No results with working images")]
    ValidationEmpty,

    /// The reverse-image task produced no engines at all.
    #[error("No results received from server")]
    NoEngines,

    /// A finished task without the field the flow needs.
    #[error("{0}")]
    MissingResult(&'static str),

    /// The backend finished the task but reported its own error text.
    #[error("Backend reported an error: {0}")]
    Backend(String),

    /// Background removal answered with a non-2xx status or unusable bytes.
    #[error("{}", rembg_message(*.status, .message.as_deref()))]
    BackgroundRemoval { status: u16, message: Option<String> },

    /// A required configuration value is absent.
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    /// A mock fixture could not be read.
    #[error("Failed to read fixture {}: {source}", .path.display())]
    Fixture {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The consumer abandoned the flow.
    #[error("Analysis cancelled")]
    Cancelled,
}

fn rembg_message(status: u16, message: Option<&str>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!("REMBG failed ({status}): {message}"),
        _ => format!("REMBG failed ({status})."),
    }
}

impl AnalysisError {
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        AnalysisError::Decode(err.to_string())
    }

    /// The message shown in place of a result.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Transport(_) | AnalysisError::BadServerResponse { .. } => {
                "Something went wrong while contacting the server. Please try again.".to_string()
            }
            AnalysisError::Decode(_) => {
                "The server returned a response we could not read.".to_string()
            }
            AnalysisError::TimedOut { .. } => {
                "The analysis is taking too long. Please try again later.".to_string()
            }
            AnalysisError::ValidationEmpty
            | AnalysisError::NoEngines
            | AnalysisError::MissingResult(_)
            | AnalysisError::BackgroundRemoval { .. } => self.to_string(),
            AnalysisError::Backend(message) => message.clone(),
            AnalysisError::MissingConfig(_) | AnalysisError::Fixture { .. } => {
                "The app is not configured correctly.".to_string()
            }
            AnalysisError::Cancelled => "Analysis cancelled".to_string(),
        }
    }

    /// Category used when logging the failure.
    pub fn error_type(&self) -> ErrorType {
        match self {
            AnalysisError::Transport(e) => super::categorize_reqwest_error(e),
            AnalysisError::BadServerResponse { status, .. } => ErrorType::from_status(*status),
            AnalysisError::Decode(_) => ErrorType::TaskDecodeError,
            AnalysisError::TimedOut { .. } => ErrorType::TaskPollTimeout,
            AnalysisError::ValidationEmpty => ErrorType::ValidationEmpty,
            AnalysisError::NoEngines => ErrorType::NoEngines,
            AnalysisError::MissingResult(_) | AnalysisError::Backend(_) => {
                ErrorType::TaskMissingResult
            }
            AnalysisError::BackgroundRemoval { .. } => ErrorType::BackgroundRemovalError,
            AnalysisError::MissingConfig(_) | AnalysisError::Fixture { .. } => {
                ErrorType::ConfigurationError
            }
            AnalysisError::Cancelled => ErrorType::Cancelled,
        }
    }
}

/// Failure categories, used to tag log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // HTTP/Network errors
    HttpRequestBuilderError,
    HttpRequestRedirectError,
    HttpRequestTimeoutError,
    HttpRequestConnectError,
    HttpRequestBodyError,
    HttpRequestDecodeError,
    HttpRequestOtherError,
    HttpRequestTooManyRequests,
    HttpRequestBadRequest,          // 400 Bad Request
    HttpRequestUnauthorized,        // 401 Unauthorized
    HttpRequestForbidden,           // 403 Forbidden
    HttpRequestNotFound,            // 404 Not Found
    HttpRequestUnprocessable,       // 422 Unprocessable Entity (FastAPI validation)
    HttpRequestInternalServerError, // 500 Internal Server Error
    HttpRequestBadGateway,          // 502 Bad Gateway
    HttpRequestServiceUnavailable,  // 503 Service Unavailable
    HttpRequestGatewayTimeout,      // 504 Gateway Timeout
    // Task lifecycle
    TaskDecodeError,
    TaskPollTimeout,
    TaskMissingResult,
    // Result pipeline
    NoEngines,
    ValidationEmpty,
    BackgroundRemovalError,
    ConfigurationError,
    Cancelled,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    /// Maps an HTTP status to its category.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorType::HttpRequestBadRequest,
            401 => ErrorType::HttpRequestUnauthorized,
            403 => ErrorType::HttpRequestForbidden,
            404 => ErrorType::HttpRequestNotFound,
            422 => ErrorType::HttpRequestUnprocessable,
            429 => ErrorType::HttpRequestTooManyRequests,
            500 => ErrorType::HttpRequestInternalServerError,
            502 => ErrorType::HttpRequestBadGateway,
            503 => ErrorType::HttpRequestServiceUnavailable,
            504 => ErrorType::HttpRequestGatewayTimeout,
            _ => ErrorType::HttpRequestOtherError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpRequestBuilderError => "HTTP request builder error",
            ErrorType::HttpRequestRedirectError => "HTTP request redirect error",
            ErrorType::HttpRequestTimeoutError => "HTTP request timeout error",
            ErrorType::HttpRequestConnectError => "HTTP request connect error",
            ErrorType::HttpRequestBodyError => "HTTP request body error",
            ErrorType::HttpRequestDecodeError => "HTTP request decode error",
            ErrorType::HttpRequestOtherError => "HTTP request other error",
            ErrorType::HttpRequestTooManyRequests => "Too many requests",
            ErrorType::HttpRequestBadRequest => "Bad Request (400)",
            ErrorType::HttpRequestUnauthorized => "Unauthorized (401)",
            ErrorType::HttpRequestForbidden => "Forbidden (403)",
            ErrorType::HttpRequestNotFound => "Not Found (404)",
            ErrorType::HttpRequestUnprocessable => "Unprocessable Entity (422)",
            ErrorType::HttpRequestInternalServerError => "Internal Server Error (500)",
            ErrorType::HttpRequestBadGateway => "Bad Gateway (502)",
            ErrorType::HttpRequestServiceUnavailable => "Service Unavailable (503)",
            ErrorType::HttpRequestGatewayTimeout => "Gateway Timeout (504)",
            ErrorType::TaskDecodeError => "Task decode error",
            ErrorType::TaskPollTimeout => "Task poll timeout",
            ErrorType::TaskMissingResult => "Task missing result",
            ErrorType::NoEngines => "No engines returned",
            ErrorType::ValidationEmpty => "No validated matches",
            ErrorType::BackgroundRemovalError => "Background removal error",
            ErrorType::ConfigurationError => "Configuration error",
            ErrorType::Cancelled => "Cancelled",
        }
    }
}
