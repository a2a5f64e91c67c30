//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use strum_macros::{Display, EnumIter};

use crate::config::constants::*;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// The three analyses a photo can be submitted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// Reverse-image search for places the photo appears online
    Profile,
    /// Risk analysis of a conversation screenshot
    Conversation,
    /// Inference of where a photo was taken
    Location,
}

impl CheckKind {
    /// Step hints shown while the analysis runs, one per progress step.
    pub fn analyze_hints(&self) -> &'static [&'static str; PROGRESS_STEPS] {
        match self {
            CheckKind::Profile => &[
                "Analyzing image content",
                "Checking public signals",
                "Reviewing context check",
                "Preparing your results",
            ],
            CheckKind::Conversation => &[
                "Analyzing message patterns",
                "Detecting suspicious language",
                "Checking conversation context",
                "Preparing insights",
            ],
            CheckKind::Location => &[
                "Analyzing visual details",
                "Detecting landmarks",
                "Checking environment context",
                "Matching public references",
            ],
        }
    }

    pub fn result_title(&self) -> &'static str {
        match self {
            CheckKind::Profile => "Result",
            CheckKind::Conversation => "Conversation insights",
            CheckKind::Location => "Location match found",
        }
    }
}

/// Library configuration.
///
/// Every field can be given on the command line or through the environment.
/// The reverse-image API key is only ever read from the environment (or `.env`).
///
/// # Examples
///
/// ```no_run
/// use cheaterbuster::{CheckKind, Config};
/// use std::path::PathBuf;
///
/// let config = Config {
///     file: PathBuf::from("photo.jpg"),
///     check: CheckKind::Location,
///     mock: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(name = "cheaterbuster", version, about)]
pub struct Config {
    /// Image file to analyze
    pub file: PathBuf,

    /// Which analysis to run
    #[arg(long, value_enum, default_value = "profile")]
    pub check: CheckKind,

    /// Base URL of the analysis backend (auth, conversation, location)
    #[arg(long, env = "CHEATERBUSTER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Base URL of the background removal service
    #[arg(long, env = "CHEATERBUSTER_REMBG_URL", default_value = DEFAULT_REMBG_BASE_URL)]
    pub rembg_base_url: String,

    /// Base URL of the reverse-image search service
    #[arg(long, env = "CHEATERBUSTER_SEARCH_URL", default_value = DEFAULT_SEARCH_BASE_URL)]
    pub search_base_url: String,

    /// API key for the reverse-image search service
    #[arg(long, env = "CHEATERSEARCH_API_KEY", hide_env_values = true)]
    pub search_api_key: Option<String>,

    /// Subscription user id used to register with the analysis backend
    #[arg(long, env = "CHEATERBUSTER_APPHUD_ID")]
    pub apphud_id: Option<String>,

    /// Application bundle id sent with every task
    #[arg(long, default_value = DEFAULT_APP_BUNDLE)]
    pub app_bundle: String,

    /// Webhook URL sent with every task
    #[arg(long, default_value = DEFAULT_WEBHOOK_URL)]
    pub webhook_url: String,

    /// Serve results from bundled fixtures instead of the network
    #[arg(long, env = "CHEATERBUSTER_MOCK")]
    pub mock: bool,

    /// Directory holding the mock fixtures
    #[arg(long, default_value = "fixtures")]
    pub fixtures_dir: PathBuf,

    /// Artificial delay before a fixture is returned, in milliseconds
    #[arg(long, default_value_t = DEFAULT_MOCK_DELAY_MS)]
    pub mock_delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Time window for a match's image to load, in milliseconds
    #[arg(long, default_value_t = IMAGE_CHECK_TIMEOUT_MS)]
    pub image_check_timeout_ms: u64,

    /// Time window for a match's page link to answer, in milliseconds
    #[arg(long, default_value_t = LINK_CHECK_TIMEOUT_MS)]
    pub link_check_timeout_ms: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,
}

impl Config {
    pub fn image_check_timeout(&self) -> Duration {
        Duration::from_millis(self.image_check_timeout_ms)
    }

    pub fn link_check_timeout(&self) -> Duration {
        Duration::from_millis(self.link_check_timeout_ms)
    }

    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from("photo.jpg"),
            check: CheckKind::Profile,
            base_url: DEFAULT_BASE_URL.to_string(),
            rembg_base_url: DEFAULT_REMBG_BASE_URL.to_string(),
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            search_api_key: None,
            apphud_id: None,
            app_bundle: DEFAULT_APP_BUNDLE.to_string(),
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            mock: false,
            fixtures_dir: PathBuf::from("fixtures"),
            mock_delay_ms: DEFAULT_MOCK_DELAY_MS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            image_check_timeout_ms: IMAGE_CHECK_TIMEOUT_MS,
            link_check_timeout_ms: LINK_CHECK_TIMEOUT_MS,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}
