//! Configuration constants.
//!
//! This module defines the endpoint paths, polling budgets, probe timeouts and
//! other operational parameters used throughout the pipeline.

use std::time::Duration;

// Backend locations (defaults, overridable through `Config`)
pub const DEFAULT_BASE_URL: &str = "https://cheaterbuster.webberapp.shop";
pub const DEFAULT_REMBG_BASE_URL: &str = "https://rmbgr.webberapp.shop";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.cheatersearch.space";
pub const DEFAULT_APP_BUNDLE: &str = "com.kam.5044cheater";
/// Placeholder webhook sent with every task; the app never receives callbacks.
pub const DEFAULT_WEBHOOK_URL: &str = "https://example.com/";

// Analysis backend paths
pub const USER_REGISTER_PATH: &str = "/api/user";
pub const USER_AUTHORIZE_PATH: &str = "/api/user/authorize";
pub const CONVERSATION_SUBMIT_PATH: &str = "/api/task";
pub const LOCATION_SUBMIT_PATH: &str = "/api/task/place";
/// Task status lookups for both conversation and location tasks: `GET {base}/api/task/{id}`.
pub const ANALYSIS_TASK_PATH: &str = "/api/task";

// Reverse-image search service paths
pub const SEARCH_SUBMIT_PATH: &str = "/task";
pub const SEARCH_TASK_PATH: &str = "/task";
pub const SEARCH_API_KEY_HEADER: &str = "X-Api-Key";

// Background removal service
pub const REMBG_PATH: &str = "/rembg";
/// Background removal can take a while on large photos.
pub const REMBG_TIMEOUT: Duration = Duration::from_secs(60);

// Polling budgets
/// Conversation flow: wait 2s, then poll once per second, 60 attempts (~62s).
pub const CONVERSATION_POLL_INITIAL_DELAY: Duration = Duration::from_secs(2);
pub const CONVERSATION_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const CONVERSATION_POLL_MAX_ATTEMPTS: u32 = 60;
/// Reverse-image flow: wait 5s, then poll once per second, 120 attempts (~125s).
pub const REVERSE_SEARCH_POLL_INITIAL_DELAY: Duration = Duration::from_secs(5);
pub const REVERSE_SEARCH_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const REVERSE_SEARCH_POLL_MAX_ATTEMPTS: u32 = 120;

/// Terminal status of conversation and location tasks. Compared exactly.
pub const TASK_STATUS_FINISHED: &str = "finished";
/// Per-engine statuses that count as done for the reverse-image task (case-insensitive).
pub const ENGINE_DONE_STATUSES: &[&str] = &["completed", "success"];

// Match validation
/// Default time window for the main image of a match to load.
pub const IMAGE_CHECK_TIMEOUT_MS: u64 = 2500;
/// Default time window for the page link of a match to answer.
pub const LINK_CHECK_TIMEOUT_MS: u64 = 2000;
/// Image probes stop reading after this many bytes; anything larger is rejected.
pub const MAX_IMAGE_PROBE_SIZE: usize = 15 * 1024 * 1024;

// Progress reporter cadence
pub const PROGRESS_STEP_INTERVAL: Duration = Duration::from_millis(1500);
pub const PROGRESS_FAST_FORWARD_INTERVAL: Duration = Duration::from_millis(200);
/// Number of hint steps shown while any analysis is running.
pub const PROGRESS_STEPS: usize = 4;

// Mock mode
pub const MOCK_CONVERSATION_FIXTURE: &str = "mockCheater.json";
pub const MOCK_LOCATION_FIXTURE: &str = "mockLocation.json";
pub const MOCK_REVERSE_SEARCH_FIXTURE: &str = "mockCheaterBuster.json";
pub const DEFAULT_MOCK_DELAY_MS: u64 = 2000;

// HTTP client
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

/// Raw payloads logged at debug level are cut to this many characters.
pub const MAX_LOGGED_BODY_CHARS: usize = 2000;

// Retry strategy (authentication calls only; submit and poll are never retried)
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 5;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const HTTP_STATUS_METHOD_NOT_ALLOWED: u16 = 405;
