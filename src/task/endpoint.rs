//! Per-use-case description of a task API.

use std::time::Duration;

use reqwest::RequestBuilder;

use crate::config::{
    CONVERSATION_POLL_INITIAL_DELAY, CONVERSATION_POLL_INTERVAL, CONVERSATION_POLL_MAX_ATTEMPTS,
    REVERSE_SEARCH_POLL_INITIAL_DELAY, REVERSE_SEARCH_POLL_INTERVAL,
    REVERSE_SEARCH_POLL_MAX_ATTEMPTS,
};

/// How requests to a task API are authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAuth {
    /// No credentials.
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// A fixed API key in a named header.
    ApiKey { header: String, key: String },
}

impl TaskAuth {
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            TaskAuth::None => request,
            TaskAuth::Bearer(token) => request.bearer_auth(token),
            TaskAuth::ApiKey { header, key } => request.header(header.as_str(), key.as_str()),
        }
    }
}

/// Where tasks are submitted and looked up, and how the submit answer names the id.
///
/// Status lookups go to `{base_url}{status_path}/{task_id}`.
#[derive(Debug, Clone)]
pub struct TaskEndpoint {
    pub base_url: String,
    pub submit_path: String,
    pub status_path: String,
    /// Preferred key of the task id in the submit response (`id` or `task_id`).
    pub id_field: &'static str,
    pub auth: TaskAuth,
}

impl TaskEndpoint {
    pub fn new(
        base_url: impl Into<String>,
        submit_path: impl Into<String>,
        status_path: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            submit_path: submit_path.into(),
            status_path: status_path.into(),
            id_field: "id",
            auth: TaskAuth::None,
        }
    }

    pub fn with_id_field(mut self, id_field: &'static str) -> Self {
        self.id_field = id_field;
        self
    }

    pub fn with_auth(mut self, auth: TaskAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn submit_url(&self) -> String {
        join_url(&self.base_url, &self.submit_path)
    }

    pub fn status_url(&self, task_id: &str) -> String {
        format!("{}/{}", join_url(&self.base_url, &self.status_path), task_id)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Poll budget: one initial wait, then at most `max_attempts` lookups spaced by `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(initial_delay: Duration, interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            interval,
            max_attempts,
        }
    }

    pub fn conversation() -> Self {
        Self::new(
            CONVERSATION_POLL_INITIAL_DELAY,
            CONVERSATION_POLL_INTERVAL,
            CONVERSATION_POLL_MAX_ATTEMPTS,
        )
    }

    /// Location tasks share the conversation budget.
    pub fn location() -> Self {
        Self::conversation()
    }

    pub fn reverse_search() -> Self {
        Self::new(
            REVERSE_SEARCH_POLL_INITIAL_DELAY,
            REVERSE_SEARCH_POLL_INTERVAL,
            REVERSE_SEARCH_POLL_MAX_ATTEMPTS,
        )
    }

    /// Lower bound on the time spent before giving up.
    pub fn minimum_budget(&self) -> Duration {
        self.initial_delay + self.interval * self.max_attempts.saturating_sub(1)
    }
}
