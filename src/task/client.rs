//! Submit-and-poll primitive over a task REST API.
//!
//! The client knows nothing about payload shapes: it posts a multipart body,
//! reads back the task id, then polls the task until a caller-supplied
//! predicate accepts the raw JSON.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::endpoint::{PollPolicy, TaskEndpoint};
use super::upload::{build_form, ImageUpload};
use crate::config::MAX_LOGGED_BODY_CHARS;
use crate::error_handling::AnalysisError;

/// Runs `future` unless `cancel` fires first.
pub(crate) async fn until_cancelled<F>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, AnalysisError>
where
    F: std::future::Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
        output = future => Ok(output),
    }
}

/// Cuts a payload down for debug logging.
pub(crate) fn truncate_for_log(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY_CHARS {
        return body.to_string();
    }
    let cut: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
    format!("{cut}... [truncated]")
}

/// Extracts a task id from a submit response.
///
/// Tries the endpoint's preferred field, then the other common spelling.
/// Numeric ids are accepted and stringified.
pub(crate) fn extract_task_id(body: &Value, preferred: &str) -> Option<String> {
    let fallback = if preferred == "id" { "task_id" } else { "id" };
    [preferred, fallback].iter().find_map(|key| match body.get(*key) {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// HTTP task client sharing one pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct TaskClient {
    client: Arc<reqwest::Client>,
}

impl TaskClient {
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        Self { client }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Submits an image with extra text fields and returns the server-assigned task id.
    ///
    /// # Errors
    ///
    /// * `AnalysisError::Transport` on network failure
    /// * `AnalysisError::BadServerResponse` on a non-2xx status
    /// * `AnalysisError::Decode` if no task id can be read from the body
    /// * `AnalysisError::Cancelled` if `cancel` fires first
    pub async fn submit(
        &self,
        endpoint: &TaskEndpoint,
        file_field: &str,
        image: &ImageUpload,
        fields: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let url = endpoint.submit_url();
        let form = build_form(file_field, image, fields)?;
        debug!(
            "Submitting {} bytes as '{}' to {}",
            image.len(),
            file_field,
            url
        );

        let request = endpoint.auth.apply(self.client.post(&url)).multipart(form);
        let response = until_cancelled(cancel, request.send()).await??;
        let status = response.status();
        let body = until_cancelled(cancel, response.text()).await??;
        debug!("Submit response ({}): {}", status, truncate_for_log(&body));

        if !status.is_success() {
            return Err(AnalysisError::BadServerResponse {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = serde_json::from_str(&body).map_err(AnalysisError::decode)?;
        let task_id = extract_task_id(&parsed, endpoint.id_field).ok_or_else(|| {
            AnalysisError::Decode(format!(
                "submit response has no '{}' field",
                endpoint.id_field
            ))
        })?;
        info!("Task {} submitted to {}", task_id, url);
        Ok(task_id)
    }

    /// Polls a task until `is_complete` accepts its raw JSON.
    ///
    /// Waits `policy.initial_delay`, then performs at most `policy.max_attempts`
    /// lookups spaced by `policy.interval`. A failed lookup (network error,
    /// non-2xx, undecodable body) uses up its attempt and the loop moves on.
    /// There is no wait after the last attempt.
    ///
    /// # Errors
    ///
    /// * `AnalysisError::TimedOut` when the budget runs out
    /// * `AnalysisError::Cancelled` if `cancel` fires during any wait or request
    pub async fn poll<P>(
        &self,
        endpoint: &TaskEndpoint,
        task_id: &str,
        is_complete: P,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError>
    where
        P: Fn(&Value) -> bool,
    {
        let url = endpoint.status_url(task_id);
        until_cancelled(cancel, tokio::time::sleep(policy.initial_delay)).await?;

        for attempt in 1..=policy.max_attempts {
            match self.fetch_status(endpoint, &url, cancel).await {
                Ok(raw) => {
                    if is_complete(&raw) {
                        info!("Task {} complete after {} attempt(s)", task_id, attempt);
                        return Ok(raw);
                    }
                    debug!(
                        "Task {} not complete (attempt {}/{})",
                        task_id, attempt, policy.max_attempts
                    );
                }
                Err(AnalysisError::Cancelled) => return Err(AnalysisError::Cancelled),
                Err(e) => {
                    warn!(
                        "Poll attempt {}/{} for task {} failed ({}): {}",
                        attempt,
                        policy.max_attempts,
                        task_id,
                        e.error_type(),
                        e
                    );
                }
            }

            if attempt < policy.max_attempts {
                until_cancelled(cancel, tokio::time::sleep(policy.interval)).await?;
            }
        }

        Err(AnalysisError::TimedOut {
            task_id: task_id.to_string(),
            attempts: policy.max_attempts,
        })
    }

    async fn fetch_status(
        &self,
        endpoint: &TaskEndpoint,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        let request = endpoint.auth.apply(self.client.get(url));
        let response = until_cancelled(cancel, request.send()).await??;
        let status = response.status();
        let body = until_cancelled(cancel, response.text()).await??;
        debug!("Poll response ({}): {}", status, truncate_for_log(&body));

        if !status.is_success() {
            return Err(AnalysisError::BadServerResponse {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(AnalysisError::decode)
    }
}
