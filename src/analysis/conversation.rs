//! Conversation screenshot risk analysis.

use log::info;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::backend::AnalysisBackend;
use crate::error_handling::AnalysisError;
use crate::models::{ConversationResult, Flag, ResultMeta};
use crate::task::ImageUpload;

#[derive(Debug, Default, Deserialize)]
struct ConversationTask {
    #[serde(default)]
    result: Option<ConversationPayload>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPayload {
    #[serde(default)]
    risk_score: Option<f64>,
    #[serde(default)]
    red_flags: Option<Vec<String>>,
    #[serde(default)]
    recommendations: Option<Vec<String>>,
    #[serde(default)]
    your_interest: Option<f64>,
    #[serde(default)]
    their_interest: Option<f64>,
    #[serde(default)]
    your_message_count: Option<u32>,
    #[serde(default)]
    their_message_count: Option<u32>,
}

fn percent(value: Option<f64>) -> u8 {
    match value {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

fn flags(texts: Option<Vec<String>>, build: fn(String) -> Flag) -> Vec<Flag> {
    texts
        .unwrap_or_default()
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .map(build)
        .collect()
}

/// Maps a finished conversation task to its domain result.
///
/// # Errors
///
/// * `AnalysisError::Decode` if the body is not a task object
/// * `AnalysisError::Backend` if the task carries only an error text
/// * `AnalysisError::MissingResult` if it carries neither
pub fn conversation_result(
    raw: &Value,
    snapshot: Option<Vec<u8>>,
) -> Result<ConversationResult, AnalysisError> {
    let task: ConversationTask =
        serde_json::from_value(raw.clone()).map_err(AnalysisError::decode)?;
    let Some(payload) = task.result else {
        return match task.error.filter(|e| !e.trim().is_empty()) {
            Some(error) => Err(AnalysisError::Backend(error)),
            None => Err(AnalysisError::MissingResult("No result received from server")),
        };
    };

    Ok(ConversationResult {
        meta: ResultMeta::new(),
        risk_score: percent(payload.risk_score),
        red_flags: flags(payload.red_flags, |t| Flag::red(t)),
        recommendations: flags(payload.recommendations, |t| Flag::recommendation(t)),
        your_message_count: payload.your_message_count.unwrap_or(0),
        their_message_count: payload.their_message_count.unwrap_or(0),
        your_interest: percent(payload.your_interest),
        their_interest: percent(payload.their_interest),
        query_image_snapshot: snapshot,
    })
}

/// Submits the screenshot, waits for the verdict and maps it.
pub async fn run_conversation(
    backend: &dyn AnalysisBackend,
    image: &ImageUpload,
    cancel: &CancellationToken,
) -> Result<ConversationResult, AnalysisError> {
    let raw = backend.conversation(image, cancel).await?;
    let result = conversation_result(&raw, Some(image.bytes.clone()))?;
    info!(
        "Conversation risk {} with {} red flag(s)",
        result.risk_score,
        result.red_flags.len()
    );
    Ok(result)
}
