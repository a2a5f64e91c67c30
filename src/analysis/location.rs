//! Photo location inference.

use log::info;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::backend::AnalysisBackend;
use crate::error_handling::AnalysisError;
use crate::models::{LocationResult, ResultMeta};
use crate::task::ImageUpload;

#[derive(Debug, Default, Deserialize)]
struct LocationTask {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Maps a finished location task to its domain result.
///
/// Only a non-blank string `result` counts as an answer.
pub fn location_result(
    raw: &Value,
    snapshot: Option<Vec<u8>>,
) -> Result<LocationResult, AnalysisError> {
    let task: LocationTask = serde_json::from_value(raw.clone()).map_err(AnalysisError::decode)?;
    let text = task
        .result
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty());

    match (text, task.error.filter(|e| !e.trim().is_empty())) {
        (Some(text), _) => Ok(LocationResult {
            meta: ResultMeta::new(),
            location_text: text.to_string(),
            query_snapshot: snapshot,
        }),
        (None, Some(error)) => Err(AnalysisError::Backend(error)),
        (None, None) => Err(AnalysisError::MissingResult(
            "No location result received from server",
        )),
    }
}

pub async fn run_location(
    backend: &dyn AnalysisBackend,
    image: &ImageUpload,
    cancel: &CancellationToken,
) -> Result<LocationResult, AnalysisError> {
    let raw = backend.location(image, cancel).await?;
    let result = location_result(&raw, Some(image.bytes.clone()))?;
    info!("Location resolved: {}", result.location_text);
    Ok(result)
}
