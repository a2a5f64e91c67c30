//! Background removal client.
//!
//! The service answers a multipart upload with raw image bytes, not JSON.
//! Failures come back either as a FastAPI validation document or as plain text.

use log::{debug, info, warn};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::{REMBG_PATH, REMBG_TIMEOUT};
use crate::error_handling::AnalysisError;
use crate::task::{build_form, until_cancelled, ImageUpload};

#[derive(Debug, Deserialize)]
struct ValidationErrorBody {
    #[serde(default)]
    detail: Vec<ValidationErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ValidationErrorItem {
    #[serde(default)]
    msg: Option<String>,
}

/// Reads the message out of a failed response body.
///
/// The first FastAPI `detail[].msg` wins, otherwise the body text itself.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(parsed) = serde_json::from_slice::<ValidationErrorBody>(body) {
        if let Some(msg) = parsed
            .detail
            .first()
            .and_then(|item| item.msg.as_deref())
            .filter(|msg| !msg.is_empty())
        {
            return Some(msg.to_string());
        }
    }
    std::str::from_utf8(body)
        .ok()
        .filter(|text| !text.is_empty())
        .map(String::from)
}

/// Uploads `image` as field `file` and returns the cut-out image.
///
/// # Errors
///
/// * `AnalysisError::BackgroundRemoval` on a non-2xx status
/// * `AnalysisError::Decode` when a 2xx body is empty or not an image
/// * `AnalysisError::Transport` / `Cancelled` as usual
pub async fn remove_background(
    client: &reqwest::Client,
    base_url: &str,
    image: &ImageUpload,
    cancel: &CancellationToken,
) -> Result<ImageUpload, AnalysisError> {
    let url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        REMBG_PATH.trim_start_matches('/')
    );
    let form = build_form("file", image, &[])?;
    info!("Removing background ({} bytes)", image.len());

    let request = client
        .post(&url)
        .header(reqwest::header::ACCEPT, "*/*")
        .timeout(REMBG_TIMEOUT)
        .multipart(form);
    let response = until_cancelled(cancel, request.send()).await??;
    let status = response.status();
    let body = until_cancelled(cancel, response.bytes()).await??;

    if !status.is_success() {
        let message = error_message(&body);
        warn!(
            "Background removal failed with {}: {}",
            status,
            message.as_deref().unwrap_or("<empty body>")
        );
        return Err(AnalysisError::BackgroundRemoval {
            status: status.as_u16(),
            message,
        });
    }

    if !infer::is_image(&body) {
        return Err(AnalysisError::Decode(
            "REMBG returned invalid image data.".to_string(),
        ));
    }
    debug!("Background removal returned {} bytes", body.len());
    Ok(ImageUpload::from_bytes(body.to_vec()))
}
