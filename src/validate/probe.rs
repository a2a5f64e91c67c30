//! Reachability probes for a match's image and page link.
//!
//! Probes never fail: every error is logged at debug level and reported as
//! unreachable.

use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};

use crate::config::HTTP_STATUS_METHOD_NOT_ALLOWED;

/// Streams image bytes from a URL with a size limit.
///
/// Returns `None` if the response is non-success, exceeds the size cap, is
/// empty, or is not a recognizable image.
pub async fn fetch_image_bytes(client: &Client, url: &str, max_size: usize) -> Option<Vec<u8>> {
    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            log::debug!("Image probe failed for {}: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        log::debug!("Image probe returned {} for {}", response.status(), url);
        return None;
    }

    let mut stream = response.bytes_stream();
    let mut buf = Vec::with_capacity(max_size.min(64 * 1024));

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Image stream error for {}: {}", url, e);
                return None;
            }
        };

        if buf.len() + chunk.len() > max_size {
            log::debug!(
                "Image exceeds {}MB limit for {} (aborting at {} bytes)",
                max_size / (1024 * 1024),
                url,
                buf.len() + chunk.len()
            );
            return None;
        }

        buf.extend_from_slice(&chunk);
    }

    if !is_image(&buf) {
        log::debug!("Image probe for {} returned {} non-image bytes", url, buf.len());
        return None;
    }

    Some(buf)
}

/// Whether the bytes start with a known image signature.
pub fn is_image(bytes: &[u8]) -> bool {
    !bytes.is_empty() && infer::is_image(bytes)
}

/// Whether a page answers.
///
/// Sends `HEAD` first. Any 2xx/3xx is reachable; any other status except 405
/// is not. On 405 or a failed `HEAD`, retries with a `GET` asking for only the
/// first byte.
pub async fn is_link_reachable(client: &Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) => {
            let status = response.status();
            if is_reachable_status(status) {
                return true;
            }
            if status.as_u16() != HTTP_STATUS_METHOD_NOT_ALLOWED {
                log::debug!("Link probe HEAD returned {} for {}", status, url);
                return false;
            }
        }
        Err(e) => {
            log::debug!("Link probe HEAD failed for {}: {}", url, e);
        }
    }

    match client.get(url).header(RANGE, "bytes=0-0").send().await {
        Ok(response) => {
            let status = response.status();
            if !is_reachable_status(status) {
                log::debug!("Link probe GET returned {} for {}", status, url);
            }
            is_reachable_status(status)
        }
        Err(e) => {
            log::debug!("Link probe GET failed for {}: {}", url, e);
            false
        }
    }
}

fn is_reachable_status(status: StatusCode) -> bool {
    (200..=399).contains(&status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_signatures() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        assert!(is_image(&png));
        assert!(is_image(&jpeg));
        assert!(!is_image(b"<html></html>"));
        assert!(!is_image(&[]));
    }

    #[test]
    fn test_reachable_status_range() {
        assert!(is_reachable_status(StatusCode::OK));
        assert!(is_reachable_status(StatusCode::PARTIAL_CONTENT));
        assert!(is_reachable_status(StatusCode::FOUND));
        assert!(!is_reachable_status(StatusCode::NOT_FOUND));
        assert!(!is_reachable_status(StatusCode::METHOD_NOT_ALLOWED));
    }
}
