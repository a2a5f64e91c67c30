//! Concurrent match validator.
//!
//! Given candidate matches, keeps only those whose main image and page link
//! both answer within a bounded time. One task is spawned per candidate; each
//! checks the image first and only then the link, and each check is raced
//! against its own time window.

mod cache;
mod probe;
mod race;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::app::normalized_web_url;
use crate::config::{Config, IMAGE_CHECK_TIMEOUT_MS, LINK_CHECK_TIMEOUT_MS, MAX_IMAGE_PROBE_SIZE};
use crate::error_handling::AnalysisError;
use crate::normalize::VisualMatch;

// Re-export public API
pub use cache::{ImageCache, MemoryImageCache};
pub use probe::{fetch_image_bytes, is_image, is_link_reachable};
pub use race::{check_within, race_with_timeout};

/// Time windows for the two checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationWindows {
    pub image: Duration,
    pub link: Duration,
}

impl Default for ValidationWindows {
    fn default() -> Self {
        Self {
            image: Duration::from_millis(IMAGE_CHECK_TIMEOUT_MS),
            link: Duration::from_millis(LINK_CHECK_TIMEOUT_MS),
        }
    }
}

impl From<&Config> for ValidationWindows {
    fn from(config: &Config) -> Self {
        Self {
            image: config.image_check_timeout(),
            link: config.link_check_timeout(),
        }
    }
}

/// Filters candidate matches down to the ones that can actually be shown.
#[derive(Clone)]
pub struct MatchValidator {
    client: Arc<reqwest::Client>,
    cache: Arc<dyn ImageCache>,
    windows: ValidationWindows,
    max_image_size: usize,
}

impl MatchValidator {
    pub fn new(
        client: Arc<reqwest::Client>,
        cache: Arc<dyn ImageCache>,
        windows: ValidationWindows,
    ) -> Self {
        Self {
            client,
            cache,
            windows,
            max_image_size: MAX_IMAGE_PROBE_SIZE,
        }
    }

    /// Caps how many bytes an image probe may read before rejecting the image.
    pub fn with_max_image_size(mut self, max_image_size: usize) -> Self {
        self.max_image_size = max_image_size;
        self
    }

    /// Returns the matches whose image and link are both reachable.
    ///
    /// Checks run concurrently, one task per match. The output keeps the input
    /// order and never contains anything that was not in `matches`. A failed
    /// or slow candidate is dropped; it never aborts the batch.
    ///
    /// # Errors
    ///
    /// `AnalysisError::Cancelled` if `cancel` fires; outstanding probes are
    /// aborted and nothing is returned.
    pub async fn validate(
        &self,
        matches: Vec<VisualMatch>,
        cancel: &CancellationToken,
    ) -> Result<Vec<VisualMatch>, AnalysisError> {
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        let total = matches.len();

        let mut tasks = JoinSet::new();
        for (index, candidate) in matches.iter().cloned().enumerate() {
            let validator = self.clone();
            tasks.spawn(async move {
                let keep = validator.check_match(&candidate).await;
                (index, keep)
            });
        }

        let mut kept_indices = Vec::with_capacity(total);
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(AnalysisError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            match joined {
                Some(Ok((index, true))) => kept_indices.push(index),
                Some(Ok((_, false))) => {}
                Some(Err(e)) => debug!("Match check task failed: {}", e),
                None => break,
            }
        }

        kept_indices.sort_unstable();
        let kept: Vec<VisualMatch> = kept_indices
            .into_iter()
            .filter_map(|index| matches.get(index).cloned())
            .collect();
        info!("{} of {} matches passed validation", kept.len(), total);
        Ok(kept)
    }

    /// Image first, then link. A missing URL fails without any request.
    async fn check_match(&self, candidate: &VisualMatch) -> bool {
        if !self.check_image(candidate).await {
            return false;
        }
        self.check_link(candidate).await
    }

    async fn check_image(&self, candidate: &VisualMatch) -> bool {
        let Some(url) = candidate.main_image().and_then(normalized_web_url) else {
            debug!("Rejecting match without image URL: {:?}", candidate.title);
            return false;
        };
        let key = url.as_str();
        if self.cache.contains(key) {
            return true;
        }

        let fetched = race_with_timeout(
            fetch_image_bytes(&self.client, key, self.max_image_size),
            self.windows.image,
        )
        .await;
        match fetched {
            Some(Some(bytes)) => {
                self.cache.store(key, bytes);
                true
            }
            Some(None) => false,
            None => {
                debug!("Image check timed out for {}", key);
                false
            }
        }
    }

    async fn check_link(&self, candidate: &VisualMatch) -> bool {
        let Some(url) = candidate.link.as_deref().and_then(normalized_web_url) else {
            debug!("Rejecting match without link: {:?}", candidate.title);
            return false;
        };
        let reachable = check_within(is_link_reachable(&self.client, url.as_str()), self.windows.link).await;
        if !reachable {
            debug!("Link check failed for {}", url);
        }
        reachable
    }
}
