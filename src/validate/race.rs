//! Race an operation against a timer.

use std::future::Future;
use std::time::Duration;

/// Runs `operation` for at most `limit`.
///
/// Returns `None` if the timer wins. The losing operation is dropped, which
/// cancels any request it still has in flight.
pub async fn race_with_timeout<F>(operation: F, limit: Duration) -> Option<F::Output>
where
    F: Future,
{
    tokio::time::timeout(limit, operation).await.ok()
}

/// [`race_with_timeout`] for boolean checks: losing the race counts as `false`.
pub async fn check_within<F>(check: F, limit: Duration) -> bool
where
    F: Future<Output = bool>,
{
    race_with_timeout(check, limit).await.unwrap_or(false)
}
