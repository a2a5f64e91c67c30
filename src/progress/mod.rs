//! Progress reporter.
//!
//! Drives a step indicator on a fixed cadence while the real operation runs,
//! then snaps to completion once the operation reports back. Perceived progress
//! is decoupled from the actual latency, which ranges from seconds to minutes.
//!
//! The reporter and the operation share exactly one signal: a oneshot raised
//! by [`ProgressHandle::finish`] when the real result (success or failure) is
//! known. On that signal the ticker fast-forwards through the remaining steps
//! and then publishes the terminal index, one past the last step.

use std::time::Duration;

use log::trace;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{PROGRESS_FAST_FORWARD_INTERVAL, PROGRESS_STEP_INTERVAL};

/// Where the ticker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Advancing,
    FastForwarding,
    Finished,
}

/// One published progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    /// Current step, `0..total_steps`, or `total_steps` once finished.
    pub index: usize,
    pub total_steps: usize,
    pub phase: ProgressPhase,
}

impl ProgressState {
    pub fn is_finished(&self) -> bool {
        self.phase == ProgressPhase::Finished
    }
}

/// Ticker configuration. Call [`ProgressReporter::spawn`] to start it.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    steps: usize,
    step_interval: Duration,
    fast_forward_interval: Duration,
}

impl ProgressReporter {
    pub fn new(steps: usize) -> Self {
        Self {
            steps: steps.max(1),
            step_interval: PROGRESS_STEP_INTERVAL,
            fast_forward_interval: PROGRESS_FAST_FORWARD_INTERVAL,
        }
    }

    pub fn with_intervals(mut self, step_interval: Duration, fast_forward_interval: Duration) -> Self {
        self.step_interval = step_interval;
        self.fast_forward_interval = fast_forward_interval;
        self
    }

    /// Starts the ticker on the runtime and returns its handle.
    ///
    /// Cancelling `cancel`, or dropping the handle without calling
    /// [`ProgressHandle::finish`], stops the ticker where it is.
    pub fn spawn(self, cancel: CancellationToken) -> ProgressHandle {
        let initial = ProgressState {
            index: 0,
            total_steps: self.steps,
            phase: ProgressPhase::Advancing,
        };
        let (state_tx, state_rx) = watch::channel(initial);
        let (done_tx, done_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(done_rx, state_tx, cancel));
        ProgressHandle {
            completion: Some(done_tx),
            state: state_rx,
            task,
        }
    }

    async fn run(
        self,
        mut done_rx: oneshot::Receiver<()>,
        state_tx: watch::Sender<ProgressState>,
        cancel: CancellationToken,
    ) {
        let total = self.steps;
        let last = total - 1;
        let mut signalled = false;
        let publish = |index: usize, phase: ProgressPhase| {
            trace!("Progress {}/{} ({:?})", index, total, phase);
            state_tx.send_replace(ProgressState {
                index,
                total_steps: total,
                phase,
            });
        };

        for next in 1..=last {
            if !signalled {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    received = &mut done_rx => match received {
                        Ok(()) => signalled = true,
                        Err(_) => return,
                    },
                    _ = tokio::time::sleep(self.step_interval) => {}
                }
            }
            if signalled {
                publish(next - 1, ProgressPhase::FastForwarding);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(self.fast_forward_interval) => {}
                }
                publish(next, ProgressPhase::FastForwarding);
            } else {
                publish(next, ProgressPhase::Advancing);
            }
        }

        if !signalled {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                received = &mut done_rx => {
                    if received.is_err() {
                        return;
                    }
                }
            }
        }

        publish(total, ProgressPhase::Finished);
    }
}

/// Owner side of a running ticker.
#[derive(Debug)]
pub struct ProgressHandle {
    completion: Option<oneshot::Sender<()>>,
    state: watch::Receiver<ProgressState>,
    task: JoinHandle<()>,
}

impl ProgressHandle {
    /// The latest published state.
    pub fn state(&self) -> ProgressState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.state.clone()
    }

    /// Signals that the real operation has finished. Idempotent.
    pub fn finish(&mut self) {
        if let Some(done) = self.completion.take() {
            // The ticker may already have stopped on cancellation
            let _ = done.send(());
        }
    }

    /// Signals completion and waits for the ticker to publish its last state.
    pub async fn complete(mut self) -> ProgressState {
        self.finish();
        if let Err(e) = (&mut self.task).await {
            log::debug!("Progress task ended abnormally: {}", e);
        }
        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    async fn collect_until_finished(mut rx: watch::Receiver<ProgressState>) -> Vec<ProgressState> {
        let mut seen = vec![*rx.borrow_and_update()];
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            seen.push(state);
            if state.is_finished() {
                break;
            }
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn test_holds_at_last_step_until_finish() {
        let mut handle = ProgressReporter::new(4).spawn(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(30)).await;
        let state = handle.state();
        assert_eq!(state.index, 3);
        assert!(!state.is_finished());

        handle.finish();
        let state = handle.complete().await;
        assert_eq!(state.index, 4);
        assert!(state.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nominal_cadence() {
        let handle = ProgressReporter::new(4).spawn(CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(handle.state().index, 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.state().index, 2);
        assert_eq!(handle.state().phase, ProgressPhase::Advancing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_forward_after_early_finish() {
        let mut handle = ProgressReporter::new(4).spawn(CancellationToken::new());
        let rx = handle.subscribe();
        let collector = tokio::spawn(collect_until_finished(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let start = Instant::now();
        handle.finish();
        let state = handle.complete().await;
        // Three remaining steps at the fast cadence
        assert_eq!(start.elapsed(), Duration::from_millis(600));
        assert_eq!(state.index, 4);

        let seen = collector.await.unwrap();
        assert!(seen.windows(2).all(|w| w[0].index <= w[1].index));
        assert_eq!(seen.iter().filter(|s| s.is_finished()).count(), 1);
        assert!(seen.iter().any(|s| s.phase == ProgressPhase::FastForwarding));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_finishes_without_signal() {
        let cancel = CancellationToken::new();
        let handle = ProgressReporter::new(4).spawn(cancel.clone());
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(handle.state().index, 3);
        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.state().is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_ticker() {
        let handle = ProgressReporter::new(4).spawn(CancellationToken::new());
        let rx = handle.subscribe();
        drop(handle);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!rx.borrow().is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_step_reporter() {
        let mut handle = ProgressReporter::new(0).spawn(CancellationToken::new());
        assert_eq!(handle.state().total_steps, 1);
        handle.finish();
        let state = handle.complete().await;
        assert_eq!(state.index, 1);
    }
}
