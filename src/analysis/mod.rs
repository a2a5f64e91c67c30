//! Analysis orchestrators.
//!
//! Each flow is authenticate → submit → poll → decode → map, with the profile
//! flow adding background removal before and validation after the search.
//! [`Analyzer`] runs one flow with the progress reporter alongside and turns
//! any failure into an inline message.

mod auth;
mod backend;
mod conversation;
mod location;
mod profile;
mod rembg;

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::{
    CheckKind, PROGRESS_FAST_FORWARD_INTERVAL, PROGRESS_STEPS, PROGRESS_STEP_INTERVAL,
};
use crate::error_handling::AnalysisError;
use crate::models::{AnalysisResult, ResultSink};
use crate::progress::{ProgressReporter, ProgressState};
use crate::task::ImageUpload;
use crate::validate::MatchValidator;

// Re-export public API
pub use auth::{AuthService, CredentialStore, Credentials, MemoryCredentialStore};
pub use backend::{AnalysisBackend, FixtureBackend, FlowPolicies, LiveBackend, ServiceTargets};
pub use conversation::{conversation_result, run_conversation};
pub use location::{location_result, run_location};
pub use profile::{candidate_matches, person_from_match, run_profile};
pub use rembg::remove_background;

/// What a flow hands to the presentation layer: a result, or a message in its place.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub kind: CheckKind,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// Runs flows against one backend.
pub struct Analyzer {
    backend: Arc<dyn AnalysisBackend>,
    validator: MatchValidator,
    sink: Option<Arc<dyn ResultSink>>,
    step_interval: Duration,
    fast_forward_interval: Duration,
}

impl Analyzer {
    pub fn new(backend: Arc<dyn AnalysisBackend>, validator: MatchValidator) -> Self {
        Self {
            backend,
            validator,
            sink: None,
            step_interval: PROGRESS_STEP_INTERVAL,
            fast_forward_interval: PROGRESS_FAST_FORWARD_INTERVAL,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_progress_intervals(mut self, step: Duration, fast_forward: Duration) -> Self {
        self.step_interval = step;
        self.fast_forward_interval = fast_forward;
        self
    }

    /// Runs one flow without progress reporting.
    pub async fn run_flow(
        &self,
        kind: CheckKind,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let backend = self.backend.as_ref();
        match kind {
            CheckKind::Profile => run_profile(backend, &self.validator, image, cancel)
                .await
                .map(AnalysisResult::Profile),
            CheckKind::Conversation => run_conversation(backend, image, cancel)
                .await
                .map(AnalysisResult::Conversation),
            CheckKind::Location => run_location(backend, image, cancel)
                .await
                .map(AnalysisResult::Location),
        }
    }

    /// Runs one flow with the progress reporter alongside.
    ///
    /// `on_progress` sees every published state. The reporter is told to
    /// finish as soon as the flow returns, whether it succeeded or not, and
    /// this call returns only after the terminal state has been delivered
    /// (or the reporter was cancelled).
    pub async fn analyze<F>(
        &self,
        kind: CheckKind,
        image: &ImageUpload,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> AnalysisOutcome
    where
        F: FnMut(ProgressState),
    {
        let mut handle = ProgressReporter::new(PROGRESS_STEPS)
            .with_intervals(self.step_interval, self.fast_forward_interval)
            .spawn(cancel.child_token());
        let mut updates = handle.subscribe();
        on_progress(*updates.borrow_and_update());

        let flow = self.run_flow(kind, image, cancel);
        tokio::pin!(flow);
        let outcome = loop {
            tokio::select! {
                outcome = &mut flow => break outcome,
                changed = updates.changed() => match changed {
                    Ok(()) => on_progress(*updates.borrow_and_update()),
                    Err(_) => break (&mut flow).await,
                },
            }
        };

        handle.finish();
        while updates.changed().await.is_ok() {
            let state = *updates.borrow_and_update();
            on_progress(state);
            if state.is_finished() {
                break;
            }
        }

        self.into_outcome(kind, outcome)
    }

    fn into_outcome(
        &self,
        kind: CheckKind,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> AnalysisOutcome {
        match outcome {
            Ok(result) => {
                info!("{} analysis finished", kind);
                if let Some(sink) = &self.sink {
                    if let Err(e) = sink.save(&result) {
                        warn!("Failed to save {} result: {:#}", kind, e);
                    }
                }
                AnalysisOutcome {
                    kind,
                    result: Some(result),
                    error: None,
                }
            }
            Err(e) => {
                error!("{} analysis failed ({}): {}", kind, e.error_type(), e);
                AnalysisOutcome {
                    kind,
                    result: None,
                    error: Some(e.user_message()),
                }
            }
        }
    }
}
