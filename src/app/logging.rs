//! Progress logging utilities.

use log::info;

use crate::progress::ProgressState;

/// Logs one progress update of a running analysis.
///
/// # Arguments
///
/// * `label` - What is running (the analysis kind)
/// * `state` - The progress state just published by the reporter
/// * `hints` - Step hints shown to the user, one per step
pub fn log_progress(label: &str, state: ProgressState, hints: &[&str]) {
    let total = state.total_steps;
    if state.is_finished() {
        info!("[{label}] {total}/{total} done");
        return;
    }
    let hint = hints.get(state.index).copied().unwrap_or("Working");
    info!(
        "[{label}] step {}/{} ({:?}): {}",
        state.index + 1,
        total,
        state.phase,
        hint
    );
}
