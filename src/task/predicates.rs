//! Terminal-status predicates for the two task APIs.
//!
//! The two backends disagree on how completion is reported: analysis tasks
//! carry one scalar status, reverse-image tasks carry per-engine statuses and
//! may fill `results` before every engine reports done.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::{ENGINE_DONE_STATUSES, TASK_STATUS_FINISHED};
use crate::normalize::TaskEnvelope;

/// Conversation and location tasks: `status == "finished"`, compared exactly.
pub fn is_task_finished(raw: &Value) -> bool {
    raw.get("status").and_then(Value::as_str) == Some(TASK_STATUS_FINISHED)
}

/// Reverse-image tasks: complete as soon as `results` names any engine, even
/// one with no usable matches, or when every per-engine status is
/// `completed`/`success` (case-insensitive).
///
/// Engines pruned for lacking usable matches still count as results. An
/// empty status map does not count as "every engine done".
pub fn is_reverse_search_complete(raw: &Value) -> bool {
    let envelope = TaskEnvelope::decode(raw);
    envelope.has_results() || all_engines_done(&envelope.status)
}

fn all_engines_done(status: &BTreeMap<String, String>) -> bool {
    !status.is_empty() && status.values().all(|status| is_engine_done(status))
}

fn is_engine_done(status: &str) -> bool {
    let status = status.trim();
    ENGINE_DONE_STATUSES
        .iter()
        .any(|done| status.eq_ignore_ascii_case(done))
}
