//! HTTP task client.
//!
//! Generic submit-and-poll primitive against a REST task API. Endpoint paths,
//! authentication, multipart field names and the terminal-status predicate are
//! all supplied by the caller.

mod client;
mod endpoint;
mod predicates;
mod upload;

// Re-export public API
pub(crate) use client::{extract_task_id, truncate_for_log, until_cancelled};
pub use client::TaskClient;
pub use endpoint::{PollPolicy, TaskAuth, TaskEndpoint};
pub use predicates::{is_reverse_search_complete, is_task_finished};
pub use upload::{build_form, ImageUpload};
