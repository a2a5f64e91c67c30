// Shared test helpers for mock servers and image payloads.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::sync::Arc;
use std::time::Duration;

use cheaterbuster::analysis::FlowPolicies;
use cheaterbuster::task::{ImageUpload, PollPolicy};

/// A PNG signature followed by padding; enough for type sniffing.
pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

#[allow(dead_code)] // Used by other test files
pub fn png_upload() -> ImageUpload {
    ImageUpload::from_bytes(PNG_BYTES.to_vec())
}

/// Poll policy small enough for real-time tests.
#[allow(dead_code)]
pub fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy::new(
        Duration::from_millis(20),
        Duration::from_millis(20),
        max_attempts,
    )
}

#[allow(dead_code)]
pub fn fast_policies() -> FlowPolicies {
    FlowPolicies {
        conversation: fast_policy(5),
        location: fast_policy(5),
        reverse_search: fast_policy(5),
    }
}

#[allow(dead_code)]
pub fn http_client() -> Arc<reqwest::Client> {
    Arc::new(
        reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build client"),
    )
}
