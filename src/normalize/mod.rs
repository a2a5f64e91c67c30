//! Response normalizer.
//!
//! Reshapes loosely structured, schema-drifting JSON from several reverse-image
//! search engines into one model: a map from engine name to its
//! [`EngineResult`]. Normalization never fails; unrecognized shapes degrade to
//! empty collections.

mod engines;
mod envelope;
mod fixture;
mod matches;
mod model;

// Re-export public API
pub use engines::Engine;
pub use envelope::{DEFAULT_ENGINE, RESERVED_KEYS};
pub use fixture::{parse_engine_matches, parse_search_fixture};
pub use matches::normalize_match;
pub use model::{EngineResult, TaskEnvelope, VisualMatch};
