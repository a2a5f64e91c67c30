//! Task-level envelope decoding.
//!
//! The reverse-image API is inconsistent about where engines live: under
//! `results` as a map, as a single engine, as a bare array, under top-level
//! aliases, inside nested `data`/`result` envelopes, or as arbitrary top-level
//! keys. Each shape is tried by an explicit matcher, in a fixed order; later
//! sources overwrite earlier ones on key collision.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::engines::Engine;
use super::matches::{decode_match_array, object_array};
use super::model::{EngineResult, TaskEnvelope, VisualMatch};

/// Engine name used when the payload does not name one.
pub const DEFAULT_ENGINE: &str = "default";

/// Top-level keys never treated as engine names.
pub const RESERVED_KEYS: &[&str] = &[
    "status",
    "results",
    "visual_matches",
    "image_results",
    "images_results",
    "data",
    "result",
    "task_id",
    "message",
    "error",
];

/// Keys an engine object may carry its match array under, in priority order.
const ENGINE_ARRAY_KEYS: &[&str] = &[
    "visual_matches",
    "image_results",
    "images_results",
    "items",
    "result",
    "data",
];

/// Top-level aliases for a single unnamed engine's match array.
const TOP_LEVEL_ALIASES: &[&str] = &["visual_matches", "image_results", "images_results"];

/// Engines before pruning; an engine may still hold zero matches here.
#[derive(Debug, Default)]
struct RawEnvelope {
    status: BTreeMap<String, String>,
    results: BTreeMap<String, Vec<VisualMatch>>,
    /// Engines named inside a `results` block, whatever they hold.
    reported: BTreeSet<String>,
}

impl RawEnvelope {
    fn merge(&mut self, other: RawEnvelope) {
        self.status.extend(other.status);
        self.results.extend(other.results);
        self.reported.extend(other.reported);
    }
}

impl TaskEnvelope {
    /// Decodes any JSON value into an envelope. Never fails.
    ///
    /// Unrecognized shapes degrade to an empty envelope. Engines left with no
    /// matches are dropped from `results`; `status` keeps every entry and
    /// `empty_engines` remembers the dropped names that came under `results`.
    pub fn decode(raw: &Value) -> TaskEnvelope {
        let decoded = match raw {
            Value::Object(obj) => decode_object(obj),
            Value::Array(_) => {
                let mut envelope = RawEnvelope::default();
                if let Some(matches) = decode_match_array(raw, None) {
                    envelope.results.insert(DEFAULT_ENGINE.to_string(), matches);
                }
                envelope
            }
            _ => RawEnvelope::default(),
        };
        finish(decoded)
    }
}

/// Prunes engines without matches and types the remainder.
pub(crate) fn finish_results(results: BTreeMap<String, Vec<VisualMatch>>) -> BTreeMap<String, EngineResult> {
    results
        .into_iter()
        .filter(|(_, matches)| !matches.is_empty())
        .map(|(name, visual_matches)| {
            let result = EngineResult {
                engine_name: name.clone(),
                visual_matches,
            };
            (name, result)
        })
        .collect()
}

fn finish(raw: RawEnvelope) -> TaskEnvelope {
    let results = finish_results(raw.results);
    let empty_engines = raw
        .reported
        .into_iter()
        .filter(|name| !results.contains_key(name))
        .collect();
    TaskEnvelope {
        status: raw.status,
        results,
        empty_engines,
    }
}

fn decode_object(obj: &Map<String, Value>) -> RawEnvelope {
    let mut envelope = RawEnvelope::default();

    if let Some(status) = obj.get("status").map(decode_status) {
        envelope.status.extend(status);
    }

    if let Some(results) = obj.get("results").and_then(decode_results) {
        envelope.reported.extend(results.keys().cloned());
        envelope.results.extend(results);
    }

    if let Some(matches) = TOP_LEVEL_ALIASES
        .iter()
        .find_map(|key| obj.get(*key).and_then(|v| decode_match_array(v, None)))
    {
        envelope.results.insert(DEFAULT_ENGINE.to_string(), matches);
    }

    for nested_key in ["data", "result"] {
        if let Some(Value::Object(nested)) = obj.get(nested_key) {
            envelope.merge(decode_object(nested));
        }
    }

    for (key, value) in obj {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let fallback = Engine::fallback_source_for(key);
        if let Some(matches) = decode_engine_result(value, fallback) {
            envelope.results.insert(key.clone(), matches);
        } else if let Value::String(status) = value {
            envelope.status.insert(key.clone(), status.clone());
        }
    }

    envelope
}

/// `status` as a string map, or a scalar promoted to the default engine.
///
/// A map with any non-string value is not a status map.
pub(crate) fn decode_status(value: &Value) -> BTreeMap<String, String> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect::<Option<BTreeMap<_, _>>>()
            .unwrap_or_default(),
        Value::String(status) => BTreeMap::from([(DEFAULT_ENGINE.to_string(), status.clone())]),
        _ => BTreeMap::new(),
    }
}

/// `results` as an engine map, else a single engine, else a bare match array.
fn decode_results(value: &Value) -> Option<BTreeMap<String, Vec<VisualMatch>>> {
    decode_engine_map(value)
        .or_else(|| {
            decode_engine_result(value, None)
                .map(|matches| BTreeMap::from([(DEFAULT_ENGINE.to_string(), matches)]))
        })
        .or_else(|| {
            decode_match_array(value, None)
                .map(|matches| BTreeMap::from([(DEFAULT_ENGINE.to_string(), matches)]))
        })
}

/// An object whose every value decodes as an engine result.
fn decode_engine_map(value: &Value) -> Option<BTreeMap<String, Vec<VisualMatch>>> {
    value
        .as_object()?
        .iter()
        .map(|(name, engine)| {
            decode_engine_result(engine, Engine::fallback_source_for(name))
                .map(|matches| (name.clone(), matches))
        })
        .collect()
}

/// One engine's matches: a bare match array, or an object carrying one under a
/// known key. Any object is an engine result, possibly with no matches.
fn decode_engine_result(value: &Value, fallback_source: Option<&str>) -> Option<Vec<VisualMatch>> {
    if object_array(value).is_some() {
        return decode_match_array(value, fallback_source);
    }
    let obj = value.as_object()?;
    let matches = ENGINE_ARRAY_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(|v| decode_match_array(v, fallback_source)))
        .unwrap_or_default();
    Some(matches)
}
