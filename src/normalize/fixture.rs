//! Ingestion of bundled reverse-image fixtures.
//!
//! Fixtures are captured from the engines' native APIs rather than from the
//! task API, so each known engine's match array is located by that engine's
//! key priority, with a recursive search as the last resort. Payloads with no
//! recognizable engine fall back to [`TaskEnvelope::decode`].

use std::collections::BTreeMap;

use log::debug;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

use super::engines::Engine;
use super::envelope::{decode_status, finish_results};
use super::matches::{is_likely_match_item, normalize_match, object_array};
use super::model::{TaskEnvelope, VisualMatch};

/// Parses a multi-engine fixture into an envelope.
pub fn parse_search_fixture(root: &Value) -> TaskEnvelope {
    let Some(root_obj) = root.as_object() else {
        return TaskEnvelope::decode(root);
    };
    let Some(results) = root_obj.get("results").and_then(Value::as_object) else {
        return TaskEnvelope::decode(root);
    };

    let empty = Map::new();
    let mut engines: BTreeMap<String, Vec<VisualMatch>> = BTreeMap::new();
    for engine in Engine::iter() {
        let payload = results
            .get(&engine.to_string())
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let matches = parse_engine_matches(engine, payload);
        if !matches.is_empty() {
            engines.insert(engine.to_string(), matches);
        }
    }

    if engines.is_empty() {
        return TaskEnvelope::decode(root);
    }

    TaskEnvelope {
        status: root_obj.get("status").map(decode_status).unwrap_or_default(),
        results: finish_results(engines),
        empty_engines: Default::default(),
    }
}

/// Normalizes one engine's native payload.
pub fn parse_engine_matches(engine: Engine, payload: &Map<String, Value>) -> Vec<VisualMatch> {
    let items = extract_match_items(payload, engine.preferred_keys());
    if items.is_empty() {
        debug!(
            "No match items for {} (payload keys: [{}], preferred keys: {:?})",
            engine,
            payload.keys().map(String::as_str).collect::<Vec<_>>().join(", "),
            engine.preferred_keys()
        );
        return Vec::new();
    }

    let matches: Vec<VisualMatch> = items
        .iter()
        .filter_map(|item| normalize_match(item, Some(engine.fallback_source())))
        .collect();
    debug!(
        "Parsed {} of {} {} match items",
        matches.len(),
        items.len(),
        engine
    );
    matches
}

/// Locates the raw match array: preferred keys first (one level of nesting),
/// then the first array in the tree that looks like matches.
fn extract_match_items<'a>(payload: &'a Map<String, Value>, preferred: &[&str]) -> Vec<&'a Map<String, Value>> {
    for key in preferred {
        let Some(value) = payload.get(*key) else {
            continue;
        };
        if let Some(items) = non_empty_object_array(value) {
            return items;
        }
        if let Value::Object(nested) = value {
            if let Some(items) = preferred
                .iter()
                .find_map(|nested_key| nested.get(*nested_key).and_then(non_empty_object_array))
            {
                return items;
            }
        }
    }

    payload
        .values()
        .find_map(find_first_candidate_array)
        .unwrap_or_default()
}

fn non_empty_object_array(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    object_array(value).filter(|items| !items.is_empty())
}

fn find_first_candidate_array(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    if let Some(items) = object_array(value) {
        if items.iter().any(|item| is_likely_match_item(item)) {
            return Some(items);
        }
    }
    match value {
        Value::Object(obj) => obj.values().find_map(find_first_candidate_array),
        Value::Array(children) => children.iter().find_map(find_first_candidate_array),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_priority_order() {
        // Bing prefers images_results over visual_matches
        let payload = json!({
            "visual_matches": [{"thumbnail": "https://v.example/t.jpg"}],
            "images_results": [{"thumbnail": "https://i.example/t.jpg"}, {"thumbnail": "https://i.example/u.jpg"}]
        });
        let obj = payload.as_object().unwrap();
        assert_eq!(parse_engine_matches(Engine::Bing, obj).len(), 2);
        assert_eq!(parse_engine_matches(Engine::Google, obj).len(), 1);
    }

    #[test]
    fn test_empty_preferred_array_skipped() {
        let payload = json!({
            "visual_matches": [],
            "items": [{"link": "https://a.example?img_url=https://b.example/c.jpg"}]
        });
        let matches = parse_engine_matches(Engine::Google, payload.as_object().unwrap());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].image.as_deref(), Some("https://b.example/c.jpg"));
        assert_eq!(matches[0].source.as_deref(), Some("Google"));
    }

    #[test]
    fn test_one_level_nested_lookup() {
        let payload = json!({"data": {"image_results": [{"thumbnail": "https://a.example/t.jpg"}]}});
        let matches = parse_engine_matches(Engine::Yandex, payload.as_object().unwrap());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source.as_deref(), Some("Yandex"));
    }

    #[test]
    fn test_recursive_candidate_search() {
        let payload = json!({
            "search_metadata": {"id": "x"},
            "sections": [{"name": "similar", "entries": [{"title": "a"}, {"url": "https://a.example", "thumbnail": "https://a.example/t.jpg"}]}]
        });
        let matches = parse_engine_matches(Engine::Google, payload.as_object().unwrap());
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_parse_search_fixture() {
        let root = json!({
            "status": {"google": "completed", "bing": "completed", "yandex": "completed"},
            "results": {
                "google": {"visual_matches": [{"link": "https://g.example", "thumbnail": "https://g.example/t.jpg"}]},
                "bing": {"images_results": []},
                "yandex": {"image_results": [{"url": "https://y.example", "image": {"url": "https://y.example/i.jpg"}}]}
            }
        });
        let envelope = parse_search_fixture(&root);
        assert_eq!(envelope.results.len(), 2);
        assert!(envelope.results.contains_key("google"));
        assert!(envelope.results.contains_key("yandex"));
        assert_eq!(envelope.status.len(), 3);
    }

    #[test]
    fn test_fixture_without_known_engines_falls_back() {
        let root = json!({"results": {"tineye": [{"thumbnail": "https://t.example/t.jpg"}]}});
        let envelope = parse_search_fixture(&root);
        assert_eq!(envelope.results["tineye"].visual_matches.len(), 1);
    }
}
