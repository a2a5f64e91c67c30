//! Per-match field resolution.
//!
//! Raw matches name their fields inconsistently (`thumbnail_url`, `contentUrl`,
//! nested `image` objects and so on). Resolution fills `thumbnail` and `image`
//! through a fixed fallback chain before the record is typed:
//!
//! 1. explicit alias keys
//! 2. an `img_url` query parameter on the page link
//! 3. cross-filling one from the other
//! 4. unwrapping nested objects to their `link`/`url` fields
//!
//! A match that still has neither image nor thumbnail is dropped.

use serde_json::{Map, Value};

use super::model::VisualMatch;
use crate::app::img_url_query_param;

const THUMBNAIL_KEYS: &[&str] = &[
    "thumbnail",
    "thumbnail_url",
    "thumbnailUrl",
    "thumb",
    "preview",
    "preview_url",
];
const IMAGE_KEYS: &[&str] = &[
    "image",
    "image_url",
    "imageUrl",
    "content_url",
    "contentUrl",
    "original",
    "original_url",
];
const LINK_KEYS: &[&str] = &["link", "url"];
const NESTED_THUMBNAIL_KEYS: &[&str] = &["thumbnail", "thumbnail_url", "preview"];
const NESTED_THUMBNAIL_OBJECT_KEYS: &[&str] = &["link", "url", "thumbnail"];

/// A resolved slot: either a plain string or an object still to be unwrapped.
#[derive(Debug, Clone)]
enum Slot<'a> {
    Text(String),
    Object(&'a Map<String, Value>),
}

/// Whether an item looks like a match record at all.
pub(crate) fn is_likely_match_item(item: &Map<String, Value>) -> bool {
    if ["thumbnail", "image", "link", "url"]
        .iter()
        .any(|key| item.contains_key(*key))
    {
        return true;
    }
    matches!(item.get("image"), Some(Value::Object(image)) if image.contains_key("link") || image.contains_key("url"))
}

/// Returns the elements of `value` if it is an array made only of objects.
pub(crate) fn object_array(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    value.as_array()?.iter().map(Value::as_object).collect()
}

/// Decodes a match array, normalizing each element and dropping the unusable ones.
///
/// Returns `None` when `value` is not an array of objects.
pub(crate) fn decode_match_array(value: &Value, fallback_source: Option<&str>) -> Option<Vec<VisualMatch>> {
    let items = object_array(value)?;
    Some(
        items
            .into_iter()
            .filter_map(|item| normalize_match(item, fallback_source))
            .collect(),
    )
}

/// Resolves and types one raw match.
///
/// # Arguments
///
/// * `item` - The raw match object
/// * `fallback_source` - Site label used when the match has no `source`
///
/// # Returns
///
/// `None` if neither an image nor a thumbnail can be resolved.
pub fn normalize_match(item: &Map<String, Value>, fallback_source: Option<&str>) -> Option<VisualMatch> {
    let (thumbnail, image) = resolve_images(item);

    let nested_image = item.get("image").and_then(Value::as_object);
    let nested_int = |key: &str| nested_image.and_then(|obj| int_field(obj, &[key]));

    let source = text_field(item, &["source"])
        .or_else(|| fallback_source.map(String::from));

    let matched = VisualMatch {
        position: int_field(item, &["position"]),
        title: text_field(item, &["title"]),
        link: text_field(item, LINK_KEYS),
        source,
        source_icon: text_field(item, &["source_icon", "sourceIcon"]),
        thumbnail,
        image,
        thumbnail_width: int_field(item, &["thumbnail_width", "thumbnailWidth"])
            .or_else(|| nested_int("width")),
        thumbnail_height: int_field(item, &["thumbnail_height", "thumbnailHeight"])
            .or_else(|| nested_int("height")),
        image_width: int_field(item, &["image_width", "imageWidth"]).or_else(|| nested_int("width")),
        image_height: int_field(item, &["image_height", "imageHeight"])
            .or_else(|| nested_int("height")),
    };

    if matched.has_image() {
        Some(matched)
    } else {
        None
    }
}

/// Runs the thumbnail/image fallback chain and returns `(thumbnail, image)`.
fn resolve_images(item: &Map<String, Value>) -> (Option<String>, Option<String>) {
    let thumbnail_alias = string_value(item, THUMBNAIL_KEYS);
    let image_alias = string_value(item, IMAGE_KEYS);
    let link = string_value(item, LINK_KEYS);

    let mut thumbnail = slot(item, "thumbnail");
    let mut image = slot(item, "image");

    if thumbnail.is_none() {
        thumbnail = thumbnail_alias.clone().map(Slot::Text);
    }
    if image.is_none() {
        image = image_alias.clone().map(Slot::Text);
    }
    if image.is_none() {
        image = link
            .as_deref()
            .and_then(img_url_query_param)
            .map(Slot::Text);
    }
    if image.is_none() {
        image = thumbnail_alias.map(Slot::Text);
    }
    if thumbnail.is_none() {
        if let Some(alias) = image_alias {
            thumbnail = Some(Slot::Text(alias));
        } else if let Some(Slot::Text(text)) = &image {
            thumbnail = Some(Slot::Text(text.clone()));
        }
    }

    let image = match image {
        Some(Slot::Object(obj)) => {
            if thumbnail.is_none() {
                thumbnail = string_value(obj, NESTED_THUMBNAIL_KEYS).map(Slot::Text);
            }
            string_value(obj, LINK_KEYS)
        }
        Some(Slot::Text(text)) => Some(text),
        None => None,
    };

    let thumbnail = match thumbnail {
        Some(Slot::Object(obj)) => string_value(obj, NESTED_THUMBNAIL_OBJECT_KEYS),
        Some(Slot::Text(text)) => Some(text),
        None => None,
    };

    (thumbnail, image)
}

/// The value under `key` if it is a non-empty string or an object.
fn slot<'a>(item: &'a Map<String, Value>, key: &str) -> Option<Slot<'a>> {
    match item.get(key)? {
        Value::String(text) if !text.is_empty() => Some(Slot::Text(text.clone())),
        Value::Object(obj) => Some(Slot::Object(obj)),
        _ => None,
    }
}

/// First non-empty string under any of `keys`, looking one level into objects
/// for their `link`/`url`.
fn string_value(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(obj) => ["link", "url"].iter().find_map(|inner| match obj.get(*inner) {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        }),
        _ => None,
    })
}

/// First plain string under any of `keys`.
fn text_field(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str).map(String::from))
}

/// First integer under any of `keys`.
fn int_field(item: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| item.get(*key).and_then(Value::as_i64))
}
