//! Typed records produced by the normalizer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One candidate hit: a photo appearing elsewhere on the web.
///
/// Every field is optional because upstream payloads vary. After
/// normalization at least one of `image`/`thumbnail` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualMatch {
    pub position: Option<i64>,
    pub title: Option<String>,
    /// Page URL.
    pub link: Option<String>,
    /// Site label.
    pub source: Option<String>,
    /// Favicon URL.
    pub source_icon: Option<String>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub thumbnail_width: Option<i64>,
    pub thumbnail_height: Option<i64>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
}

impl VisualMatch {
    /// The image shown for this match: the thumbnail, else the full image.
    pub fn main_image(&self) -> Option<&str> {
        non_empty(self.thumbnail.as_deref()).or_else(|| non_empty(self.image.as_deref()))
    }

    pub fn has_image(&self) -> bool {
        self.main_image().is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// One engine's contribution to a multi-engine task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineResult {
    pub engine_name: String,
    pub visual_matches: Vec<VisualMatch>,
}

/// Normalized view of a reverse-image task response.
///
/// Engines are discovered per response. `results` only holds engines with at
/// least one match; `status` keeps every engine that reported one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskEnvelope {
    pub status: BTreeMap<String, String>,
    pub results: BTreeMap<String, EngineResult>,
    /// Engines that answered under `results` without a usable match.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub empty_engines: BTreeSet<String>,
}

impl TaskEnvelope {
    /// Engine names seen in `status` or `results`, sorted. Engines whose
    /// matches were all dropped still count.
    pub fn engine_names(&self) -> BTreeSet<&str> {
        self.status
            .keys()
            .chain(self.results.keys())
            .chain(self.empty_engines.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn has_engines(&self) -> bool {
        !self.status.is_empty() || !self.results.is_empty() || !self.empty_engines.is_empty()
    }

    /// Whether any engine answered under `results`, usable matches or not.
    pub fn has_results(&self) -> bool {
        !self.results.is_empty() || !self.empty_engines.is_empty()
    }

    /// All matches, engines in name order, each engine's matches in payload order.
    pub fn all_matches(&self) -> Vec<VisualMatch> {
        self.results
            .values()
            .flat_map(|engine| engine.visual_matches.iter().cloned())
            .collect()
    }

    pub fn match_count(&self) -> usize {
        self.results.values().map(|e| e.visual_matches.len()).sum()
    }
}
