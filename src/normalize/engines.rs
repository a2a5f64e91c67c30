//! Engines with known native payload layouts.

use strum_macros::{Display, EnumIter, EnumString};

/// A reverse-image search engine aggregated by the task API.
///
/// Each engine names its match array differently, so array lookup uses a
/// per-engine key priority. The order encodes real payload quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Engine {
    Google,
    Yandex,
    Bing,
}

impl Engine {
    /// Keys searched, in order, for the engine's match array.
    pub fn preferred_keys(&self) -> &'static [&'static str] {
        match self {
            Engine::Google => &[
                "visual_matches",
                "image_results",
                "images_results",
                "items",
                "result",
                "data",
            ],
            Engine::Yandex => &[
                "image_results",
                "images_results",
                "visual_matches",
                "items",
                "result",
                "data",
            ],
            Engine::Bing => &[
                "images_results",
                "image_results",
                "visual_matches",
                "items",
                "result",
                "data",
            ],
        }
    }

    /// Site label used when a match carries no `source`.
    pub fn fallback_source(&self) -> &'static str {
        match self {
            Engine::Google => "Google",
            Engine::Yandex => "Yandex",
            Engine::Bing => "Bing",
        }
    }

    /// Fallback label for a dynamically discovered engine name, if it is a known engine.
    pub fn fallback_source_for(name: &str) -> Option<&'static str> {
        name.parse::<Engine>().ok().map(|e| e.fallback_source())
    }
}
