//! Reverse-image profile search: background removal, multi-engine search,
//! validation of every candidate, then mapping to people.

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use super::backend::AnalysisBackend;
use crate::app::{favicon_url, normalized_web_url, DEFAULT_FAVICON_SIZE};
use crate::error_handling::AnalysisError;
use crate::models::{PersonRecord, ProfileSearchResult, ResultMeta};
use crate::normalize::{TaskEnvelope, VisualMatch};
use crate::task::ImageUpload;
use crate::validate::MatchValidator;

const FALLBACK_PERSON_NAME: &str = "Result";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Turns a validated match into a person record.
pub fn person_from_match(candidate: &VisualMatch) -> PersonRecord {
    let name = non_blank(candidate.title.as_deref())
        .or_else(|| non_blank(candidate.source.as_deref()))
        .unwrap_or(FALLBACK_PERSON_NAME)
        .to_string();
    let page = candidate.link.as_deref().and_then(normalized_web_url);
    let favicon = non_blank(candidate.source_icon.as_deref())
        .map(String::from)
        .or_else(|| {
            page.as_ref()
                .and_then(|page| favicon_url(page, DEFAULT_FAVICON_SIZE))
                .map(String::from)
        });

    PersonRecord {
        name,
        image_url: candidate.main_image().map(String::from),
        favicon_url: favicon,
        link: page.as_ref().map(|page| page.to_string()),
        source: non_blank(candidate.source.as_deref()).map(String::from),
        site_host: page
            .as_ref()
            .and_then(|page| page.host_str())
            .map(String::from),
    }
}

/// Matches from every engine, engines in name order.
///
/// # Errors
///
/// `AnalysisError::NoEngines` when the envelope names no engine at all.
pub fn candidate_matches(envelope: &TaskEnvelope) -> Result<Vec<VisualMatch>, AnalysisError> {
    if !envelope.has_engines() {
        return Err(AnalysisError::NoEngines);
    }
    Ok(envelope.all_matches())
}

pub async fn run_profile(
    backend: &dyn AnalysisBackend,
    validator: &MatchValidator,
    image: &ImageUpload,
    cancel: &CancellationToken,
) -> Result<ProfileSearchResult, AnalysisError> {
    let cleaned = backend.remove_background(image, cancel).await?;
    let envelope = backend.reverse_search(&cleaned, cancel).await?;
    let candidates = candidate_matches(&envelope)?;
    info!(
        "{} candidate match(es) from {} engine(s)",
        candidates.len(),
        envelope.results.len()
    );

    let valid = validator.validate(candidates, cancel).await?;
    if valid.is_empty() {
        warn!("Every candidate match was rejected");
        return Err(AnalysisError::ValidationEmpty);
    }

    Ok(ProfileSearchResult {
        meta: ResultMeta::new(),
        found_people: valid.iter().map(person_from_match).collect(),
        query_image_snapshot: Some(image.bytes.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::EngineResult;

    fn candidate() -> VisualMatch {
        VisualMatch {
            title: Some("  Jane on the beach ".to_string()),
            link: Some("instagram.com/p/abc".to_string()),
            source: Some("Instagram".to_string()),
            thumbnail: Some("https://cdn.example/t.jpg".to_string()),
            image: Some("https://cdn.example/full.jpg".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_person_from_match() {
        let person = person_from_match(&candidate());
        assert_eq!(person.name, "Jane on the beach");
        assert_eq!(person.image_url.as_deref(), Some("https://cdn.example/t.jpg"));
        assert_eq!(person.link.as_deref(), Some("https://instagram.com/p/abc"));
        assert_eq!(person.site_host.as_deref(), Some("instagram.com"));
        let favicon = person.favicon_url.unwrap();
        assert!(favicon.starts_with("https://www.google.com/s2/favicons"));
        assert!(favicon.contains("sz=64"));
    }

    #[test]
    fn test_person_name_fallbacks() {
        let mut m = candidate();
        m.title = Some("   ".to_string());
        assert_eq!(person_from_match(&m).name, "Instagram");
        m.source = None;
        assert_eq!(person_from_match(&m).name, "Result");
    }

    #[test]
    fn test_source_icon_wins_over_favicon_service() {
        let mut m = candidate();
        m.source_icon = Some("https://instagram.com/icon.png".to_string());
        assert_eq!(
            person_from_match(&m).favicon_url.as_deref(),
            Some("https://instagram.com/icon.png")
        );
    }

    #[test]
    fn test_candidate_matches_requires_engines() {
        let empty = TaskEnvelope::default();
        assert!(matches!(
            candidate_matches(&empty),
            Err(AnalysisError::NoEngines)
        ));

        let mut status_only = TaskEnvelope::default();
        status_only
            .status
            .insert("google".to_string(), "completed".to_string());
        assert!(candidate_matches(&status_only).unwrap().is_empty());

        let mut emptied = TaskEnvelope::default();
        emptied.empty_engines.insert("google".to_string());
        assert!(candidate_matches(&emptied).unwrap().is_empty());

        let mut with_results = TaskEnvelope::default();
        with_results.results.insert(
            "bing".to_string(),
            EngineResult {
                engine_name: "bing".to_string(),
                visual_matches: vec![candidate()],
            },
        );
        assert_eq!(candidate_matches(&with_results).unwrap().len(), 1);
    }
}
