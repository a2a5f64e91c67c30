//! URL normalization utilities for candidate matches.

use log::warn;
use url::Url;

/// Maximum URL length (2048 characters) to prevent DoS attacks via extremely long URLs.
/// This matches common browser and server limits (e.g., IE, Apache, Nginx default limits).
const MAX_URL_LENGTH: usize = 2048;

const GOOGLE_FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";
const DUCKDUCKGO_FAVICON_SERVICE: &str = "https://icons.duckduckgo.com/ip3";

/// Default favicon edge length in pixels.
pub const DEFAULT_FAVICON_SIZE: u32 = 64;

/// Normalizes a page or image reference into an absolute web URL.
///
/// Trims surrounding whitespace. A value that already parses with an `http` or
/// `https` scheme is kept as is; anything else is treated as a scheme-less host
/// and gets an `https://` prefix. Returns `None` for empty input, values longer
/// than `MAX_URL_LENGTH`, and values that still do not parse to a URL with a host.
///
/// # Arguments
///
/// * `raw` - The reference exactly as the upstream payload carried it
///
/// # Returns
///
/// `Some(url)` if the reference can be fetched over the web, `None` otherwise.
pub fn normalized_web_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {}...",
            trimmed.len(),
            MAX_URL_LENGTH,
            trimmed.chars().take(50).collect::<String>()
        );
        return None;
    }

    if let Ok(parsed) = Url::parse(trimmed) {
        if matches!(parsed.scheme(), "http" | "https") && has_host(&parsed) {
            return Some(parsed);
        }
    }

    let with_scheme = format!("https://{trimmed}");
    match Url::parse(&with_scheme) {
        Ok(parsed) if has_host(&parsed) => Some(parsed),
        _ => None,
    }
}

fn has_host(url: &Url) -> bool {
    url.host_str().is_some_and(|host| !host.trim().is_empty())
}

/// Builds favicon service URLs for the site hosting a page, most preferred first.
///
/// The size is clamped to `16..=256`. Duplicates are removed while keeping order.
///
/// # Arguments
///
/// * `page` - The page whose site icon is wanted
/// * `size` - Requested icon edge length in pixels
fn favicon_urls(page: &Url, size: u32) -> Vec<Url> {
    let Some(host) = page.host_str().map(str::trim).filter(|h| !h.is_empty()) else {
        return Vec::new();
    };
    let size = size.clamp(16, 256).to_string();

    let mut candidates = Vec::with_capacity(3);
    if let Ok(by_domain) = Url::parse_with_params(
        GOOGLE_FAVICON_SERVICE,
        &[("domain", host), ("sz", size.as_str())],
    ) {
        candidates.push(by_domain);
    }
    if let Ok(by_page) = Url::parse_with_params(
        GOOGLE_FAVICON_SERVICE,
        &[("domain_url", page.as_str()), ("sz", size.as_str())],
    ) {
        candidates.push(by_page);
    }
    if let Ok(ddg) = Url::parse(&format!("{DUCKDUCKGO_FAVICON_SERVICE}/{host}.ico")) {
        candidates.push(ddg);
    }

    let mut unique: Vec<Url> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

/// The preferred favicon URL for a page, if its host is known.
pub fn favicon_url(page: &Url, size: u32) -> Option<Url> {
    favicon_urls(page, size).into_iter().next()
}

/// Extracts an `img_url` query parameter from a link, if it carries one.
///
/// Image search result pages often wrap the original image in this parameter.
pub fn img_url_query_param(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "img_url")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}
