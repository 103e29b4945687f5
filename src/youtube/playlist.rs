use super::links::canonical_watch_url;
use super::page::PageFetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, error, info};

const WATCH_PATH: &str = "/watch?v=";

// Watch paths inside the page's embedded JSON data
static EMBEDDED_WATCH_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["'](/watch\?v=[A-Za-z0-9_-]+)"#).expect("valid regex"));

/// Fetch a playlist page and return its video URLs. A failed fetch is
/// logged and yields an empty list.
pub async fn resolve_playlist(fetcher: &dyn PageFetcher, playlist_url: &str) -> Vec<String> {
    info!("📄 Fetching playlist page: {}", playlist_url);

    let html = match fetcher.fetch(playlist_url).await {
        Ok(html) => html,
        Err(e) => {
            error!("Error getting videos from playlist: {}", e);
            return Vec::new();
        }
    };

    let urls = extract_video_urls(&html);
    info!("📹 Found {} videos in playlist", urls.len());
    urls
}

/// Collect canonical watch URLs from a playlist document, deduplicated in
/// first-seen order
pub fn extract_video_urls(html: &str) -> Vec<String> {
    let from_links = extract_from_links(html);
    if !from_links.is_empty() {
        return from_links;
    }

    // Playlists rendered client-side carry no watch anchors in the markup
    debug!("No watch links in markup, scanning embedded page data");
    dedup(
        EMBEDDED_WATCH_PATH
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| canonical_watch_url(m.as_str())),
    )
}

fn extract_from_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    dedup(
        document
            .select(&selector)
            .filter_map(|link| link.value().attr("href"))
            .filter(|href| href.contains(WATCH_PATH))
            .filter_map(canonical_watch_url),
    )
}

fn dedup(urls: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.filter(|url| seen.insert(url.clone())).collect()
}
