use super::links::sanitize_filename;
use super::page::PageFetcher;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Used whenever no usable title can be extracted
pub const FALLBACK_TITLE: &str = "video";

const SITE_SUFFIX: &str = " - YouTube";

/// Fetch a video page and derive a filesystem-safe title from it.
/// Never fails: any error yields `"video"`.
pub async fn fetch_title(fetcher: &dyn PageFetcher, url: &str) -> String {
    let html = match fetcher.fetch(url).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Error getting title from URL: {}", e);
            return FALLBACK_TITLE.to_string();
        }
    };

    match extract_title(&html) {
        Some(title) => {
            debug!("Resolved title '{}' for {}", title, url);
            title
        }
        None => {
            warn!("No usable <title> element at {}", url);
            FALLBACK_TITLE.to_string()
        }
    }
}

/// Extract and clean the `<title>` text of a document
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let raw = document.select(&selector).next()?.text().collect::<String>();

    let title = clean_title(&raw);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Strip the site suffix, trim, and sanitize a raw page title
pub fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim_end();
    let without_suffix = trimmed.strip_suffix(SITE_SUFFIX).unwrap_or(trimmed);
    sanitize_filename(without_suffix.trim())
}
