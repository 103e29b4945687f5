use crate::youtube::page::PageFetcher;
use crate::youtube::playlist::resolve_playlist;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the list of video URLs comes from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Newline-delimited file of URLs
    File(PathBuf),
    /// Playlist page URL
    Playlist(String),
}

impl InputSource {
    /// Resolve the source into the URLs to process
    pub async fn resolve_urls(&self, fetcher: &dyn PageFetcher) -> Vec<String> {
        match self {
            InputSource::File(path) => load_url_file(path).await,
            InputSource::Playlist(url) => resolve_playlist(fetcher, url).await,
        }
    }
}

/// Read a URL list: one URL per line, blank lines ignored. A missing or
/// unreadable file yields an empty list.
pub async fn load_url_file(path: &Path) -> Vec<String> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot read URL file {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    info!("📄 Loaded {} URLs from {}", urls.len(), path.display());
    urls
}
