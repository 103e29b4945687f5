//! YouTube access: URL handling, page titles, playlists and caption tracks
//!
//! Network access goes through the `PageFetcher` and `TranscriptSource`
//! traits so the pipeline can run against in-memory fakes.

pub mod links;
pub mod page;
pub mod playlist;
pub mod title;
pub mod transcript;

// Re-export main types
pub use links::{extract_video_id, sanitize_filename};
pub use page::{HttpPageFetcher, PageFetcher};
pub use playlist::resolve_playlist;
pub use title::{fetch_title, FALLBACK_TITLE};
pub use transcript::{
    fetch_transcript, TranscriptChunk, TranscriptSource, TranscriptTrack, YouTubeTranscriptSource,
};

use crate::error::Result;

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// A video being processed: its input URL plus derived id and title
#[derive(Debug, Clone, PartialEq)]
pub struct VideoReference {
    pub url: String,
    pub video_id: String,
    /// Sanitized title, used as the output file stem
    pub title: String,
}

impl VideoReference {
    /// Parse the id out of `url`; the title starts as the fallback
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: url.to_string(),
            video_id: extract_video_id(url)?,
            title: FALLBACK_TITLE.to_string(),
        })
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = title;
        self
    }

    pub fn raw_file_name(&self) -> String {
        format!("{}.txt", self.title)
    }

    pub fn markdown_file_name(&self) -> String {
        format!("{}.md", self.title)
    }
}
