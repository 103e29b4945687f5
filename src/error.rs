//! Error taxonomy for transcript acquisition and formatting
//!
//! Every variant except `Config` is scoped to a single URL: the batch
//! processor logs it and moves on to the next input.

/// Result type for transcript operations
pub type Result<T> = std::result::Result<T, TranscriptError>;

#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid URL format: {0}")]
    InvalidUrlFormat(String),

    #[error("No transcript in '{language}' for video {video_id} (available: {})", .available.join(", "))]
    TranscriptUnavailable {
        video_id: String,
        language: String,
        available: Vec<String>,
    },

    #[error("Transcript lookup failed for video {video_id}: {reason}")]
    LookupFailed { video_id: String, reason: String },

    #[error("Failed to fetch page {url}: {reason}")]
    PageFetchFailed { url: String, reason: String },

    #[error("Formatting service failed: {0}")]
    FormattingServiceFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TranscriptError {
    pub fn lookup_failed(video_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::LookupFailed {
            video_id: video_id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn page_fetch_failed(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::PageFetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
