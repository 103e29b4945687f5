//! YouTube transcript downloader
//!
//! Resolves video URLs (from a list file or a playlist page), downloads
//! their caption text in a chosen language, stores it as raw text and can
//! rewrite it into Markdown through Gemini.

pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod processing;
pub mod youtube;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Result, TranscriptError};
pub use crate::input::InputSource;
pub use crate::llm::formatting::{build_prompt, FormattingOptions, MarkdownFormatter};
pub use crate::llm::{ChatMessage, LLMConfig, LLMResponse, LLM};
pub use crate::processing::{BatchProcessor, ProcessingResult, ProcessingStatus};
pub use crate::youtube::{VideoReference, TranscriptSource, PageFetcher};
