use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, TranscriptError};
use crate::llm::formatting::MarkdownFormatter;
use crate::youtube::page::{build_client, HttpPageFetcher, PageFetcher};
use crate::youtube::transcript::{fetch_transcript, TranscriptSource, YouTubeTranscriptSource};
use crate::youtube::{fetch_title, VideoReference};

/// Processing result for a single URL
#[derive(Debug, Clone)]
pub struct VideoProcessingResult {
    pub url: String,
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub raw_path: Option<PathBuf>,
    pub markdown_path: Option<PathBuf>,
    pub processing_time: Duration,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
    pub stages_completed: Vec<ProcessingStage>,
}

/// Overall batch results
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub results: Vec<VideoProcessingResult>,
}

impl ProcessingResult {
    pub fn success_rate(&self) -> f64 {
        if self.total > 0 {
            self.successful as f64 / self.total as f64 * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    UrlParsed,
    TitleResolved,
    TranscriptFetched,
    RawWritten,
    MarkdownWritten,
}

/// Sequential transcript pipeline over a list of URLs
pub struct BatchProcessor {
    config: Config,
    page_fetcher: Box<dyn PageFetcher>,
    transcript_source: Box<dyn TranscriptSource>,
    formatter: Option<MarkdownFormatter>,
}

impl BatchProcessor {
    /// Wire up the HTTP-backed components. The formatter exists only when
    /// the configuration carries an API key.
    pub fn new(config: Config) -> Result<Self> {
        let client = build_client(&config.http)?;

        let formatter = match config.formatting_config() {
            Some(formatting) => Some(
                MarkdownFormatter::new(formatting)
                    .map_err(|e| TranscriptError::Config(e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self::with_components(
            config,
            Box::new(HttpPageFetcher::from_client(client.clone())),
            Box::new(YouTubeTranscriptSource::new(client)),
            formatter,
        ))
    }

    pub fn with_components(
        config: Config,
        page_fetcher: Box<dyn PageFetcher>,
        transcript_source: Box<dyn TranscriptSource>,
        formatter: Option<MarkdownFormatter>,
    ) -> Self {
        info!(
            "🔧 Initializing BatchProcessor (AI formatting {})",
            if formatter.is_some() { "enabled" } else { "disabled" }
        );

        Self {
            config,
            page_fetcher,
            transcript_source,
            formatter,
        }
    }

    pub fn page_fetcher(&self) -> &dyn PageFetcher {
        self.page_fetcher.as_ref()
    }

    pub fn formatting_enabled(&self) -> bool {
        self.formatter.is_some()
    }

    /// Create the output directories. Safe to call repeatedly.
    pub async fn prepare_output_dirs(&self) -> Result<()> {
        let output = &self.config.output;
        tokio::fs::create_dir_all(&output.base_dir).await?;
        tokio::fs::create_dir_all(output.raw_dir()).await?;
        if self.formatting_enabled() {
            tokio::fs::create_dir_all(output.markdown_dir()).await?;
        }
        debug!("Output directories ready under {}", output.base_dir.display());
        Ok(())
    }

    /// Process every URL in order. Failures are recorded per URL and never
    /// stop the batch.
    pub async fn process_urls(&self, urls: &[String]) -> ProcessingResult {
        let start_time = Instant::now();
        let mut results = Vec::with_capacity(urls.len());
        let mut titles_seen = HashSet::new();

        info!("🚀 Processing {} videos...", urls.len());

        for (index, url) in urls.iter().enumerate() {
            info!("📹 Processing video {}/{}: {}", index + 1, urls.len(), url);

            let result = self.process_single_url(url).await;

            if let Some(title) = &result.title {
                if result.raw_path.is_some() && !titles_seen.insert(title.clone()) {
                    warn!("⚠️ Title '{}' seen earlier in this run; its files were overwritten", title);
                }
            }

            results.push(result);
        }

        let successful = results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Completed)
            .count();

        ProcessingResult {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            total_time: start_time.elapsed(),
            results,
        }
    }

    /// Process a single URL through the pipeline
    pub async fn process_single_url(&self, url: &str) -> VideoProcessingResult {
        let start_time = Instant::now();
        let mut result = VideoProcessingResult {
            url: url.to_string(),
            video_id: None,
            title: None,
            raw_path: None,
            markdown_path: None,
            processing_time: Duration::from_secs(0),
            status: ProcessingStatus::Completed,
            error_message: None,
            stages_completed: Vec::new(),
        };

        if let Err(e) = self.run_stages(url, &mut result).await {
            error!("❌ Error processing {}: {}", url, e);
            result.status = ProcessingStatus::Failed;
            result.error_message = Some(e.to_string());
        }

        result.processing_time = start_time.elapsed();
        result
    }

    async fn run_stages(&self, url: &str, result: &mut VideoProcessingResult) -> Result<()> {
        let video = VideoReference::new(url)?;
        result.video_id = Some(video.video_id.clone());
        result.stages_completed.push(ProcessingStage::UrlParsed);

        let title = fetch_title(self.page_fetcher.as_ref(), url).await;
        let video = video.with_title(title);
        result.title = Some(video.title.clone());
        result.stages_completed.push(ProcessingStage::TitleResolved);

        let text = fetch_transcript(
            self.transcript_source.as_ref(),
            &video.video_id,
            &self.config.transcript.language,
        )
        .await?;
        result.stages_completed.push(ProcessingStage::TranscriptFetched);
        info!("✅ Transcript downloaded: {}", video.title);

        let raw_path = self.config.output.raw_dir().join(video.raw_file_name());
        tokio::fs::write(&raw_path, &text).await?;
        debug!("Raw transcript written to {}", raw_path.display());
        result.raw_path = Some(raw_path);
        result.stages_completed.push(ProcessingStage::RawWritten);

        if let Some(formatter) = &self.formatter {
            let markdown = formatter.format(&text).await?;

            let markdown_path = self.config.output.markdown_dir().join(video.markdown_file_name());
            tokio::fs::write(&markdown_path, markdown).await?;
            info!("✅ Markdown generated: {}", markdown_path.display());
            result.markdown_path = Some(markdown_path);
            result.stages_completed.push(ProcessingStage::MarkdownWritten);
        }

        Ok(())
    }
}
