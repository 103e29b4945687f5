use crate::error::{Result, TranscriptError};
use crate::llm::formatting::{FormattingConfig, FormattingOptions};
use crate::llm::LLMConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_LANGUAGE: &str = "pt";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OUTPUT_DIR: &str = "output_transcripts";

/// Configuration for a transcript download run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output layout
    pub output: OutputConfig,

    /// Transcript lookup settings
    pub transcript: TranscriptConfig,

    /// Markdown formatting through the generative API
    pub llm: LLMSettings,

    /// HTTP client settings for page and caption requests
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory
    pub base_dir: PathBuf,

    /// Subdirectory for raw transcript text
    pub raw_subdir: String,

    /// Subdirectory for formatted Markdown
    pub markdown_subdir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Caption language code, matched exactly against available tracks
    pub language: String,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LLMSettings {
    /// Gemini API key. Formatting is disabled when absent.
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Language the Markdown should be written in
    pub target_language: String,

    /// Ask the model to drop sponsorships and calls to subscribe
    pub skip_ads: bool,

    /// Ask the model for a title and table of contents
    pub generate_toc: bool,

    /// Ask the model to append a summary
    pub summarize: bool,

    /// Sampling temperature; provider default when unset
    pub temperature: Option<f32>,

    /// Output token cap; provider default when unset
    pub max_output_tokens: Option<u32>,

    /// Request timeout in seconds; client default when unset
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with page and caption requests
    pub user_agent: String,

    /// Request timeout in seconds; client default when unset
    pub timeout_seconds: Option<u64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            raw_subdir: "raw".to_string(),
            markdown_subdir: "markdown".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.base_dir.join(&self.raw_subdir)
    }

    pub fn markdown_dir(&self) -> PathBuf {
        self.base_dir.join(&self.markdown_subdir)
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for LLMSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            target_language: DEFAULT_LANGUAGE.to_string(),
            skip_ads: false,
            generate_toc: false,
            summarize: false,
            temperature: None,
            max_output_tokens: None,
            timeout_seconds: None,
        }
    }
}

// Keeps the API key out of debug logs.
impl std::fmt::Debug for LLMSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("target_language", &self.target_language)
            .field("skip_ads", &self.skip_ads)
            .field("generate_toc", &self.generate_toc)
            .field("summarize", &self.summarize)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            timeout_seconds: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Missing sections and keys take
    /// their default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranscriptError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            TranscriptError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;

        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcript.language.trim().is_empty() {
            return Err(TranscriptError::Config("transcript language must not be empty".to_string()));
        }

        if self.output.raw_subdir.trim().is_empty() || self.output.markdown_subdir.trim().is_empty() {
            return Err(TranscriptError::Config("output subdirectory names must not be empty".to_string()));
        }

        if self.output.raw_subdir == self.output.markdown_subdir {
            return Err(TranscriptError::Config(
                "raw and markdown subdirectories must differ".to_string(),
            ));
        }

        if let Some(api_key) = &self.llm.api_key {
            if api_key.trim().is_empty() {
                return Err(TranscriptError::Config("API key must not be empty".to_string()));
            }
            if self.llm.model.trim().is_empty() {
                return Err(TranscriptError::Config("model must not be empty".to_string()));
            }
            if self.llm.target_language.trim().is_empty() {
                return Err(TranscriptError::Config("target language must not be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Any supplied API key turns formatting on; `validate` rejects blank ones
    pub fn formatting_enabled(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Formatting stage settings, or `None` when no API key was given
    pub fn formatting_config(&self) -> Option<FormattingConfig> {
        let api_key = self.llm.api_key.clone()?;

        Some(FormattingConfig {
            llm: LLMConfig {
                api_key,
                model: self.llm.model.clone(),
                max_output_tokens: self.llm.max_output_tokens,
                temperature: self.llm.temperature,
                timeout_seconds: self.llm.timeout_seconds,
                ..LLMConfig::default()
            },
            options: FormattingOptions {
                source_language: self.transcript.language.clone(),
                target_language: self.llm.target_language.clone(),
                skip_ads: self.llm.skip_ads,
                generate_toc: self.llm.generate_toc,
                summarize: self.llm.summarize,
            },
        })
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Transcript Tool Configuration:\n\
            - Output Directory: {}\n\
            - Transcript Language: {}\n\
            - AI Formatting: {}\n\
            - Model: {}\n\
            - Target Language: {}\n\
            - Skip Ads: {}\n\
            - Table of Contents: {}\n\
            - Summary: {}",
            self.output.base_dir.display(),
            self.transcript.language,
            if self.formatting_enabled() { "enabled" } else { "disabled" },
            self.llm.model,
            self.llm.target_language,
            self.llm.skip_ads,
            self.llm.generate_toc,
            self.llm.summarize,
        )
    }
}

/// Configuration builder for layering command-line values over a config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_language(mut self, language: String) -> Self {
        self.config.transcript.language = language;
        self
    }

    pub fn with_target_language(mut self, language: String) -> Self {
        self.config.llm.target_language = language;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.config.llm.model = model;
        self
    }

    pub fn skip_ads(mut self, enable: bool) -> Self {
        self.config.llm.skip_ads = enable;
        self
    }

    pub fn generate_toc(mut self, enable: bool) -> Self {
        self.config.llm.generate_toc = enable;
        self
    }

    pub fn summarize(mut self, enable: bool) -> Self {
        self.config.llm.summarize = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
