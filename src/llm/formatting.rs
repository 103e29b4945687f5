//! Markdown formatting of raw transcripts through a generative model

use super::{create_llm, ChatMessage, LLMConfig, LLM};
use crate::error::{Result, TranscriptError};
use tracing::{debug, info};

/// User-selected formatting options
#[derive(Debug, Clone, PartialEq)]
pub struct FormattingOptions {
    /// Language the transcript was spoken in
    pub source_language: String,
    /// Language the Markdown should be written in
    pub target_language: String,
    pub skip_ads: bool,
    pub generate_toc: bool,
    pub summarize: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            source_language: crate::config::DEFAULT_LANGUAGE.to_string(),
            target_language: crate::config::DEFAULT_LANGUAGE.to_string(),
            skip_ads: false,
            generate_toc: false,
            summarize: false,
        }
    }
}

/// Everything the formatting stage needs, decided once at startup
#[derive(Debug, Clone)]
pub struct FormattingConfig {
    pub llm: LLMConfig,
    pub options: FormattingOptions,
}

/// One bullet of the formatting instructions
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionClause {
    Correct,
    RemoveAds,
    TableOfContents,
    Summary,
    Translate { from: String, to: String },
}

impl InstructionClause {
    pub fn text(&self) -> String {
        match self {
            Self::Correct => {
                "Correct punctuation, spelling, and add natural paragraph breaks.".to_string()
            }
            Self::RemoveAds => "Remove advertisement blocks like promotions, sponsorships, social media mentions, or calls to subscribe.".to_string(),
            Self::TableOfContents => {
                "Generate a title and structured table of contents with chapters.".to_string()
            }
            Self::Summary => "At the end, provide a concise summary of the content.".to_string(),
            Self::Translate { from, to } => {
                format!("Translate the content from {} to {}.", from, to)
            }
        }
    }
}

impl FormattingOptions {
    /// Clauses in prompt order; disabled ones are left out entirely
    pub fn clauses(&self) -> Vec<InstructionClause> {
        let translate = self.source_language != self.target_language;

        [
            (true, InstructionClause::Correct),
            (self.skip_ads, InstructionClause::RemoveAds),
            (self.generate_toc, InstructionClause::TableOfContents),
            (self.summarize, InstructionClause::Summary),
            (
                translate,
                InstructionClause::Translate {
                    from: self.source_language.clone(),
                    to: self.target_language.clone(),
                },
            ),
        ]
        .into_iter()
        .filter_map(|(enabled, clause)| enabled.then_some(clause))
        .collect()
    }
}

/// Build the formatting prompt for a raw transcript
pub fn build_prompt(text: &str, options: &FormattingOptions) -> String {
    let instructions = options
        .clauses()
        .iter()
        .map(|clause| format!("- {}", clause.text()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You will receive a raw transcript of spoken audio in {}.\n\
        {}\n\
        Do not invent or remove meaningful content unrelated to ads. \
        Preserve the logical order and integrity of the original content.\n\
        \n\
        Raw text:\n\
        {}\n\
        \n\
        Final output in Markdown:\n",
        options.source_language, instructions, text
    )
}

/// Sends transcripts to the model and returns its Markdown
pub struct MarkdownFormatter {
    llm: Box<dyn LLM>,
    options: FormattingOptions,
}

impl MarkdownFormatter {
    pub fn new(config: FormattingConfig) -> anyhow::Result<Self> {
        let llm = create_llm(&config.llm)?;
        info!("✅ Markdown formatter initialized with model {}", llm.model());
        Ok(Self::with_llm(llm, config.options))
    }

    pub fn with_llm(llm: Box<dyn LLM>, options: FormattingOptions) -> Self {
        Self { llm, options }
    }

    /// Format a raw transcript. The trimmed model output is returned as is.
    pub async fn format(&self, text: &str) -> Result<String> {
        debug!("Formatting transcript ({} chars)", text.len());

        let prompt = build_prompt(text, &self.options);
        let response = self
            .llm
            .chat(vec![ChatMessage::user(prompt)])
            .await
            .map_err(|e| TranscriptError::FormattingServiceFailed(e.to_string()))?;

        debug!("Formatting completed (tokens: {:?})", response.tokens_used);

        Ok(response.content.trim().to_string())
    }
}
