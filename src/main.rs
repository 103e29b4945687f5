use anyhow::Result;
use clap::{Arg, ArgGroup, Command};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yt_transcript_tool::config::{Config, ConfigBuilder, DEFAULT_LANGUAGE, DEFAULT_MODEL, DEFAULT_OUTPUT_DIR};
use yt_transcript_tool::{BatchProcessor, InputSource};

fn cli() -> Command {
    Command::new("yt-transcripts")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Download YouTube transcripts with optional AI formatting")
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .value_name("KEY")
                .help("Google Gemini API key; enables Markdown formatting")
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("MODEL")
                .help(format!("Gemini model (default: {})", DEFAULT_MODEL))
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .value_name("CODE")
                .help(format!("Transcript language (default: {})", DEFAULT_LANGUAGE))
        )
        .arg(
            Arg::new("target-lang")
                .long("target-lang")
                .value_name("CODE")
                .help(format!("Target language for translation (default: {})", DEFAULT_LANGUAGE))
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("DIR")
                .help(format!("Output directory (default: {})", DEFAULT_OUTPUT_DIR))
        )
        .arg(
            Arg::new("file")
                .long("file")
                .short('f')
                .value_name("PATH")
                .help("File with video URLs (one per line)")
        )
        .arg(
            Arg::new("playlist")
                .long("playlist")
                .short('p')
                .value_name("URL")
                .help("YouTube playlist URL")
        )
        .group(
            ArgGroup::new("source")
                .args(["file", "playlist"])
                .required(true)
                .multiple(false)
        )
        .arg(
            Arg::new("generate-toc")
                .long("generate-toc")
                .help("Ask for a title and table of contents")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("summarize")
                .long("summarize")
                .help("Ask for a summary at the end")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("skip-ads")
                .long("skip-ads")
                .help("Ask for sponsor and promotion blocks to be removed")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("TOML configuration file")
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    // RUST_LOG wins over the verbose flag
    let default_filter = if matches.get_flag("verbose") {
        "yt_transcript_tool=debug,yt_transcripts=debug,warn"
    } else {
        "yt_transcript_tool=info,yt_transcripts=info,warn"
    };
    tracing_subscriber::fmt()
        .with_target(matches.get_flag("verbose"))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let base_config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(&PathBuf::from(path))?,
        None => Config::default(),
    };

    // Command-line values override the config file; unset flags leave it alone
    let mut builder = ConfigBuilder::from_config(base_config);

    if matches.get_flag("skip-ads") {
        builder = builder.skip_ads(true);
    }
    if matches.get_flag("generate-toc") {
        builder = builder.generate_toc(true);
    }
    if matches.get_flag("summarize") {
        builder = builder.summarize(true);
    }
    if let Some(api_key) = matches.get_one::<String>("api-key") {
        builder = builder.with_api_key(api_key.clone());
    }
    if let Some(model) = matches.get_one::<String>("model") {
        builder = builder.with_model(model.clone());
    }
    if let Some(lang) = matches.get_one::<String>("lang") {
        builder = builder.with_language(lang.clone());
    }
    if let Some(target) = matches.get_one::<String>("target-lang") {
        builder = builder.with_target_language(target.clone());
    }
    if let Some(output) = matches.get_one::<String>("output") {
        builder = builder.with_output_dir(PathBuf::from(output));
    }

    let config = builder.build();
    config.validate()?;

    let source = match (
        matches.get_one::<String>("file"),
        matches.get_one::<String>("playlist"),
    ) {
        (Some(path), None) => InputSource::File(PathBuf::from(path)),
        (None, Some(url)) => InputSource::Playlist(url.clone()),
        _ => anyhow::bail!("Provide exactly one of --file or --playlist"),
    };

    info!("🚀 YouTube transcript tool starting...");
    for line in config.summary().lines() {
        info!("{}", line);
    }

    let processor = BatchProcessor::new(config)?;
    processor.prepare_output_dirs().await?;

    let urls = source.resolve_urls(processor.page_fetcher()).await;
    if urls.is_empty() {
        warn!("No video URLs to process");
        return Ok(());
    }

    let results = processor.process_urls(&urls).await;

    info!("🎉 Processing completed in {:.2}s", results.total_time.as_secs_f64());
    info!("✅ Successful: {}", results.successful);
    info!("❌ Failed: {}", results.failed);
    info!("📊 Success rate: {:.1}%", results.success_rate());

    Ok(())
}
