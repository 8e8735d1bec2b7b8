//! vfsearch - Identify an audio file against the song library
//!
//! Usage: vfsearch [--config <path>] <audio_file>

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use vibeflow_cli::output::print_search_outcome;
use vibeflow_cli::settings::{api_client, init_logger, load_config};
use vibeflow_core::pipeline;

#[derive(Parser, Debug)]
#[command(name = "vfsearch")]
#[command(about = "Search the song library with an audio file", long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Defaults to vibeflow.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Audio file to identify (WAV, MP3, FLAC, OGG, M4A, WebM)
    audio_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let client = api_client(&config)?;

    let start = std::time::Instant::now();
    let prepared = pipeline::prepare_file(&args.audio_file)?;
    log::info!(
        "Prepared {} ({}s) in {:.2}s",
        args.audio_file.display(),
        prepared.duration_secs,
        start.elapsed().as_secs_f64()
    );

    let outcome = pipeline::search_file(&client, &prepared).await?;
    print_search_outcome(&args.audio_file.display().to_string(), &outcome);

    Ok(())
}
