//! vfupload - Add a song to the library
//!
//! Usage: vfupload [--config <path>] --title <title> [--artist <artist>] <audio_file>

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use vibeflow_cli::output::print_json;
use vibeflow_cli::settings::{api_client, init_logger, load_config};
use vibeflow_core::pipeline;

#[derive(Parser, Debug)]
#[command(name = "vfupload")]
#[command(about = "Upload a song so it can be identified", long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Defaults to vibeflow.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Song title (required)
    #[arg(short, long)]
    title: String,

    /// Artist name; "Unknown" when omitted
    #[arg(short, long)]
    artist: Option<String>,

    /// Audio file to upload
    audio_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct UploadOutput {
    song_id: i64,
    fingerprints_generated: u64,
    duration_seconds: u64,
    file_size: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let client = api_client(&config)?;

    let prepared = pipeline::prepare_file(&args.audio_file)?;
    let receipt =
        pipeline::upload_song(&client, &prepared, &args.title, args.artist.as_deref()).await?;

    print_json(&UploadOutput {
        song_id: receipt.song_id,
        fingerprints_generated: receipt.fingerprints_generated,
        duration_seconds: prepared.duration_secs,
        file_size: prepared.byte_len,
    });

    Ok(())
}
