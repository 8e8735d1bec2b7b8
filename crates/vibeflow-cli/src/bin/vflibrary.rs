//! vflibrary - Manage songs and recordings on the service
//!
//! Usage:
//!   vflibrary songs list
//!   vflibrary songs rename <id> --title <title> --artist <artist>
//!   vflibrary songs delete <id>
//!   vflibrary songs audio <id> <output_file>
//!   vflibrary songs regenerate <id>
//!   vflibrary songs regenerate-all
//!   vflibrary recordings list | rename <id> <name> | delete <id> | audio <id> <output_file>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use vibeflow_api::{format_bytes, ApiClient, RecordingUpdate, SongUpdate};
use vibeflow_cli::output::print_json;
use vibeflow_cli::settings::{api_client, init_logger, load_config};
use vibeflow_core::pipeline;

#[derive(Parser, Debug)]
#[command(name = "vflibrary")]
#[command(about = "Browse and manage the song library and saved recordings", long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Defaults to vibeflow.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Library songs
    #[command(subcommand)]
    Songs(SongCommand),

    /// Saved recordings
    #[command(subcommand)]
    Recordings(RecordingCommand),
}

#[derive(Subcommand, Debug)]
enum SongCommand {
    List,
    Rename {
        id: i64,
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "Unknown")]
        artist: String,
    },
    Delete {
        id: i64,
    },
    /// Download the stored audio
    Audio {
        id: i64,
        output: PathBuf,
    },
    /// Recompute fingerprints for one song
    Regenerate {
        id: i64,
    },
    /// Recompute fingerprints for every song
    RegenerateAll,
}

#[derive(Subcommand, Debug)]
enum RecordingCommand {
    List,
    Rename { id: i64, name: String },
    Delete { id: i64 },
    Audio { id: i64, output: PathBuf },
}

#[derive(Serialize)]
struct SongRow {
    id: i64,
    title: String,
    artist: String,
    duration: Option<String>,
    fingerprints: Option<u64>,
    has_audio: bool,
    created_at: Option<String>,
}

#[derive(Serialize)]
struct RecordingRow {
    id: i64,
    name: String,
    duration_seconds: Option<f64>,
    sample_rate: Option<u32>,
    size: Option<String>,
    created_at: Option<String>,
}

#[derive(Serialize)]
struct Download {
    id: i64,
    path: String,
    size: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let client = api_client(&config)?;

    match args.command {
        Command::Songs(cmd) => run_songs(&client, cmd).await,
        Command::Recordings(cmd) => run_recordings(&client, cmd).await,
    }
}

async fn run_songs(client: &ApiClient, cmd: SongCommand) -> Result<()> {
    match cmd {
        SongCommand::List => {
            let songs = client.list_songs().await?;
            log::info!("{} songs in library", songs.len());
            let rows: Vec<SongRow> = songs
                .iter()
                .map(|s| SongRow {
                    id: s.id,
                    title: s.title.clone(),
                    artist: s.artist.clone(),
                    duration: s.duration_label(),
                    fingerprints: s.fingerprint_count,
                    has_audio: s.has_audio,
                    created_at: s.created_at().map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
                })
                .collect();
            print_json(&rows);
        }
        SongCommand::Rename { id, title, artist } => {
            if title.trim().is_empty() {
                anyhow::bail!("A song title is required");
            }
            let update = SongUpdate { title, artist };
            print_json(&client.update_song(id, &update).await?);
        }
        SongCommand::Delete { id } => {
            print_json(&client.delete_song(id).await?);
        }
        SongCommand::Audio { id, output } => {
            let bytes = client.song_audio(id).await?;
            print_json(&save_download(id, &bytes, &output)?);
        }
        SongCommand::Regenerate { id } => {
            print_json(&client.regenerate_song(id).await?);
        }
        SongCommand::RegenerateAll => {
            print_json(&pipeline::regenerate_all(client).await?);
        }
    }
    Ok(())
}

async fn run_recordings(client: &ApiClient, cmd: RecordingCommand) -> Result<()> {
    match cmd {
        RecordingCommand::List => {
            let recordings = client.my_recordings().await?;
            let rows: Vec<RecordingRow> = recordings
                .iter()
                .map(|r| RecordingRow {
                    id: r.id,
                    name: r.name.clone(),
                    duration_seconds: r.duration_seconds,
                    sample_rate: r.sample_rate,
                    size: r.file_size.map(format_bytes),
                    created_at: r.created_at().map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
                })
                .collect();
            print_json(&rows);
        }
        RecordingCommand::Rename { id, name } => {
            if name.trim().is_empty() {
                anyhow::bail!("A recording name is required");
            }
            print_json(&client.update_recording(id, &RecordingUpdate { name }).await?);
        }
        RecordingCommand::Delete { id } => {
            print_json(&client.delete_recording(id).await?);
        }
        RecordingCommand::Audio { id, output } => {
            let bytes = client.recording_audio(id).await?;
            print_json(&save_download(id, &bytes, &output)?);
        }
    }
    Ok(())
}

fn save_download(id: i64, bytes: &[u8], output: &Path) -> Result<Download> {
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(Download {
        id,
        path: output.display().to_string(),
        size: format_bytes(bytes.len() as u64),
    })
}
