//! vflisten - Identify what is playing
//!
//! Streams microphone audio (or a simulated file source) to the match
//! service until a song is confirmed or the listening budget runs out.
//!
//! Usage:
//!   vflisten [--config <path>]                 # default input device
//!   vflisten --simulate <audio_file>           # play a file through the capture path

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use vibeflow_cli::output::{print_session_report, session_status};
use vibeflow_cli::settings::{file_input, init_logger, load_config, mic_input};
use vibeflow_core::capture::CaptureTaps;
use vibeflow_core::{MatchClient, SessionUpdate};

#[derive(Parser, Debug)]
#[command(name = "vflisten")]
#[command(about = "Listen and identify a song in real time", long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Defaults to vibeflow.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use an audio file as the input instead of the microphone
    #[arg(short, long)]
    simulate: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let input = match &args.simulate {
        Some(path) => file_input(path)?,
        None => mic_input()?,
    };

    let mut client = MatchClient::from_config(&config);
    log::info!("Streaming to {}", client.url());
    let mut handle = client.start(input, CaptureTaps::default())?;

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping");
            canceller.cancel();
        }
    });

    while let Some(update) = handle.next_update().await {
        report_progress(&update);
    }

    let report = handle.wait().await;
    print_session_report(&report);

    session_status(&report)
}

/// Progress goes to stderr so stdout stays JSON
fn report_progress(update: &SessionUpdate) {
    match update {
        SessionUpdate::Connecting => eprintln!("Connecting..."),
        SessionUpdate::Connected => eprintln!("Listening..."),
        SessionUpdate::Countdown { remaining_secs } => {
            log::info!("{}s left", remaining_secs)
        }
        SessionUpdate::Status(message) => eprintln!("{}", message),
        SessionUpdate::Partial(c) => eprintln!(
            "Maybe: {} - {} ({}/{} hashes)",
            c.title, c.artist, c.matched_hashes, c.min_required
        ),
        SessionUpdate::Confirmed(c) => {
            eprintln!("Found: {} - {} ({:.1}%)", c.title, c.artist, c.confidence)
        }
        SessionUpdate::NoMatch(message) => eprintln!("{}", message),
        SessionUpdate::ServiceError(message) => eprintln!("Service error: {}", message),
        SessionUpdate::Warning(message) => log::warn!("{}", message),
        SessionUpdate::Exhausted => eprintln!("Time is up, running final search..."),
    }
}
