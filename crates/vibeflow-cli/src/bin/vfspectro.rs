//! vfspectro - Record and visualize audio
//!
//! Runs the spectrogram view over the microphone, an audio file or a
//! saved recording, then writes the final bar and waterfall images as PNG.
//!
//! Usage:
//!   vfspectro --seconds 10                      # default input device
//!   vfspectro --file song.mp3
//!   vfspectro --recording 12 --colormap viridis
//!   vfspectro --seconds 5 --save-as "kitchen radio"

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vibeflow_cli::output::print_json;
use vibeflow_cli::settings::{api_client, file_input, init_logger, load_config, mic_input};
use vibeflow_core::capture::{AudioInput, PlaybackInput};
use vibeflow_core::pipeline;
use vibeflow_core::visual::{save_png, ColorMap, SpectrogramMonitor};

#[derive(Parser, Debug)]
#[command(name = "vfspectro")]
#[command(about = "Render a live spectrogram and record the input", long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Defaults to vibeflow.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Visualize an audio file instead of the microphone
    #[arg(short, long, conflicts_with = "recording")]
    file: Option<PathBuf>,

    /// Visualize a saved recording by id
    #[arg(short, long)]
    recording: Option<i64>,

    /// Seconds to record from the microphone (Ctrl-C stops earlier)
    #[arg(short, long, default_value = "10")]
    seconds: u64,

    /// Color map: inferno, viridis, plasma, cool, violet
    #[arg(long)]
    colormap: Option<String>,

    /// Amplitude gain applied before coloring
    #[arg(short, long)]
    gain: Option<f32>,

    /// Directory for bars.png, waterfall.png and recording.wav
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Save the captured audio to the service under this name
    #[arg(long)]
    save_as: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct SpectroOutput {
    bars: String,
    waterfall: String,
    recording: String,
    duration_seconds: f64,
    frames_drawn: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<serde_json::Value>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = &args.colormap {
        config.visual.colormap = name.parse::<ColorMap>().map_err(anyhow::Error::msg)?;
    }
    if let Some(gain) = args.gain {
        config.visual.gain = gain;
    }
    config.validate()?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create output directory: {}", args.out_dir.display()))?;

    let (input, is_file): (Box<dyn AudioInput>, bool) = if let Some(path) = &args.file {
        (file_input(path)?, true)
    } else if let Some(id) = args.recording {
        let client = api_client(&config)?;
        let pcm = pipeline::fetch_recording(&client, id).await?;
        log::info!("Loaded recording {} ({:.1}s)", id, pcm.duration_secs());
        let playback: Box<dyn AudioInput> = Box::new(PlaybackInput::from_pcm(&pcm));
        (playback, true)
    } else {
        (mic_input()?, false)
    };

    let mut monitor = SpectrogramMonitor::new(config.visual.clone());
    monitor.start(input).await?;

    if is_file {
        tokio::select! {
            _ = monitor.wait_until_ended() => log::info!("Playback finished"),
            _ = tokio::signal::ctrl_c() => log::warn!("Interrupted, stopping"),
        }
    } else {
        eprintln!("Recording for {}s...", args.seconds);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {}
            _ = monitor.wait_until_ended() => log::warn!("Input device stopped"),
            _ = tokio::signal::ctrl_c() => log::warn!("Interrupted, stopping"),
        }
    }

    let capture = monitor.stop().await?;

    let bars_path = args.out_dir.join("bars.png");
    let waterfall_path = args.out_dir.join("waterfall.png");
    let wav_path = args.out_dir.join("recording.wav");
    save_png(capture.bars, &bars_path)?;
    save_png(capture.waterfall, &waterfall_path)?;

    let wav = capture.recording.to_wav()?;
    std::fs::write(&wav_path, &wav)
        .with_context(|| format!("Failed to write {}", wav_path.display()))?;

    let saved = match &args.save_as {
        Some(name) => {
            let client = api_client(&config)?;
            let saved = pipeline::save_recording(
                &client,
                name,
                &wav,
                "audio/wav",
                capture.recording.duration_secs(),
                capture.recording.sample_rate,
            )
            .await?;
            Some(saved)
        }
        None => None,
    };

    print_json(&SpectroOutput {
        bars: display(&bars_path),
        waterfall: display(&waterfall_path),
        recording: display(&wav_path),
        duration_seconds: capture.recording.duration_secs(),
        frames_drawn: capture.frames_drawn,
        saved,
    });

    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
