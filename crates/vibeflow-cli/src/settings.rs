//! Logger, configuration and client setup common to every binary

use anyhow::{Context, Result};
use std::path::Path;
use vibeflow_api::ApiClient;
use vibeflow_core::capture::{AudioInput, PlaybackInput};
use vibeflow_core::VibeflowConfig;

/// Default: warnings only, so stdout stays clean JSON.
/// Verbose: Info level. `RUST_LOG` still wins for specific modules.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// `--config` if given, else `vibeflow.toml` if present, else defaults
pub fn load_config(path: Option<&Path>) -> Result<VibeflowConfig> {
    let config = VibeflowConfig::resolve(path)?;
    log::info!("Service: {}", config.server.base_url);
    Ok(config)
}

pub fn api_client(config: &VibeflowConfig) -> Result<ApiClient> {
    ApiClient::new(&config.server.base_url, config.server.token.clone())
        .with_context(|| format!("Invalid service URL: {}", config.server.base_url))
}

/// Play an audio file through the capture path at real-time pace
pub fn file_input(path: &Path) -> Result<Box<dyn AudioInput>> {
    let pcm = vibeflow_core::audio::normalize_file(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    log::info!(
        "Simulating input from {} ({:.1}s @ {}Hz)",
        path.display(),
        pcm.duration_secs(),
        pcm.sample_rate()
    );
    Ok(Box::new(PlaybackInput::from_pcm(&pcm)))
}

/// Default input device
#[cfg(feature = "mic")]
pub fn mic_input() -> Result<Box<dyn AudioInput>> {
    let input = vibeflow_core::capture::CpalInput::open()?;
    Ok(Box::new(input))
}

#[cfg(not(feature = "mic"))]
pub fn mic_input() -> Result<Box<dyn AudioInput>> {
    anyhow::bail!("Built without microphone support; rebuild with --features mic or pass a file")
}
