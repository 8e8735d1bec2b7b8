//! Runtime configuration
//!
//! Loaded from TOML; every field has a default so a partial file (or no
//! file at all) is valid.

use crate::error::{Result, VibeflowError};
use crate::visual::ColorMap;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "vibeflow.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VibeflowConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub visual: VisualConfig,
}

/// Match service location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Streaming endpoint; derived from `base_url` when absent
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Bearer token passed through to every request
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
            token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

impl ServerConfig {
    /// Streaming endpoint, `ws(s)://host/ws/shazam/`
    pub fn stream_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base_url.trim().trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws/shazam/", base)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Mono samples per transmitted frame
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
        }
    }
}

fn default_frame_size() -> usize {
    4096
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisualConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_db")]
    pub min_db: f32,
    #[serde(default = "default_max_db")]
    pub max_db: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub colormap: ColorMap,
    /// Bar amplification
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Waterfall rows per tick
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: u32,
    /// Redraw ticks per second
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_db: default_min_db(),
            max_db: default_max_db(),
            width: default_width(),
            height: default_height(),
            colormap: ColorMap::default(),
            gain: default_gain(),
            scroll_speed: default_scroll_speed(),
            fps: default_fps(),
        }
    }
}

fn default_fft_size() -> usize {
    2048
}
fn default_smoothing() -> f32 {
    0.8
}
fn default_min_db() -> f32 {
    -100.0
}
fn default_max_db() -> f32 {
    -30.0
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    300
}
fn default_gain() -> f32 {
    1.0
}
fn default_scroll_speed() -> u32 {
    1
}
fn default_fps() -> u32 {
    60
}

impl VibeflowConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: VibeflowConfig =
            toml::from_str(&content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path, then `vibeflow.toml` in the working directory, then defaults
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            log::info!("Using {}", fallback.display());
            return Self::load(fallback);
        }
        Ok(Self::default())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(VibeflowError::Validation(msg.to_string()));

        if self.server.base_url.trim().is_empty() {
            return invalid("server.base_url must not be empty");
        }
        if self.capture.frame_size == 0 {
            return invalid("capture.frame_size must be > 0");
        }
        let v = &self.visual;
        if v.fft_size < 32 || !v.fft_size.is_power_of_two() {
            return invalid("visual.fft_size must be a power of two >= 32");
        }
        if !(0.0..1.0).contains(&v.smoothing) {
            return invalid("visual.smoothing must be in [0, 1)");
        }
        if v.min_db >= v.max_db {
            return invalid("visual.min_db must be < visual.max_db");
        }
        if v.width == 0 || v.height == 0 {
            return invalid("visual.width and visual.height must be > 0");
        }
        if v.scroll_speed == 0 || v.fps == 0 {
            return invalid("visual.scroll_speed and visual.fps must be > 0");
        }
        if !(v.gain.is_finite() && v.gain > 0.0) {
            return invalid("visual.gain must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VibeflowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.frame_size, 4096);
        assert_eq!(config.visual.fft_size, 2048);
        assert_eq!(config.visual.colormap, ColorMap::Inferno);
    }

    #[test]
    fn test_stream_url_derivation() {
        let mut server = ServerConfig::default();
        assert_eq!(server.stream_url(), "ws://localhost:8000/ws/shazam/");

        server.base_url = "https://vibe.example.com/".into();
        assert_eq!(server.stream_url(), "wss://vibe.example.com/ws/shazam/");

        server.ws_url = Some("ws://other:9000/ws/shazam/".into());
        assert_eq!(server.stream_url(), "ws://other:9000/ws/shazam/");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [server]
            base_url = "http://10.0.0.2:8000"
            token = "abc"

            [visual]
            colormap = "viridis"
            gain = 1.5
        "#;

        let config: VibeflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.token.as_deref(), Some("abc"));
        assert_eq!(config.visual.colormap, ColorMap::Viridis);
        assert_eq!(config.visual.fft_size, 2048);
        assert_eq!(config.capture.frame_size, 4096);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = VibeflowConfig::default();
        config.visual.fft_size = 1000;
        assert!(config.validate().is_err());

        let mut config = VibeflowConfig::default();
        config.visual.min_db = -20.0;
        assert!(config.validate().is_err());

        let mut config = VibeflowConfig::default();
        config.capture.frame_size = 0;
        assert!(matches!(config.validate(), Err(VibeflowError::Validation(_))));
    }
}
