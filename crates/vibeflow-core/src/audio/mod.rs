//! Audio source normalization
//!
//! Turns uploaded files, recordings and fetched audio into mono PCM at the
//! source's native rate. WAV, MP3, FLAC and Ogg Vorbis use dedicated pure
//! Rust decoders; MP4/AAC, Matroska/WebM and anything unrecognised go
//! through a symphonia probe.

mod decoder;
mod probe;

pub use decoder::{decode_bytes, downmix, AudioData};

use crate::error::{Result, VibeflowError};
use std::path::Path;
use vibeflow_wav::PcmBuffer;

/// Container formats recognised by the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Mp4,
    Aac,
    Webm,
    Unknown,
}

impl AudioFormat {
    /// Detect format from leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return AudioFormat::Wav;
        }
        if bytes.starts_with(b"fLaC") {
            return AudioFormat::Flac;
        }
        if bytes.starts_with(b"OggS") {
            return AudioFormat::Ogg;
        }
        if bytes.starts_with(b"ID3") {
            return AudioFormat::Mp3;
        }
        if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return AudioFormat::Webm;
        }
        if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
            return AudioFormat::Mp4;
        }
        if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0 {
            // Layer bits 00 mark an ADTS (AAC) header, anything else is MPEG audio
            return if bytes[1] & 0x06 == 0 {
                AudioFormat::Aac
            } else {
                AudioFormat::Mp3
            };
        }
        AudioFormat::Unknown
    }

    /// Detect format from a file name or MIME type
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.trim().to_ascii_lowercase();
        let key = match hint.split_once('/') {
            // MIME type such as `audio/mpeg`
            Some((kind, sub)) if !kind.is_empty() && !kind.contains('.') => {
                sub.split(';').next().unwrap_or(sub).to_string()
            }
            _ => Path::new(&hint)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string(),
        };

        match key.as_str() {
            "wav" | "wave" | "x-wav" | "vnd.wave" => AudioFormat::Wav,
            "mp3" | "mpeg" | "mpga" => AudioFormat::Mp3,
            "flac" | "x-flac" => AudioFormat::Flac,
            "ogg" | "oga" | "vorbis" => AudioFormat::Ogg,
            "mp4" | "m4a" | "x-m4a" => AudioFormat::Mp4,
            "aac" => AudioFormat::Aac,
            "webm" | "mkv" | "mka" | "x-matroska" => AudioFormat::Webm,
            _ => AudioFormat::Unknown,
        }
    }

    /// Magic bytes first, hint as fallback
    pub fn detect(bytes: &[u8], hint: Option<&str>) -> Self {
        match Self::sniff(bytes) {
            AudioFormat::Unknown => hint.map(Self::from_hint).unwrap_or(AudioFormat::Unknown),
            format => format,
        }
    }

    /// Extension handed to the symphonia probe
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            AudioFormat::Wav => Some("wav"),
            AudioFormat::Mp3 => Some("mp3"),
            AudioFormat::Flac => Some("flac"),
            AudioFormat::Ogg => Some("ogg"),
            AudioFormat::Mp4 => Some("mp4"),
            AudioFormat::Aac => Some("aac"),
            AudioFormat::Webm => Some("webm"),
            AudioFormat::Unknown => None,
        }
    }
}

/// Decode arbitrary audio bytes into mono PCM at the native rate
pub fn normalize(bytes: &[u8], hint: Option<&str>) -> Result<PcmBuffer> {
    let audio = decode_bytes(bytes, hint)?;
    log::debug!(
        "Decoded {} Hz, {} channel(s), {} ms",
        audio.sample_rate,
        audio.channels,
        audio.duration_ms
    );
    let mono = audio.to_mono();
    Ok(PcmBuffer::new(mono, audio.sample_rate)?)
}

/// Read and normalize an audio file, using its name as the format hint
pub fn normalize_file(path: &Path) -> Result<PcmBuffer> {
    if !path.is_file() {
        return Err(VibeflowError::Validation(format!(
            "Audio file not found: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)?;
    let hint = path.file_name().and_then(|n| n.to_str());
    normalize(&bytes, hint)
}
