//! File search and upload pipeline
//!
//! Turns a user-supplied audio file into the canonical WAV container and
//! submits it to the match service, either as a new library song or as
//! a one-shot query.

use crate::audio;
use crate::error::{Result, VibeflowError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use vibeflow_api::{
    CandidateSummary, MatchCandidate, MatchService, NewRecording, RegenerateSummary, SearchRequest,
    SongUpload, UploadReceipt,
};
use vibeflow_wav::PcmBuffer;

pub const DEFAULT_ARTIST: &str = "Unknown";
pub const WAV_MIME: &str = "audio/wav";

/// Audio normalized and encoded, ready for submission
#[derive(Debug, Clone)]
pub struct PreparedAudio {
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub sample_count: usize,
    /// Whole seconds, rounded to nearest
    pub duration_secs: u64,
    pub byte_len: u64,
}

impl PreparedAudio {
    pub fn from_pcm(pcm: &PcmBuffer) -> Result<Self> {
        let wav = pcm.encode()?;
        Ok(Self {
            byte_len: wav.len() as u64,
            sample_rate: pcm.sample_rate(),
            sample_count: pcm.len(),
            duration_secs: pcm.duration_secs().round() as u64,
            wav,
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.wav)
    }
}

/// Decode any supported file format into the canonical container
pub fn prepare(bytes: &[u8], hint: Option<&str>) -> Result<PreparedAudio> {
    let pcm = audio::normalize(bytes, hint)?;
    let prepared = PreparedAudio::from_pcm(&pcm)?;
    log::info!(
        "Prepared {} samples at {} Hz ({}s, {} bytes)",
        prepared.sample_count,
        prepared.sample_rate,
        prepared.duration_secs,
        prepared.byte_len
    );
    Ok(prepared)
}

pub fn prepare_file(path: &Path) -> Result<PreparedAudio> {
    let pcm = audio::normalize_file(path)?;
    PreparedAudio::from_pcm(&pcm)
}

/// Add a song to the library
pub async fn upload_song(
    service: &dyn MatchService,
    audio: &PreparedAudio,
    title: &str,
    artist: Option<&str>,
) -> Result<UploadReceipt> {
    let title = title.trim();
    if title.is_empty() {
        return Err(VibeflowError::Validation("a song title is required".to_string()));
    }
    let artist = artist
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(DEFAULT_ARTIST);

    let upload = SongUpload {
        title: title.to_string(),
        artist: artist.to_string(),
        audio_base64: audio.to_base64(),
        file_type: WAV_MIME.to_string(),
        file_size: audio.byte_len,
        duration_seconds: audio.duration_secs,
    };

    let response = service.upload_song(&upload).await?;
    let receipt = response.data.ok_or_else(|| {
        VibeflowError::ExternalService(format!("upload returned no song: {}", response.message))
    })?;
    log::info!(
        "Uploaded '{}' by {} as song {} ({} fingerprints)",
        upload.title,
        upload.artist,
        receipt.song_id,
        receipt.fingerprints_generated
    );
    Ok(receipt)
}

/// Result of a one-shot file search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Match {
        best: MatchCandidate,
        /// Ranked below the best candidate, in service order
        alternates: Vec<CandidateSummary>,
        message: String,
    },
    NoMatch {
        message: String,
    },
}

impl SearchOutcome {
    pub fn best(&self) -> Option<&MatchCandidate> {
        match self {
            SearchOutcome::Match { best, .. } => Some(best),
            SearchOutcome::NoMatch { .. } => None,
        }
    }
}

pub async fn search_file(service: &dyn MatchService, audio: &PreparedAudio) -> Result<SearchOutcome> {
    let request = SearchRequest {
        audio_base64: audio.to_base64(),
    };
    let response = service.search(&request).await?;
    if !response.status {
        return Err(VibeflowError::ExternalService(response.message));
    }

    Ok(match response.data {
        Some(best) => {
            let alternates = best.alternates().to_vec();
            log::info!(
                "Best match '{}' by {} at {:.1}% ({} alternates)",
                best.title,
                best.artist,
                best.confidence,
                alternates.len()
            );
            SearchOutcome::Match {
                best,
                alternates,
                message: response.message,
            }
        }
        None => SearchOutcome::NoMatch {
            message: response.message,
        },
    })
}

/// Persist captured audio as a named recording
pub async fn save_recording(
    service: &dyn MatchService,
    name: &str,
    bytes: &[u8],
    file_type: &str,
    duration_secs: f64,
    sample_rate: u32,
) -> Result<serde_json::Value> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VibeflowError::Validation("a recording name is required".to_string()));
    }
    if bytes.is_empty() {
        return Err(VibeflowError::Validation("the recording is empty".to_string()));
    }

    let recording = NewRecording {
        name: name.to_string(),
        audio_base64: STANDARD.encode(bytes),
        duration_seconds: duration_secs,
        sample_rate,
        file_type: file_type.to_string(),
        file_size: bytes.len() as u64,
    };
    let response = service.create_recording(&recording).await?;
    log::info!("Saved recording '{}' ({} bytes)", recording.name, recording.file_size);
    Ok(response.data.unwrap_or(serde_json::Value::Null))
}

/// Download a saved recording and decode it for visualization
pub async fn fetch_recording(service: &dyn MatchService, id: i64) -> Result<PcmBuffer> {
    let bytes = service.recording_audio(id).await?;
    log::debug!("Fetched recording {} ({} bytes)", id, bytes.len());
    audio::normalize(&bytes, None)
}

/// Ask the service to recompute fingerprints for the whole library
pub async fn regenerate_all(service: &dyn MatchService) -> Result<RegenerateSummary> {
    let response = service.regenerate_all().await?;
    let summary = response.data.unwrap_or(RegenerateSummary {
        total_songs: 0,
        processed: 0,
        results: Vec::new(),
    });
    log::info!("Regenerated {}/{} songs", summary.processed, summary.total_songs);
    Ok(summary)
}
