use serde::{Deserialize, Serialize};

/// Envelope shared by every JSON endpoint of the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "none")]
    pub data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

/// Best identification reported by the match service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    #[serde(default)]
    pub song_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Temporally coherent hash matches
    #[serde(default)]
    pub matched_hashes: u32,
    /// Matches needed before the service confirms
    #[serde(default)]
    pub min_required: u32,
    /// Hashes generated from the query audio
    #[serde(default)]
    pub query_hashes: u32,
    /// Confidence percentage
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub is_confirmed: bool,
    /// Ranked list, best first
    #[serde(default)]
    pub candidates: Vec<CandidateSummary>,
}

impl MatchCandidate {
    /// Candidates ranked below the best one
    pub fn alternates(&self) -> &[CandidateSummary] {
        match self.candidates.first() {
            Some(first) if first.is_same_song(self) => &self.candidates[1..],
            _ => &self.candidates,
        }
    }
}

/// Entry of the ranked candidate list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    #[serde(default)]
    pub song_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub matched_hashes: u32,
    #[serde(default)]
    pub confidence: f64,
}

impl CandidateSummary {
    fn is_same_song(&self, best: &MatchCandidate) -> bool {
        match (self.song_id, best.song_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.title == best.title && self.artist == best.artist,
        }
    }
}

/// Body of `POST /api/shazam/upload/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongUpload {
    pub title: String,
    pub artist: String,
    /// Base64 of the canonical WAV container
    pub audio_base64: String,
    pub file_type: String,
    pub file_size: u64,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub song_id: i64,
    #[serde(default)]
    pub fingerprints_generated: u64,
}

/// Body of `POST /api/shazam/search/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub audio_base64: String,
}

/// Library entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub fingerprint_count: Option<u64>,
    #[serde(default)]
    pub has_audio: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Song {
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        parse_timestamp(self.created_at.as_deref())
    }

    /// Duration formatted as `m:ss`
    pub fn duration_label(&self) -> Option<String> {
        self.duration_seconds
            .map(|s| format!("{}:{:02}", s / 60, s % 60))
    }
}

/// Body of `PUT /api/shazam/{id}/update/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongUpdate {
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateResult {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fingerprints: u64,
    #[serde(default)]
    pub status: String,
}

/// Result of `POST /api/shazam/regenerate-all/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateSummary {
    #[serde(default)]
    pub total_songs: u64,
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub results: Vec<RegenerateResult>,
}

/// Body of `POST /api/recordings/create/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecording {
    pub name: String,
    /// Base64 of the audio in whatever format it was captured
    pub audio_base64: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub file_type: String,
    pub file_size: u64,
}

/// Saved recording as listed by `GET /api/recordings/mine/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Recording {
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        parse_timestamp(self.created_at.as_deref())
    }
}

/// Body of `PUT /api/recordings/{id}/update/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingUpdate {
    pub name: String,
}

fn parse_timestamp(raw: Option<&str>) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    raw.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1_048_576 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "status": true,
            "message": "ok",
            "data": {
                "song_id": 7,
                "title": "Song A",
                "artist": "Band",
                "matched_hashes": 40,
                "query_hashes": 900,
                "confidence": 81.5,
                "is_confirmed": true,
                "min_required": 25,
                "candidates": [
                    {"song_id": 7, "title": "Song A", "artist": "Band", "matched_hashes": 40, "confidence": 81.5},
                    {"song_id": 3, "title": "Song B", "artist": "Other", "matched_hashes": 6, "confidence": 12.2}
                ]
            }
        }"#;

        let resp: ApiResponse<MatchCandidate> = serde_json::from_str(json).unwrap();
        let best = resp.data.unwrap();
        assert!(best.is_confirmed);
        assert_eq!(best.min_required, 25);
        assert_eq!(best.alternates().len(), 1);
        assert_eq!(best.alternates()[0].title, "Song B");
    }

    #[test]
    fn test_null_data_is_no_match() {
        let json = r#"{"status": true, "data": null, "message": "No match"}"#;
        let resp: ApiResponse<MatchCandidate> = serde_json::from_str(json).unwrap();
        assert!(resp.status);
        assert!(resp.data.is_none());

        let json = r#"{"status": false, "message": "boom"}"#;
        let resp: ApiResponse<MatchCandidate> = serde_json::from_str(json).unwrap();
        assert!(!resp.status);
        assert_eq!(resp.message, "boom");
    }

    #[test]
    fn test_alternates_when_best_missing_from_list() {
        let best = MatchCandidate {
            song_id: Some(1),
            title: "A".into(),
            artist: "X".into(),
            matched_hashes: 10,
            min_required: 25,
            query_hashes: 100,
            confidence: 40.0,
            is_confirmed: false,
            candidates: vec![CandidateSummary {
                song_id: Some(2),
                title: "B".into(),
                artist: "Y".into(),
                matched_hashes: 3,
                confidence: 5.0,
            }],
        };
        assert_eq!(best.alternates().len(), 1);
    }

    #[test]
    fn test_song_listing() {
        let json = r#"{"id": 4, "title": "T", "artist": "A", "duration_seconds": 185,
                       "fingerprint_count": 1200, "has_audio": true,
                       "created_at": "2024-03-01T10:00:00+00:00"}"#;
        let song: Song = serde_json::from_str(json).unwrap();
        assert_eq!(song.duration_label().as_deref(), Some("3:05"));
        assert!(song.created_at().is_some());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1_048_576), "3.0 MB");
    }
}
