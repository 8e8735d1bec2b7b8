//! VibeFlow service client
//!
//! Typed access to the song library, one-shot search and recording
//! persistence endpoints of the external match service.

pub mod client;
pub mod error;
pub mod models;
pub mod operations;
pub mod service;

// Re-export commonly used types
pub use client::ApiClient;
pub use error::ApiError;
pub use models::{
    format_bytes, ApiResponse, CandidateSummary, MatchCandidate, NewRecording, Recording,
    RecordingUpdate, RegenerateResult, RegenerateSummary, SearchRequest, Song, SongUpdate,
    SongUpload, UploadReceipt,
};
pub use service::MatchService;
