//! Service abstraction used by the file pipeline
//!
//! Lets callers swap the HTTP client for an in-memory double.

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::*;
use async_trait::async_trait;

#[async_trait]
pub trait MatchService: Send + Sync {
    async fn upload_song(&self, upload: &SongUpload) -> Result<ApiResponse<UploadReceipt>>;

    async fn search(&self, request: &SearchRequest) -> Result<ApiResponse<MatchCandidate>>;

    async fn create_recording(&self, recording: &NewRecording) -> Result<ApiResponse<serde_json::Value>>;

    async fn recording_audio(&self, id: i64) -> Result<Vec<u8>>;

    async fn regenerate_all(&self) -> Result<ApiResponse<RegenerateSummary>>;
}

#[async_trait]
impl MatchService for ApiClient {
    async fn upload_song(&self, upload: &SongUpload) -> Result<ApiResponse<UploadReceipt>> {
        ApiClient::upload_song(self, upload).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<ApiResponse<MatchCandidate>> {
        ApiClient::search(self, request).await
    }

    async fn create_recording(&self, recording: &NewRecording) -> Result<ApiResponse<serde_json::Value>> {
        ApiClient::create_recording(self, recording).await
    }

    async fn recording_audio(&self, id: i64) -> Result<Vec<u8>> {
        ApiClient::recording_audio(self, id).await
    }

    async fn regenerate_all(&self) -> Result<ApiResponse<RegenerateSummary>> {
        ApiClient::regenerate_all(self).await
    }
}
