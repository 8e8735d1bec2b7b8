//! Endpoint wrappers

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::*;
use reqwest::Method;

const SHAZAM: &str = "api/shazam/";
const RECORDINGS: &str = "api/recordings/";

/// Body type for requests that carry none
type NoBody = ();

impl ApiClient {
    /// Upload a song; the service generates its fingerprints
    pub async fn upload_song(&self, upload: &SongUpload) -> Result<ApiResponse<UploadReceipt>> {
        self.call(Method::POST, &format!("{}upload/", SHAZAM), Some(upload))
            .await
    }

    /// One-shot search. `data` is `None` when nothing matched.
    pub async fn search(&self, request: &SearchRequest) -> Result<ApiResponse<MatchCandidate>> {
        self.call(Method::POST, &format!("{}search/", SHAZAM), Some(request))
            .await
    }

    pub async fn list_songs(&self) -> Result<Vec<Song>> {
        let resp: ApiResponse<Vec<Song>> = self.call::<NoBody, _>(Method::GET, SHAZAM, None).await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn update_song(&self, id: i64, update: &SongUpdate) -> Result<ApiResponse<serde_json::Value>> {
        self.call(Method::PUT, &format!("{}{}/update/", SHAZAM, id), Some(update))
            .await
    }

    pub async fn delete_song(&self, id: i64) -> Result<ApiResponse<serde_json::Value>> {
        self.call::<NoBody, _>(Method::DELETE, &format!("{}{}/delete/", SHAZAM, id), None)
            .await
    }

    /// Raw stored audio of a song
    pub async fn song_audio(&self, id: i64) -> Result<Vec<u8>> {
        self.fetch_bytes(&format!("{}{}/audio/", SHAZAM, id)).await
    }

    pub async fn regenerate_song(&self, id: i64) -> Result<ApiResponse<serde_json::Value>> {
        self.call::<NoBody, _>(Method::POST, &format!("{}{}/regenerate/", SHAZAM, id), None)
            .await
    }

    /// Ask the service to rebuild fingerprints for the whole library
    pub async fn regenerate_all(&self) -> Result<ApiResponse<RegenerateSummary>> {
        self.call::<NoBody, _>(Method::POST, &format!("{}regenerate-all/", SHAZAM), None)
            .await
    }

    pub async fn create_recording(&self, recording: &NewRecording) -> Result<ApiResponse<serde_json::Value>> {
        self.call(Method::POST, &format!("{}create/", RECORDINGS), Some(recording))
            .await
    }

    pub async fn my_recordings(&self) -> Result<Vec<Recording>> {
        let resp: ApiResponse<Vec<Recording>> = self
            .call::<NoBody, _>(Method::GET, &format!("{}mine/", RECORDINGS), None)
            .await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn recording_audio(&self, id: i64) -> Result<Vec<u8>> {
        self.fetch_bytes(&format!("{}{}/audio/", RECORDINGS, id)).await
    }

    pub async fn update_recording(&self, id: i64, update: &RecordingUpdate) -> Result<ApiResponse<serde_json::Value>> {
        self.call(Method::PUT, &format!("{}{}/update/", RECORDINGS, id), Some(update))
            .await
    }

    pub async fn delete_recording(&self, id: i64) -> Result<ApiResponse<serde_json::Value>> {
        self.call::<NoBody, _>(Method::DELETE, &format!("{}{}/delete/", RECORDINGS, id), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_body_shape() {
        let upload = SongUpload {
            title: "T".into(),
            artist: "A".into(),
            audio_base64: "UklGRg==".into(),
            file_type: "audio/wav".into(),
            file_size: 4,
            duration_seconds: 3,
        };
        let value = serde_json::to_value(&upload).unwrap();
        for key in ["title", "artist", "audio_base64", "file_type", "file_size", "duration_seconds"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_http_error() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client.list_songs().await.unwrap_err();
        assert!(matches!(err, crate::ApiError::Http(_)));
    }
}
