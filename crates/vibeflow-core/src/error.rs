use thiserror::Error;
use vibeflow_api::ApiError;
use vibeflow_wav::WavError;

#[derive(Debug, Error)]
pub enum VibeflowError {
    /// Input device refused or unavailable
    #[error("audio input unavailable: {0}")]
    PermissionDenied(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The match service answered but reported a failure
    #[error("match service error: {0}")]
    ExternalService(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Wav(#[from] WavError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ApiError> for VibeflowError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Service(msg) => VibeflowError::ExternalService(msg),
            ApiError::Decode(e) => VibeflowError::ExternalService(e.to_string()),
            other @ (ApiError::Http(_) | ApiError::Status { .. } | ApiError::InvalidUrl { .. }) => {
                VibeflowError::Connection(other.to_string())
            }
        }
    }
}

impl From<image::ImageError> for VibeflowError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => VibeflowError::Io(e),
            other => VibeflowError::Validation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, VibeflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_mapping() {
        let err: VibeflowError = ApiError::Service("bad audio".into()).into();
        assert!(matches!(err, VibeflowError::ExternalService(ref m) if m == "bad audio"));

        let err: VibeflowError = ApiError::Status {
            status: 502,
            url: "http://x/".into(),
        }
        .into();
        assert!(matches!(err, VibeflowError::Connection(_)));
    }

    #[test]
    fn test_wav_error_wraps() {
        let err: VibeflowError = WavError::InvalidSampleRate.into();
        assert!(matches!(err, VibeflowError::Wav(_)));
    }
}
