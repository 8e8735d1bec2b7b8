use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid service URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with `status: false`
    #[error("service reported failure: {0}")]
    Service(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
