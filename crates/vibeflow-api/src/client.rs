//! HTTP connection management

use crate::error::{ApiError, Result};
use crate::models::ApiResponse;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Upper bound for a single request; uploads of long songs are the slow case
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the REST side of the match service
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let base = Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", base.scheme()),
            });
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a path relative to the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and unwrap the JSON envelope.
    ///
    /// `status: false` becomes [`ApiError::Service`] whatever the HTTP code.
    pub(crate) async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        log::debug!("{} {}", method, url);

        let mut builder = self.request(method, url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let envelope: ApiResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if !envelope.status {
            return Err(ApiError::Service(envelope.message));
        }
        Ok(envelope)
    }

    /// Fetch a raw binary body
    pub(crate) async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(path)?;
        log::debug!("GET {}", url);

        let response = self.request(Method::GET, url.clone()).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            // Failures still carry the JSON envelope
            if let Ok(envelope) = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&bytes) {
                return Err(ApiError::Service(envelope.message));
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let client = ApiClient::new("http://localhost:8000", None).unwrap();
        assert_eq!(
            client.endpoint("/api/shazam/search/").unwrap().as_str(),
            "http://localhost:8000/api/shazam/search/"
        );

        let client = ApiClient::new("https://example.com/vibeflow", None).unwrap();
        assert_eq!(
            client.endpoint("api/recordings/mine/").unwrap().as_str(),
            "https://example.com/vibeflow/api/recordings/mine/"
        );
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(matches!(
            ApiClient::new("ftp://example.com", None),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(ApiClient::new("not a url", None).is_err());
    }

    #[test]
    fn test_empty_token_ignored() {
        let client = ApiClient::new("http://localhost:8000", Some(String::new())).unwrap();
        assert!(client.token.is_none());
    }
}
