//! Upload client for the bytebin paste service

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upload rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Upload response contained no key")]
    MissingKey,
}

#[derive(Deserialize)]
struct KeyResponse {
    key: String,
}

/// Posts content to bytebin and returns the key it was stored under
///
/// Clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BytebinClient {
    http: Client,
    base_url: String,
}

impl BytebinClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, UploadError> {
        debug!(%base_url, %user_agent, ?timeout, "BytebinClient::new: called");
        let http = Client::builder().timeout(timeout).user_agent(user_agent).build()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, UploadError> {
        Self::new(&config.bytebin_url, &config.user_agent, config.upload_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload `content` and return its key
    pub async fn post_content(&self, content: Vec<u8>, content_type: &str) -> Result<String, UploadError> {
        let url = format!("{}post", self.base_url);
        debug!(%url, bytes = content.len(), %content_type, "BytebinClient::post_content: called");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(key_from_location);
        let key = match location {
            Some(key) => key,
            None => response.json::<KeyResponse>().await.map(|body| body.key).map_err(|e| {
                debug!(error = %e, "BytebinClient::post_content: no key in body");
                UploadError::MissingKey
            })?,
        };

        if key.is_empty() {
            return Err(UploadError::MissingKey);
        }
        info!(%key, "Uploaded content to bytebin");
        Ok(key)
    }
}

fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Last path segment of a `Location` header value
fn key_from_location(location: &str) -> Option<String> {
    let key = location.trim().trim_end_matches('/').rsplit('/').next()?;
    (!key.is_empty()).then(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://bytebin.example"), "https://bytebin.example/");
        assert_eq!(normalize_base_url("https://bytebin.example/"), "https://bytebin.example/");
    }

    #[test]
    fn test_key_from_location() {
        assert_eq!(key_from_location("abc123"), Some("abc123".to_string()));
        assert_eq!(key_from_location("/abc123"), Some("abc123".to_string()));
        assert_eq!(key_from_location("https://bytebin.example/abc123"), Some("abc123".to_string()));
        assert_eq!(key_from_location(""), None);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            bytebin_url: "https://paste.example".to_string(),
            ..Default::default()
        };
        let client = BytebinClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://paste.example/");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let client = BytebinClient::new("http://127.0.0.1:9/", "flare-test", Duration::from_secs(2)).unwrap();
        let err = client.post_content(b"{}".to_vec(), "application/json").await.unwrap_err();
        assert!(matches!(err, UploadError::Network(_)));
    }
}
