//! Backend endpoint configuration

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Where the backend lives and how long to wait for it
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base address of the request/response API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Explicit streaming base address; derived from `api_url` when absent
    pub stream_url: Option<String>,

    /// Fallback request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base address of the streaming endpoint, without the conversation id.
    ///
    /// Uses `stream_url` verbatim when configured. Otherwise swaps the API
    /// scheme (`http` → `ws`, `https` → `wss`) and appends `/stream`.
    pub fn stream_base(&self) -> Result<String, ValidationError> {
        if let Some(explicit) = self.explicit_stream_url() {
            return Ok(explicit.trim_end_matches('/').to_string());
        }

        let mut url = parse_api_url(&self.api_url)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| ValidationError::InvalidApiUrl(self.api_url.clone()))?;
        let path = format!("{}/stream", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    /// Validate backend configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        parse_api_url(&self.api_url)?;

        if let Some(explicit) = self.explicit_stream_url() {
            let url = Url::parse(explicit)
                .map_err(|_| ValidationError::InvalidStreamUrl(explicit.to_string()))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(ValidationError::InvalidStreamUrl(explicit.to_string()));
            }
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    fn explicit_stream_url(&self) -> Option<&str> {
        self.stream_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            stream_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn parse_api_url(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw).map_err(|_| ValidationError::InvalidApiUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidApiUrl(raw.to_string()));
    }
    Ok(url)
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
