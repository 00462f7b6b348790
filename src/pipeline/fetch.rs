//! Content fetching: the only stage with network I/O.
//!
//! Two operations, one code path: `fetch_text` for the document body and
//! `fetch_binary` for images differ only in how the response body is
//! decoded, so both go through a single `get()` helper that attaches the
//! credential and maps transport/status failures onto the error taxonomy.
//!
//! The trait exists so the inliner can be driven by a mock in tests —
//! simulating a failing image without a network — mirroring how callers can
//! inject custom transport (caching, proxies) in production.

use crate::error::Readme2HtmlError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;
use tracing::debug;

/// Raw bytes plus the server's declared content type, if any.
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Retrieves document text and image bytes, optionally authenticated.
///
/// No retry policy lives here; if a caller wants retries it wraps the
/// fetcher.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch a UTF-8 text document.
    async fn fetch_text(&self, url: &str) -> Result<String, Readme2HtmlError>;

    /// Fetch raw bytes (images), keeping the declared content type.
    async fn fetch_binary(&self, url: &str) -> Result<FetchedBytes, Readme2HtmlError>;
}

/// Production fetcher backed by a shared [`reqwest::Client`].
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a fetcher with the given per-request timeout and optional
    /// access token. The token is attached to every request as
    /// `Authorization: token <t>` — the header form GitHub's raw host
    /// accepts for personal access tokens.
    pub fn new(timeout_secs: u64, token: Option<&str>) -> Result<Self, Readme2HtmlError> {
        let mut headers = HeaderMap::new();
        if let Some(t) = token {
            let value = HeaderValue::from_str(&format!("token {t}")).map_err(|_| {
                Readme2HtmlError::InvalidConfig("token contains invalid header characters".into())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("readme2html/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Readme2HtmlError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Issue a GET and map failures onto the error taxonomy. Both public
    /// operations share this path; they differ only in body decoding.
    async fn get(&self, url: &str) -> Result<reqwest::Response, Readme2HtmlError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Readme2HtmlError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                Readme2HtmlError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Readme2HtmlError::FetchFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, Readme2HtmlError> {
        debug!("Fetching text: {}", url);
        let response = self.get(url).await?;
        response.text().await.map_err(|e| Readme2HtmlError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_binary(&self, url: &str) -> Result<FetchedBytes, Readme2HtmlError> {
        debug!("Fetching binary: {}", url);
        let response = self.get(url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            // Strip charset parameters: "image/svg+xml; charset=utf-8"
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Readme2HtmlError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(FetchedBytes {
            bytes,
            content_type,
        })
    }
}
