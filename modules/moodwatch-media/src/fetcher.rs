// Remote media fetching. The trait is the seam between mirroring/proxying
// and the network so both can be exercised without a live upstream.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::error::{MediaError, Result};

/// Redirect hops followed before a fetch is abandoned.
pub const MAX_REDIRECTS: usize = 5;

/// A single GET with caller-chosen headers and timeout.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Value of a header previously set on this request (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Upstream response after redirects have been followed.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedMedia {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Issue the request. Transport failures and timeouts are errors;
    /// any HTTP status is returned for the caller to judge.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedMedia>;
}

/// reqwest-backed fetcher with a bounded redirect policy.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| MediaError::FetchFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedMedia> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MediaError::FetchFailed(format!("{}: {e}", request.url)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| MediaError::FetchFailed(format!("{}: {e}", request.url)))?;

        debug!(url = %request.url, status, bytes = body.len(), "media fetch complete");

        Ok(FetchedMedia {
            status,
            content_type,
            body,
        })
    }
}
