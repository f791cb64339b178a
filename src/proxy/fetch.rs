//! Upstream fetcher
//!
//! Performs the outbound GET with disguised headers, following redirects
//! transparently. Text bodies are decoded eagerly; everything else stays a
//! byte stream so binary responses are never buffered in full.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use http::header::{HeaderMap, CONTENT_TYPE};
use http::StatusCode;
use reqwest::redirect;
use tracing::debug;

use crate::error::{MirageError, Result};

/// Response body, tagged by how it was materialized. Exactly one of the two:
/// text when the content-type contains "text", a stream otherwise.
pub enum UpstreamBody {
    Text(String),
    Stream(BoxStream<'static, reqwest::Result<Bytes>>),
}

/// Final response of the upstream hop (redirects already followed)
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_type: String,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    /// Decoded text body, if the response carried one
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            UpstreamBody::Text(text) => Some(text),
            UpstreamBody::Stream(_) => None,
        }
    }

    /// Whether the response is HTML text eligible for link rewriting
    pub fn is_html(&self) -> bool {
        self.content_type.contains("text/html") && matches!(self.body, UpstreamBody::Text(_))
    }
}

/// Upstream fetcher wrapping a shared reqwest client
pub struct UpstreamFetcher {
    client: reqwest::Client,
}

impl UpstreamFetcher {
    /// Create a fetcher with the given whole-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .map_err(|e| MirageError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET the target with the given headers. Any network, TLS, protocol or
    /// timeout failure maps to a fetch error; no retry is attempted.
    pub async fn fetch(&self, target: &url::Url, headers: HeaderMap) -> Result<UpstreamResponse> {
        let response = self
            .client
            .get(target.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| MirageError::Fetch(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        debug!(
            status = status.as_u16(),
            content_type = %content_type,
            "Upstream response for {}", target
        );

        let body = if content_type.contains("text") {
            let text = response
                .text()
                .await
                .map_err(|e| MirageError::Fetch(e.to_string()))?;
            UpstreamBody::Text(text)
        } else {
            UpstreamBody::Stream(Box::pin(response.bytes_stream()))
        };

        Ok(UpstreamResponse {
            status,
            headers,
            content_type,
            body,
        })
    }
}
