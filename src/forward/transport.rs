//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Perform one POST with the headers and body prepared by the forwarding client
//! - Report the downstream status code and a bounded copy of the body
//! - Classify transport failures (connect, timeout, other)
//!
//! # Design Decisions
//! - The transport is a capability trait injected into the gateway so tests can
//!   substitute a double without touching gateway logic
//! - Redirects are never followed; a 3xx is reported to the caller as-is
//! - Connection pooling belongs to the transport, not the forwarding client

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default cap on captured response bodies.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;

const TRUNCATED_SUFFIX: &str = "... (truncated)";

/// A fully prepared outbound POST.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
}

/// What the downstream answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Response body, capped by the transport.
    pub body: String,
}

/// Transport-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be built by the HTTP client.
    #[error("invalid request: {0}")]
    Build(String),

    /// DNS failure or connection refused.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The client's own timeout fired.
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Request(String),
}

/// Anything that can perform an authenticated POST and return status + body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// Settings for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub max_response_bytes: usize,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("ecowitt-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Production transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    max_response_bytes: usize,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Build(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }

    pub fn with_defaults() -> Result<Self, TransportError> {
        Self::new(&TransportConfig::default())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = read_capped(response, self.max_response_bytes).await;

        Ok(TransportResponse { status, body })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    let message = error_chain(&e);
    if e.is_builder() {
        TransportError::Build(message)
    } else if e.is_timeout() {
        TransportError::Timeout(message)
    } else if e.is_connect() {
        TransportError::Connect(message)
    } else {
        TransportError::Request(message)
    }
}

/// Render an error with its sources, `outer: inner: root`.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

async fn read_capped(mut response: reqwest::Response, limit: usize) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let mut truncated = false;

    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = limit.saturating_sub(buf.len());
                if chunk.len() > room {
                    buf.extend_from_slice(&chunk[..room]);
                    truncated = true;
                    break;
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read downstream response body");
                break;
            }
        }
    }

    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str(TRUNCATED_SUFFIX);
    }
    text
}
