//! Single-use forwarding client.
//!
//! Builds the authenticated outbound request for one event and interprets the
//! downstream answer. Success is a status of exactly 200; every other status,
//! 2xx included, is a rejection.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;
use url::Url;

use crate::forward::context::{Abort, RequestContext};
use crate::forward::payload::{FormPayload, FORM_CONTENT_TYPE};
use crate::forward::transport::{OutboundRequest, Transport, TransportError};

/// The only downstream status treated as success.
pub const SUCCESS_STATUS: u16 = 200;

/// Why a forward attempt failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForwardError {
    /// Target URL or header values are unusable.
    #[error("error creating HTTP request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    #[error("error making request to {url:?}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("request to {url:?} cancelled")]
    Cancelled { url: String },

    #[error("request to {url:?} timed out after {timeout:?}")]
    DeadlineExceeded { url: String, timeout: Duration },

    /// Downstream answered with something other than 200.
    #[error("error making request to {url:?}. Response code: {status}. Response: {body}")]
    Rejected { url: String, status: u16, body: String },
}

impl ForwardError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ForwardError::InvalidRequest { .. } => "request",
            ForwardError::Transport { .. } => "transport",
            ForwardError::Cancelled { .. } | ForwardError::DeadlineExceeded { .. } => "cancelled",
            ForwardError::Rejected { .. } => "rejected",
        }
    }
}

/// One forward attempt: target, credentials and the immutable payload.
#[derive(Debug)]
pub struct ForwardingClient {
    target_url: String,
    auth_token: String,
    payload: FormPayload,
}

impl ForwardingClient {
    pub fn new(
        target_url: impl Into<String>,
        auth_token: impl Into<String>,
        payload: FormPayload,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            auth_token: auth_token.into(),
            payload,
        }
    }

    /// Build the outbound request without sending it.
    pub fn build_request(&self) -> Result<OutboundRequest, ForwardError> {
        let invalid = |reason: String| ForwardError::InvalidRequest {
            url: self.target_url.clone(),
            reason,
        };

        let url = Url::parse(&self.target_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", self.auth_token))
            .map_err(|_| invalid("auth token is not a valid header value".to_string()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        Ok(OutboundRequest {
            url,
            headers,
            body: self.payload.encode(),
        })
    }

    /// Perform the forward attempt. Consumes the client.
    ///
    /// Returns as soon as `ctx` is cancelled or its deadline passes; the
    /// in-flight transport future is dropped at that point.
    pub async fn forward(
        self,
        transport: &dyn Transport,
        ctx: &RequestContext,
    ) -> Result<(), ForwardError> {
        let request = self.build_request()?;
        let url = self.target_url;
        let span = tracing::debug_span!("forward", url = %url);

        async move {
            tracing::debug!(body_len = request.body.len(), "Sending event to downstream");

            let response = tokio::select! {
                biased;
                abort = ctx.done() => {
                    tracing::warn!(?abort, "Forward aborted by request context");
                    return Err(match abort {
                        Abort::Cancelled => ForwardError::Cancelled { url },
                        Abort::DeadlineExceeded(timeout) => ForwardError::DeadlineExceeded { url, timeout },
                    });
                }
                result = transport.post(request) => result,
            };

            let response = response.map_err(|source| ForwardError::Transport {
                url: url.clone(),
                source,
            })?;

            if response.status != SUCCESS_STATUS {
                tracing::warn!(status = response.status, "Downstream rejected event");
                return Err(ForwardError::Rejected {
                    url,
                    status: response.status,
                    body: response.body,
                });
            }

            tracing::debug!("Downstream accepted event");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
