//! The event gateway: one inbound event in, one response out.
//!
//! # Responsibilities
//! - Turn parsed form data into a forward attempt against the webhook
//! - Classify the outcome and update the counters exactly once
//! - Shape `EventResponse` / `ErrorResponse` values for the HTTP layer
//!
//! # Design Decisions
//! - Every failure is converted to an `ErrorResponse` here; nothing escapes
//! - Counters live in the gateway instance and are shared via `Arc`
//! - A submission dropped mid-flight still counts as an error

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::forward::{
    FormError, FormPayload, ForwardingClient, RequestContext, Transport,
};
use crate::gateway::counters::{CounterSnapshot, Counters};
use crate::gateway::response::{ErrorResponse, EventResponse, HealthResponse};
use crate::observability::metrics;

/// Message used when the inbound form cannot be read.
pub const FORM_ERROR_MESSAGE: &str = "error retrieving form parameters";

/// Immutable identity of the downstream target.
#[derive(Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the Home Assistant instance, e.g. `http://ha.local:8123`.
    pub downstream_base_url: String,
    /// Long-lived access token sent as a bearer credential.
    pub auth_token: String,
    /// Webhook id; the event is posted to `/api/webhook/{webhook_id}`.
    pub webhook_id: String,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("downstream_base_url", &self.downstream_base_url)
            .field("auth_token", &mask_token(&self.auth_token))
            .field("webhook_id", &self.webhook_id)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Accepts inbound events and relays them downstream.
pub struct EventGateway {
    config: GatewayConfig,
    target_url: String,
    counters: Arc<Counters>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for EventGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventGateway")
            .field("config", &self.config)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl EventGateway {
    /// Create a gateway. Fields must be non-empty; anything further is the
    /// configuration layer's job.
    pub fn new(config: GatewayConfig, transport: Arc<dyn Transport>) -> Result<Self, GatewayError> {
        if config.downstream_base_url.is_empty() {
            return Err(GatewayError::EmptyField("downstream_base_url"));
        }
        if config.auth_token.is_empty() {
            return Err(GatewayError::EmptyField("auth_token"));
        }
        if config.webhook_id.is_empty() {
            return Err(GatewayError::EmptyField("webhook_id"));
        }

        let target_url = format!(
            "{}/api/webhook/{}",
            config.downstream_base_url.trim_end_matches('/'),
            config.webhook_id
        );

        tracing::info!(
            target_url = %target_url,
            auth_token = %mask_token(&config.auth_token),
            "Event gateway created"
        );

        Ok(Self {
            config,
            target_url,
            counters: Arc::new(Counters::new()),
            transport,
        })
    }

    /// Forward one inbound event.
    ///
    /// `form` is the result of reading the inbound request; a read failure is
    /// counted and reported like any other failure.
    pub async fn handle_event_submit(
        &self,
        form: Result<FormPayload, FormError>,
        ctx: &RequestContext,
    ) -> Result<EventResponse, ErrorResponse> {
        let attempt = Attempt::new(&self.counters);

        let payload = match form {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Error retrieving form parameters");
                attempt.fail("form");
                return Err(ErrorResponse::new(FORM_ERROR_MESSAGE, e, self.snapshot_counts()));
            }
        };

        tracing::info!(
            target_url = %self.target_url,
            fields = payload.len(),
            "Forwarding event data"
        );
        tracing::debug!(payload = %payload.encode(), "Event payload");

        let client = ForwardingClient::new(&self.target_url, &self.config.auth_token, payload);
        let start = Instant::now();
        let result = client.forward(self.transport.as_ref(), ctx).await;
        metrics::record_forward_duration(start.elapsed(), result.is_ok());

        match result {
            Ok(()) => {
                attempt.succeed();
                Ok(self.handle_event_query())
            }
            Err(e) => {
                tracing::error!(error = %e, "Error posting event data to downstream");
                attempt.fail(e.reason());
                Err(ErrorResponse::new(
                    format!("error forwarding event to {}", self.target_url),
                    e,
                    self.snapshot_counts(),
                ))
            }
        }
    }

    /// Current counters, no side effects.
    pub fn handle_event_query(&self) -> EventResponse {
        EventResponse::ok(self.snapshot_counts())
    }

    pub fn handle_health_query(&self) -> HealthResponse {
        HealthResponse::ok()
    }

    pub fn snapshot_counts(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    pub fn downstream_base_url(&self) -> &str {
        &self.config.downstream_base_url
    }

    pub fn webhook_id(&self) -> &str {
        &self.config.webhook_id
    }

    /// Auth token with all but a short prefix hidden.
    pub fn masked_auth_token(&self) -> String {
        mask_token(&self.config.auth_token)
    }

    /// Full webhook URL events are posted to.
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Release resources. Nothing is held today.
    pub fn close(&self) {
        tracing::debug!("Event gateway closed");
    }
}

/// Mask a secret for display: a 4 character prefix when the token is long
/// enough to keep most of it hidden, otherwise nothing.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() > 8 {
        let prefix: String = token.chars().take(4).collect();
        format!("{prefix}...")
    } else {
        "****".to_string()
    }
}

/// Settles one submission against the counters exactly once.
///
/// Dropping an unsettled attempt (the request future was abandoned) records
/// an error.
struct Attempt<'a> {
    counters: &'a Counters,
    settled: bool,
}

impl<'a> Attempt<'a> {
    fn new(counters: &'a Counters) -> Self {
        Self { counters, settled: false }
    }

    fn succeed(mut self) {
        self.settled = true;
        self.counters.record_event();
        metrics::record_forwarded();
    }

    fn fail(mut self, reason: &'static str) {
        self.settled = true;
        self.counters.record_error();
        metrics::record_error(reason);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Event submission abandoned before completion");
            self.counters.record_error();
            metrics::record_error("abandoned");
        }
    }
}
