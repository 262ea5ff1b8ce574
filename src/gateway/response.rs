//! Response payloads returned by the gateway.

use serde::{Deserialize, Serialize};

use crate::gateway::counters::CounterSnapshot;

/// Outcome marker carried in every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Body of a successful submission or an event query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub status: ResponseStatus,
    pub event_count: u32,
    pub error_count: u32,
}

impl EventResponse {
    pub fn ok(counts: CounterSnapshot) -> Self {
        Self {
            status: ResponseStatus::Ok,
            event_count: counts.event_count,
            error_count: counts.error_count,
        }
    }
}

/// Body of a failed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: ResponseStatus,
    /// What the gateway was doing.
    pub message: String,
    /// Underlying cause.
    pub error: String,
    pub event_count: u32,
    pub error_count: u32,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error: impl ToString, counts: CounterSnapshot) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            error: error.to_string(),
            event_count: counts.event_count,
            error_count: counts.error_count,
        }
    }
}

/// Liveness marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ResponseStatus,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: ResponseStatus::Ok }
    }
}
