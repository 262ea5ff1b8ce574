//! Status view for operators.
//!
//! Plain data assembled from the gateway's read-only accessors. The auth
//! token only ever appears masked.

use serde::{Deserialize, Serialize};

use crate::gateway::EventGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    /// Address the relay listens on.
    pub address: String,
    pub downstream_url: String,
    pub webhook_id: String,
    /// Masked token.
    pub auth_token: String,
    pub event_count: u32,
    pub error_count: u32,
    pub version: String,
}

impl StatusView {
    pub fn collect(gateway: &EventGateway, address: &str) -> Self {
        let counts = gateway.snapshot_counts();
        Self {
            address: address.to_string(),
            downstream_url: gateway.downstream_base_url().to_string(),
            webhook_id: gateway.webhook_id().to_string(),
            auth_token: gateway.masked_auth_token(),
            event_count: counts.event_count,
            error_count: counts.error_count,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
