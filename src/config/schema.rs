//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::forward::TransportConfig;
use crate::gateway::{mask_token, GatewayConfig};
use crate::observability::{LogLevel, LogOutput};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (address, port).
    pub listener: ListenerConfig,

    /// Home Assistant webhook target.
    pub downstream: DownstreamConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Log level and destination.
    pub logging: LoggingConfig,

    /// Metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address or host to listen on. Empty listens on all addresses.
    pub address: String,

    /// TCP port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8181,
        }
    }
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        let host = self.address.trim();
        if host.is_empty() {
            format!("0.0.0.0:{}", self.port)
        } else if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

/// Downstream webhook target.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Base URL of Home Assistant (e.g., "http://homeassistant.local:8123").
    pub url: String,

    /// Long-lived access token.
    pub auth_token: String,

    /// Webhook id registered in Home Assistant.
    pub webhook_id: String,

    /// Deadline for one forward attempt, in seconds.
    pub timeout_secs: u64,

    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,

    /// Cap on the downstream response body kept for diagnostics.
    pub max_response_bytes: usize,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: String::new(),
            webhook_id: String::new(),
            timeout_secs: 30,
            connect_timeout_secs: 5,
            max_response_bytes: 64 * 1024,
        }
    }
}

impl fmt::Debug for DownstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamConfig")
            .field("url", &self.url)
            .field("auth_token", &mask_token(&self.auth_token))
            .field("webhook_id", &self.webhook_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

impl DownstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            downstream_base_url: self.url.clone(),
            auth_token: self.auth_token.clone(),
            webhook_id: self.webhook_id.clone(),
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_response_bytes: self.max_response_bytes,
            ..TransportConfig::default()
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// "stdout", "stderr" or a file path.
    pub output: LogOutput,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Scrape listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9181".to_string(),
        }
    }
}
