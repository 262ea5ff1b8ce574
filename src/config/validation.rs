//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required downstream fields present, URL usable
//! - Value ranges (timeouts and limits > 0, metrics address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid downstream URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid {field} {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let downstream = &config.downstream;

    if downstream.url.trim().is_empty() {
        errors.push(ValidationError::Missing("hass_url"));
    } else {
        match Url::parse(&downstream.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::InvalidUrl {
                url: downstream.url.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidUrl {
                url: downstream.url.clone(),
                reason: e.to_string(),
            }),
        }
    }
    if downstream.auth_token.is_empty() {
        errors.push(ValidationError::Missing("hass_auth_token"));
    }
    if downstream.webhook_id.is_empty() {
        errors.push(ValidationError::Missing("hass_webhook_id"));
    }

    if downstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero("downstream.timeout_secs"));
    }
    if downstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("downstream.connect_timeout_secs"));
    }
    if downstream.max_response_bytes == 0 {
        errors.push(ValidationError::Zero("downstream.max_response_bytes"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
