//! Configuration loading and layering.
//!
//! Precedence, highest first: command-line flag, environment variable,
//! config file, built-in default.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::observability::{LogLevel, LogOutput};

/// File looked up in the home directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".ecowitt-relay.toml";

/// Environment variables per setting; the first non-empty one wins.
pub const ENV_ADDRESS: &[&str] = &["SERVER_ADDRESS", "ECOWITT_PROXY_ADDRESS"];
pub const ENV_PORT: &[&str] = &["SERVER_PORT", "ECOWITT_PROXY_PORT"];
pub const ENV_HASS_URL: &[&str] = &["HASS_URL", "ECOWITT_PROXY_HASS_URL"];
pub const ENV_HASS_AUTH_TOKEN: &[&str] = &["HASS_AUTH_TOKEN", "ECOWITT_PROXY_HASS_AUTH_TOKEN"];
pub const ENV_HASS_WEBHOOK_ID: &[&str] = &["HASS_WEBHOOK_ID", "ECOWITT_PROXY_HASS_WEBHOOK_ID"];
pub const ENV_LOG_LEVEL: &[&str] = &["ECOWITT_PROXY_LOGLEVEL"];
pub const ENV_OUTPUT: &[&str] = &["ECOWITT_PROXY_OUTPUT"];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub hass_url: Option<String>,
    pub hass_auth_token: Option<String>,
    pub hass_webhook_id: Option<String>,
    pub timeout_secs: Option<u64>,
    pub metrics_address: Option<String>,
    pub log_level: Option<LogLevel>,
    pub output: Option<LogOutput>,
}

/// Parse a TOML config file without validating it.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `$HOME/.ecowitt-relay.toml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE))
}

/// Config file to read: the explicit path, else the home default if it exists.
pub fn config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.is_file()),
    }
}

/// Build the effective configuration.
///
/// An explicit `config_path` must be readable. Without one, the default file
/// in the home directory is used only if it exists.
pub fn resolve_config<E>(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    env: E,
) -> Result<RelayConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let mut config = match config_file(config_path) {
        Some(path) => load_config(&path)?,
        None => RelayConfig::default(),
    };

    apply_env(&mut config, &env)?;
    apply_overrides(&mut config, overrides);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn lookup<E>(env: &E, names: &[&str]) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| env(name))
        .find(|value| !value.is_empty())
}

fn apply_env<E>(config: &mut RelayConfig, env: &E) -> Result<(), ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(address) = lookup(env, ENV_ADDRESS) {
        config.listener.address = address;
    }
    if let Some(port) = lookup(env, ENV_PORT) {
        config.listener.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::InvalidValue {
                key: "port",
                value: port.clone(),
                reason: e.to_string(),
            }
        })?;
    }
    if let Some(url) = lookup(env, ENV_HASS_URL) {
        config.downstream.url = url;
    }
    if let Some(token) = lookup(env, ENV_HASS_AUTH_TOKEN) {
        config.downstream.auth_token = token;
    }
    if let Some(webhook_id) = lookup(env, ENV_HASS_WEBHOOK_ID) {
        config.downstream.webhook_id = webhook_id;
    }
    if let Some(level) = lookup(env, ENV_LOG_LEVEL) {
        config.logging.level = level.parse().map_err(|e: crate::observability::LoggingError| {
            ConfigError::InvalidValue {
                key: "loglevel",
                value: level.clone(),
                reason: e.to_string(),
            }
        })?;
    }
    if let Some(output) = lookup(env, ENV_OUTPUT) {
        config.logging.output = LogOutput::from(output);
    }
    Ok(())
}

fn apply_overrides(config: &mut RelayConfig, overrides: &ConfigOverrides) {
    if let Some(address) = &overrides.address {
        config.listener.address = address.clone();
    }
    if let Some(port) = overrides.port {
        config.listener.port = port;
    }
    if let Some(url) = &overrides.hass_url {
        config.downstream.url = url.clone();
    }
    if let Some(token) = &overrides.hass_auth_token {
        config.downstream.auth_token = token.clone();
    }
    if let Some(webhook_id) = &overrides.hass_webhook_id {
        config.downstream.webhook_id = webhook_id.clone();
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        config.downstream.timeout_secs = timeout_secs;
    }
    if let Some(metrics_address) = &overrides.metrics_address {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = metrics_address.clone();
    }
    if let Some(level) = overrides.log_level {
        config.logging.level = level;
    }
    if let Some(output) = &overrides.output {
        config.logging.output = output.clone();
    }
}
