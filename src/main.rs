//! Ecowitt weather station relay.
//!
//! Accepts form-encoded observations from Ecowitt gateways and forwards them
//! to a Home Assistant webhook.
//!
//! # Architecture Overview
//!
//! ```text
//!     Ecowitt gateway                                          Home Assistant
//!          │                                                         ▲
//!          │ POST /event (form)                                      │ POST /api/webhook/{id}
//!          ▼                                                         │ Bearer token
//!     ┌─────────┐    ┌─────────────┐    ┌──────────────┐    ┌───────────────┐
//!     │  http   │───▶│   gateway   │───▶│   forward    │───▶│   transport   │
//!     │ server  │    │  counters   │    │ client + ctx │    │   (reqwest)   │
//!     └─────────┘    └─────────────┘    └──────────────┘    └───────────────┘
//!
//!     Cross-cutting: config, lifecycle (startup/shutdown/signals), observability
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use ecowitt_relay::config::{config_file, resolve_config, ConfigOverrides};
use ecowitt_relay::config::loader::process_env;
use ecowitt_relay::lifecycle::{self, shutdown_on_signal, Shutdown};
use ecowitt_relay::observability::{init_logging, LogLevel, LogOutput};

#[derive(Parser)]
#[command(name = "ecowitt-relay", version)]
#[command(about = "A lightweight relay from Ecowitt weather stations to Home Assistant")]
struct Cli {
    /// Config file (default is $HOME/.ecowitt-relay.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level. One of: OFF, DEBUG, INFO, WARN, ERROR
    #[arg(long, global = true)]
    loglevel: Option<LogLevel>,

    /// Log output: stdout, stderr, or a file path
    #[arg(short, long, global = true)]
    output: Option<LogOutput>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on; empty listens on all addresses
    #[arg(short, long = "listen_address", alias = "listen-address")]
    listen_address: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Home Assistant base URL
    #[arg(short = 'u', long = "hass_url", alias = "hass-url")]
    hass_url: Option<String>,

    /// Home Assistant long-lived access token
    #[arg(short = 'a', long = "hass_auth_token", alias = "hass-auth-token")]
    hass_auth_token: Option<String>,

    /// Home Assistant webhook id
    #[arg(short = 'w', long = "hass_webhook_id", alias = "hass-webhook-id")]
    hass_webhook_id: Option<String>,

    /// Deadline for one forward to Home Assistant, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Enable the Prometheus exporter on this address
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let Commands::Serve(serve) = &self.command;
        ConfigOverrides {
            address: serve.listen_address.clone(),
            port: serve.port,
            hass_url: serve.hass_url.clone(),
            hass_auth_token: serve.hass_auth_token.clone(),
            hass_webhook_id: serve.hass_webhook_id.clone(),
            timeout_secs: serve.timeout_secs,
            metrics_address: serve.metrics_address.clone(),
            log_level: self.loglevel,
            output: self.output.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match serve(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_file = config_file(cli.config.as_deref());
    let config = resolve_config(config_file.as_deref(), &cli.overrides(), process_env)?;
    init_logging(config.logging.level, &config.logging.output)?;

    if let Some(path) = &config_file {
        tracing::info!(path = %path.display(), "Using config file");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ecowitt-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        max_body_bytes = config.limits.max_body_bytes,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration resolved"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    lifecycle::run(config, shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags_accept_underscore_and_dash_forms() {
        let cli = Cli::try_parse_from([
            "ecowitt-relay",
            "--loglevel",
            "debug",
            "serve",
            "--listen_address",
            "127.0.0.1",
            "--hass_url",
            "http://ha.local:8123",
            "--hass-auth-token",
            "token",
            "--hass_webhook_id",
            "hook",
            "-p",
            "9000",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.address.as_deref(), Some("127.0.0.1"));
        assert_eq!(overrides.hass_url.as_deref(), Some("http://ha.local:8123"));
        assert_eq!(overrides.hass_auth_token.as_deref(), Some("token"));
        assert_eq!(overrides.hass_webhook_id.as_deref(), Some("hook"));
        assert_eq!(overrides.port, Some(9000));
        assert_eq!(overrides.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_dash_aliases() {
        let cli = Cli::try_parse_from([
            "ecowitt-relay",
            "serve",
            "--listen-address",
            "::1",
            "--hass-url",
            "http://ha.local:8123",
            "--hass-webhook-id",
            "hook",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.address.as_deref(), Some("::1"));
        assert_eq!(overrides.hass_url.as_deref(), Some("http://ha.local:8123"));
        assert_eq!(overrides.hass_webhook_id.as_deref(), Some("hook"));
    }
}
