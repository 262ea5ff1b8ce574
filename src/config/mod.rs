//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment variables, then command-line flags, layered on top
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_file, resolve_config, ConfigError, ConfigOverrides};
pub use schema::{
    DownstreamConfig, LimitsConfig, ListenerConfig, LoggingConfig, ObservabilityConfig,
    RelayConfig,
};
pub use validation::{validate_config, ValidationError};
