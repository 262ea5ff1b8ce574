//! Ecowitt weather station relay library.

pub mod config;
pub mod forward;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::RelayConfig;
pub use gateway::EventGateway;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
