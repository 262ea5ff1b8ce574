//! Event gateway subsystem.
//!
//! # Data Flow
//! ```text
//! inbound form (parsed by http layer)
//!     → controller.rs (EventGateway::handle_event_submit)
//!     → forward::ForwardingClient → downstream webhook
//!     → classify outcome, counters.rs updated once
//!     → response.rs (EventResponse | ErrorResponse)
//! ```

pub mod controller;
pub mod counters;
pub mod response;

pub use controller::{mask_token, EventGateway, GatewayConfig, GatewayError, FORM_ERROR_MESSAGE};
pub use counters::{CounterSnapshot, Counters};
pub use response::{ErrorResponse, EventResponse, HealthResponse, ResponseStatus};
