//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, body limit)
//!     → request.rs (read form fields from body and query)
//!     → gateway (forward, count)
//!     → response.rs (status code + JSON body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::{read_form, MakeRelayRequestId, X_REQUEST_ID};
pub use response::MessageResponse;
pub use server::{AppState, RelayServer};
pub use status::StatusView;
