//! Downstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! FormPayload (payload.rs)
//!     → ForwardingClient (client.rs): build URL, bearer header, form body
//!     → Transport (transport.rs): one POST, status + capped body
//!     → raced against RequestContext (context.rs): cancel / deadline
//!     → Ok(()) only on status 200
//! ```

pub mod client;
pub mod context;
pub mod payload;
pub mod transport;

pub use client::{ForwardError, ForwardingClient, SUCCESS_STATUS};
pub use context::{Abort, RequestContext};
pub use payload::{FormError, FormPayload, FORM_CONTENT_TYPE};
pub use transport::{
    OutboundRequest, ReqwestTransport, Transport, TransportConfig, TransportError,
    TransportResponse,
};
