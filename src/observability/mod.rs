//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway / http layer produce:
//!     → logging.rs (structured tracing events, request spans)
//!     → metrics.rs (forward counters and latency histogram)
//!
//! Consumers:
//!     → stdout / stderr / log file
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogLevel, LogOutput, LoggingError};
