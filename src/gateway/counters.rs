//! Event and error counters.
//!
//! # Responsibilities
//! - Count successfully forwarded events
//! - Count failed submissions (bad input, transport failure, downstream rejection)
//! - Provide snapshots for responses and the status view
//!
//! # Design Decisions
//! - Lock-free: each counter is a single `AtomicU32`
//! - Wraps on overflow; these are operational metrics
//! - No ordering is promised across the two counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// Pair of monotonically increasing counters shared by all request tasks.
#[derive(Debug, Default)]
pub struct Counters {
    /// Events forwarded with a 200 from downstream.
    events: AtomicU32,
    /// Submissions that ended in an error response.
    errors: AtomicU32,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one forwarded event. Returns the new event count.
    pub fn record_event(&self) -> u32 {
        self.events.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Record one failed submission. Returns the new error count.
    pub fn record_error(&self) -> u32 {
        self.errors.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub fn events(&self) -> u32 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Read both counters. Each value is individually current; the pair is not
    /// read atomically.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            event_count: self.events(),
            error_count: self.errors(),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub event_count: u32,
    pub error_count: u32,
}
