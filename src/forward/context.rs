//! Per-request cancellation and deadline.
//!
//! The HTTP layer builds one context per inbound request and hands it to the
//! gateway. The forward call races the transport against [`RequestContext::done`].

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context finished before the forward call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    Cancelled,
    DeadlineExceeded(Duration),
}

/// Cancellation token plus an optional deadline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel, deadline: None }
    }

    /// Impose a deadline `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        match self.deadline {
            Some((existing, _)) if existing <= candidate => {}
            _ => self.deadline = Some((candidate, timeout)),
        }
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn done(&self) -> Abort {
        match self.deadline {
            Some((deadline, timeout)) => tokio::select! {
                _ = self.cancel.cancelled() => Abort::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Abort::DeadlineExceeded(timeout),
            },
            None => {
                self.cancel.cancelled().await;
                Abort::Cancelled
            }
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}
