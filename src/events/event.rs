//! # Lifecycle events emitted by the registry and node instances.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Registry events**: instance registration, restart requests, start exhaustion
//! - **Instance events**: start attempts, stop requests and their outcome
//!
//! The [`Event`] struct carries metadata such as timestamps, port, attempt,
//! the observed [`NodeStatus`] and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use nodevisor::{Event, EventKind, NodeStatus};
//!
//! let ev = Event::new(EventKind::StopFailed)
//!     .with_port(8545)
//!     .with_status(NodeStatus::Stopping)
//!     .with_reason("close hung");
//!
//! assert_eq!(ev.kind, EventKind::StopFailed);
//! assert_eq!(ev.port, Some(8545));
//! assert_eq!(ev.reason.as_deref(), Some("close hung"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::node::NodeStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A new instance was registered for a port.
    ///
    /// Sets: `port`
    NodeRegistered,

    /// `acquire` found the port's instance still running and is stopping it first.
    ///
    /// Sets: `port`, `status`
    RestartRequested,

    /// Every start attempt failed; `acquire` gives up.
    ///
    /// Sets: `port`, `attempt` (attempts made), `reason`
    StartExhausted,

    // === Instance events ===
    /// A start attempt begins (process launched, about to listen).
    ///
    /// Sets: `port`, `attempt` (1-based within one `acquire`)
    NodeStarting,

    /// The process is listening.
    ///
    /// Sets: `port`, `attempt`, `status`
    NodeStarted,

    /// A start attempt failed.
    ///
    /// Sets: `port`, `attempt`, `reason`
    StartFailed,

    /// `quit` is closing the process.
    ///
    /// Sets: `port`, `status` (before close)
    NodeStopping,

    /// The process reached its final state after `quit` (closed, or confirmed by polling).
    ///
    /// Sets: `port`, `status`
    NodeStopped,

    /// `close` failed; status polling follows.
    ///
    /// Sets: `port`, `status` (at failure), `reason`
    StopFailed,

    /// Polling never observed `Stopped`; the failure is swallowed.
    ///
    /// Sets: `port`, `status` (last observed), `reason` (optional)
    StopUnconfirmed,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Port of the instance.
    pub port: Option<u16>,
    /// Attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Node status observed when the event was produced.
    pub status: Option<NodeStatus>,
    /// Human-readable reason (errors, details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            port: None,
            attempt: None,
            status: None,
            reason: None,
        }
    }

    /// Attaches the instance port.
    #[inline]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches the observed status.
    #[inline]
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::NodeStarting);
        let b = Event::new(EventKind::NodeStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_fill_fields() {
        let ev = Event::new(EventKind::StartFailed)
            .with_port(7545)
            .with_attempt(2)
            .with_reason(String::from("address in use"));
        assert_eq!(ev.port, Some(7545));
        assert_eq!(ev.attempt, Some(2));
        assert_eq!(ev.status, None);
        assert_eq!(ev.reason.as_deref(), Some("address in use"));
    }
}
