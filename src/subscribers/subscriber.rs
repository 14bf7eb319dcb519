//! # Lifecycle event subscriber trait.
//!
//! [`Subscribe`] is the extension point for reacting to node lifecycle events
//! (test reporters, audit trails, metrics exporters).
//!
//! ## Architecture
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//!                                    └─► panic caught → tracing::warn!
//! ```
//!
//! ## Rules
//! - [`Subscribe::accepts`] filters events before they are queued.
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event for this subscriber only and logs a warning.
//! - Events are processed sequentially (FIFO) per subscriber.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use nodevisor::{Event, EventKind, Subscribe};
//!
//! struct StopAudit;
//!
//! #[async_trait]
//! impl Subscribe for StopAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         // record ev.port: it refused to stop
//!     }
//!
//!     fn accepts(&self, ev: &Event) -> bool {
//!         ev.kind == EventKind::StopUnconfirmed
//!     }
//!
//!     fn name(&self) -> &'static str { "stop-audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of lifecycle events.
///
/// Runs on a dedicated worker task; never called from the publisher's context.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event. Panics are caught and logged.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic warnings.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Interest filter, checked before queueing. Default: every event.
    fn accepts(&self, _event: &Event) -> bool {
        true
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
