//! # Lifecycle event bus.
//!
//! One [`Bus`] per registry. The registry publishes registry-level events on
//! it directly; every [`NodeInstance`](crate::NodeInstance) holds a
//! [`PortPublisher`] that stamps its own port on whatever it publishes.
//!
//! ```text
//! NodeRegistry ────────────────┐
//! PortPublisher(8545) ─ :8545 ─┼──► Bus ──┬──► registry listener ──► SubscriberSet
//! PortPublisher(7545) ─ :7545 ─┘          └──► NodeRegistry::subscribe()
//! ```
//!
//! Publishing never waits. A receiver that falls more than `capacity` events
//! behind sees `RecvError::Lagged(n)`; events sent while nobody listens are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events. Clones share one channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus retaining at most `capacity` undelivered events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev`; returns how many receivers will see it.
    pub fn publish(&self, ev: Event) -> usize {
        self.tx.send(ev).unwrap_or(0)
    }

    /// Receiver for events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publisher that stamps `port` on every event.
    pub fn for_port(&self, port: u16) -> PortPublisher {
        PortPublisher {
            port,
            bus: self.clone(),
        }
    }
}

/// Publishes on a [`Bus`] on behalf of the instance bound to one port.
#[derive(Clone, Debug)]
pub struct PortPublisher {
    port: u16,
    bus: Bus,
}

impl PortPublisher {
    /// Port stamped on published events.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Publishes `ev` with its port overwritten by this publisher's port.
    pub fn publish(&self, ev: Event) -> usize {
        self.bus.publish(ev.with_port(self.port))
    }
}
