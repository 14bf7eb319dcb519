//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the registry and node instances.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//! - [`PortPublisher`] per-instance handle stamping its port on events
//!
//! ## Quick reference
//! - **Publishers**: `NodeRegistry::acquire`, `NodeInstance::{start, quit}`.
//! - **Consumers**: the registry listener (fans out to `SubscriberSet`) and any
//!   receiver obtained through `NodeRegistry::subscribe`.

mod bus;
mod event;

pub use bus::{Bus, PortPublisher};
pub use event::{Event, EventKind};
