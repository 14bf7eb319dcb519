//! # nodevisor
//!
//! **Nodevisor** manages disposable local blockchain nodes for end-to-end tests.
//!
//! It hands out one node per port, restarts it on demand, confirms shutdown
//! even when the node's own `close` misbehaves, and ships the two retry
//! combinators that drive all of that. The node itself is pluggable: an
//! in-memory [`devnet`] for tests, or (with the `process` feature) an
//! external ganache-compatible binary.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     acquire(8545, overrides)      acquire(7545, overrides)
//!              │                             │
//!              ▼                             ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  NodeRegistry                                                     │
//! │  - RegistryConfig (start policy, stop-poll policy, defaults)      │
//! │  - port → Arc<NodeInstance>                                       │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        ▼                              ▼
//!  ┌──────────────────┐          ┌──────────────────┐
//!  │ NodeInstance     │          │ NodeInstance     │
//!  │ :8545            │          │ :7545            │
//!  │ lifecycle lock   │          │ lifecycle lock   │
//!  └┬─────────────────┘          └┬─────────────────┘
//!   │ Launch::launch / listen     │ Publishes:
//!   │ close / provider()          │ - NodeStarting / NodeStarted / StartFailed
//!   ▼                             │ - NodeStopping / NodeStopped / StopFailed
//!  NodeProcess ─► Provider        │ - StopUnconfirmed ...
//!  (devnet or process)            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 Bus (capacity: RegistryConfig::bus_capacity)      │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       subscriber_listener ─► SubscriberSet ─► sub.on_event()
//! ```
//!
//! ### acquire
//! ```text
//! acquire(port, overrides)
//!   ├─► lock instance
//!   ├─► needs_stopping? ─► quit
//!   └─► retry(start policy) {
//!         start ─ Ok ─► return instance
//!           └── Err ─► quit (best effort) ─► retry after delay
//!       } exhausted ─► NodeError::RetryExhausted
//! ```
//!
//! ### quit
//! ```text
//! quit()
//!   ├─ never started ─► NotRunning
//!   ├─ already Stopped ─► Ok(Stopped)
//!   └─ close()
//!        ├─ Ok  ─► Ok(status)
//!        └─ Err ─► warn!, retry_until_true(stop_poll, status == Stopped) ─► Ok(final status)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / functions                        |
//! |-------------------|----------------------------------------------------------|----------------------------------------------|
//! | **Retry**         | Bounded fixed-delay retry and predicate polling.         | [`retry`], [`retry_until_true`], [`RetryPolicy`] |
//! | **Registry**      | One restartable node per port.                           | [`NodeRegistry`], [`RegistryConfig`]         |
//! | **Instances**     | Start, quit and query a node.                            | [`NodeInstance`], [`NodeStatus`], [`Balance`] |
//! | **Options**       | Launch options with serde support.                       | [`NodeOptions`], [`NodeOverrides`]           |
//! | **Subscriber API**| Hook into lifecycle events.                              | [`Subscribe`], [`Event`], [`EventKind`]      |
//! | **Errors**        | Typed errors with stable labels.                         | [`RetryError`], [`NodeError`]                |
//!
//! ## Optional features
//! - `process`: `process::CommandLauncher` and `process::HttpProvider`
//!   for real node binaries.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use nodevisor::{devnet::MemoryLauncher, NodeOverrides, NodeRegistry, NodeStatus, WEI_PER_TOKEN};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), nodevisor::NodeError> {
//!     let launcher = MemoryLauncher::new()
//!         .with_account("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1", 3 * WEI_PER_TOKEN / 2);
//!     let registry = NodeRegistry::builder(Arc::new(launcher)).build();
//!
//!     let node = registry
//!         .acquire(8545, NodeOverrides { network_id: Some(5777), ..Default::default() })
//!         .await?;
//!     assert_eq!(node.get_balance().await?.to_string(), "1.5000");
//!
//!     assert_eq!(node.quit().await?, NodeStatus::Stopped);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod executor;
mod node;
mod policies;
mod subscribers;

pub mod devnet;

// ---- Public re-exports ----

pub use core::{NodeRegistry, RegistryBuilder, RegistryConfig};
pub use error::{NodeError, RetryError};
pub use events::{Bus, Event, EventKind, PortPublisher};
pub use executor::{retry, retry_until_true};
pub use node::{
    Balance, Launch, LauncherRef, NodeInstance, NodeOptions, NodeOverrides, NodeProcess,
    NodeStatus, ProcessRef, Provider, DEFAULT_MNEMONIC, DEFAULT_PORT, WEI_PER_TOKEN,
};
pub use policies::{RetryMode, RetryPolicy, DEFAULT_REJECTION_MESSAGE};
pub use subscribers::{Subscribe, SubscriberSet, SubscriberStats};

// Optional: external node binaries over JSON-RPC/HTTP.
// Enable with: `--features process`
#[cfg(feature = "process")]
pub mod process;
