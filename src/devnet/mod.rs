//! In-memory devnet: fake node processes for tests and demos.
//!
//! [`MemoryLauncher`] implements [`Launch`](crate::Launch) without any real
//! blockchain behind it. It keeps a port table (so bind conflicts are real),
//! serves a handful of read-only JSON-RPC methods from configured accounts,
//! and exposes a [`FaultInjector`] to script listen, close and RPC failures.

mod faults;
mod launcher;
mod node;

pub use faults::FaultInjector;
pub use launcher::{Account, MemoryLauncher};
pub use node::MemoryNode;
