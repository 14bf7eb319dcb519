//! # Capabilities consumed from the node implementation.
//!
//! The manager never implements a blockchain node itself. It drives one through
//! three seams:
//!
//! ```text
//! Launch::launch(&NodeOptions) ──► Arc<dyn NodeProcess>
//!                                     ├─ listen(port)   suspends until listening, or Bind error
//!                                     ├─ close()        suspends until closed, or Close error
//!                                     ├─ status()       real-time NodeStatus (read-only)
//!                                     └─ provider() ──► Arc<dyn Provider>
//!                                                          └─ request(method, params) → JSON result
//! ```
//!
//! Implementations live in [`devnet`](crate::devnet) (in-process fake) and, with
//! the `process` feature, in `process` (external binary over HTTP).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::NodeError,
    node::{NodeOptions, NodeStatus},
};

/// JSON-RPC request capability of a running node.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Sends `method` with positional `params` and returns the `result` member.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, NodeError>;
}

/// Handle to one node process.
///
/// The process owns its status: only its own `listen`/`close` change it, and
/// callers always read it through [`NodeProcess::status`].
#[async_trait]
pub trait NodeProcess: Send + Sync + 'static {
    /// Binds `port` and begins serving.
    async fn listen(&self, port: u16) -> Result<(), NodeError>;

    /// Stops serving and releases the port.
    async fn close(&self) -> Result<(), NodeError>;

    /// Current lifecycle state.
    fn status(&self) -> NodeStatus;

    /// Request capability, if the process can currently serve requests.
    fn provider(&self) -> Option<Arc<dyn Provider>>;
}

/// Factory creating a fresh node process from options (the process is not yet listening).
pub trait Launch: Send + Sync + 'static {
    fn launch(&self, options: &NodeOptions) -> Result<Arc<dyn NodeProcess>, NodeError>;
}

/// Shared handle to a node process.
pub type ProcessRef = Arc<dyn NodeProcess>;

/// Shared handle to a launcher.
pub type LauncherRef = Arc<dyn Launch>;
