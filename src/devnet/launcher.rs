//! # MemoryLauncher: factory for in-process fake nodes.
//!
//! All nodes created by one launcher (and its clones) share a port table, a
//! [`FaultInjector`] and the configured accounts. A port taken through
//! [`MemoryLauncher::occupy`] behaves like a port held by a process outside
//! the registry's control: `listen` on it fails with a bind error.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    devnet::{faults::FaultInjector, node::MemoryNode},
    error::NodeError,
    node::{Launch, NodeOptions, ProcessRef},
};

/// Account exposed by in-memory nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// `0x`-prefixed address.
    pub address: String,
    /// Balance in wei.
    pub balance_wei: u128,
}

/// State shared between a launcher and the nodes it created.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    ports: Mutex<HashSet<u16>>,
    pub(crate) faults: FaultInjector,
    launched: AtomicU64,
    pub(crate) close_calls: AtomicU64,
}

impl Shared {
    /// Marks `port` as bound; false if it already was.
    pub(crate) fn bind(&self, port: u16) -> bool {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(port)
    }

    pub(crate) fn unbind(&self, port: u16) {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&port);
    }

    fn is_bound(&self, port: u16) -> bool {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&port)
    }
}

/// Launcher producing [`MemoryNode`]s.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use nodevisor::{devnet::MemoryLauncher, NodeRegistry, NodeOverrides};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), nodevisor::NodeError> {
/// let launcher = MemoryLauncher::new()
///     .with_account("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1", 100 * nodevisor::WEI_PER_TOKEN);
/// let registry = NodeRegistry::builder(Arc::new(launcher)).build();
///
/// let node = registry.acquire(8545, NodeOverrides::default()).await?;
/// assert_eq!(node.get_balance().await?.to_string(), "100");
/// node.quit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryLauncher {
    shared: Arc<Shared>,
    accounts: Arc<Vec<Account>>,
}

impl MemoryLauncher {
    /// Creates a launcher with no accounts and no faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account exposed by every node launched afterwards.
    #[must_use]
    pub fn with_account(mut self, address: impl Into<String>, balance_wei: u128) -> Self {
        Arc::make_mut(&mut self.accounts).push(Account {
            address: address.into(),
            balance_wei,
        });
        self
    }

    /// Configured accounts, in node order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Fault injection switches.
    pub fn faults(&self) -> &FaultInjector {
        &self.shared.faults
    }

    /// Binds `port` on behalf of a foreign process; false if it was already bound.
    pub fn occupy(&self, port: u16) -> bool {
        self.shared.bind(port)
    }

    /// Releases a port taken with [`MemoryLauncher::occupy`].
    pub fn release(&self, port: u16) {
        self.shared.unbind(port);
    }

    /// True if some node (or a foreign occupant) holds `port`.
    pub fn is_bound(&self, port: u16) -> bool {
        self.shared.is_bound(port)
    }

    /// Number of processes launched so far.
    pub fn launched(&self) -> u64 {
        self.shared.launched.load(Ordering::Relaxed)
    }

    /// Number of `close` calls received by launched processes.
    pub fn close_calls(&self) -> u64 {
        self.shared.close_calls.load(Ordering::Relaxed)
    }
}

impl Launch for MemoryLauncher {
    fn launch(&self, options: &NodeOptions) -> Result<ProcessRef, NodeError> {
        self.shared.launched.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MemoryNode::new(
            options.clone(),
            Arc::clone(&self.accounts),
            Arc::clone(&self.shared),
        )))
    }
}
