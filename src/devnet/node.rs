//! # MemoryNode: in-process fake node process.
//!
//! ## Status transitions
//! ```text
//! listen:  Stopped ─► Starting ─┬─► Started             (port free)
//!                               └─► Stopped + Bind err  (port taken / injected)
//!
//! close:   Started ─► Stopping ─┬─► Stopped             (ok)
//!                               └─► Close err, then:
//!                                     stick_on_close_failure → stays Stopping
//!                                     otherwise             → Stopped after close_settle_ms
//! ```
//!
//! The provider answers `eth_accounts`, `eth_getBalance`, `eth_chainId`,
//! `net_version` and `eth_blockNumber` from the launcher's accounts.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    devnet::launcher::{Account, Shared},
    error::NodeError,
    node::{NodeOptions, NodeProcess, NodeStatus, Provider},
};

/// Status and bound port of one node, shared with delayed-stop tasks.
#[derive(Debug)]
struct NodeState {
    status: AtomicU8,
    bound: Mutex<Option<u16>>,
}

impl NodeState {
    fn get(&self) -> NodeStatus {
        NodeStatus::from_bits(self.status.load(Ordering::Acquire)).unwrap_or(NodeStatus::Stopped)
    }

    fn set(&self, status: NodeStatus) {
        self.status.store(status.bits(), Ordering::Release);
    }

    /// Releases the bound port and settles in `Stopped`.
    fn finish_stop(&self, shared: &Shared) {
        if let Some(port) = self.bound.lock().unwrap_or_else(PoisonError::into_inner).take() {
            shared.unbind(port);
        }
        self.set(NodeStatus::Stopped);
    }
}

/// In-process node created by [`MemoryLauncher`](super::MemoryLauncher).
#[derive(Debug)]
pub struct MemoryNode {
    options: NodeOptions,
    accounts: Arc<Vec<Account>>,
    shared: Arc<Shared>,
    state: Arc<NodeState>,
}

impl MemoryNode {
    pub(crate) fn new(options: NodeOptions, accounts: Arc<Vec<Account>>, shared: Arc<Shared>) -> Self {
        Self {
            options,
            accounts,
            shared,
            state: Arc::new(NodeState {
                status: AtomicU8::new(NodeStatus::Stopped.bits()),
                bound: Mutex::new(None),
            }),
        }
    }

    fn port(&self) -> u16 {
        self.state
            .bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unwrap_or(self.options.port)
    }

    fn bind_error(&self, port: u16, reason: &str) -> NodeError {
        self.state.set(NodeStatus::Stopped);
        NodeError::Bind {
            port,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl NodeProcess for MemoryNode {
    async fn listen(&self, port: u16) -> Result<(), NodeError> {
        let status = self.state.get();
        if status != NodeStatus::Stopped {
            return Err(NodeError::Bind {
                port,
                reason: format!("server is {status}"),
            });
        }

        self.state.set(NodeStatus::Starting);
        tokio::task::yield_now().await;

        if self.shared.faults.should_fail_listen() {
            return Err(self.bind_error(port, "injected listen failure"));
        }
        if !self.shared.bind(port) {
            return Err(self.bind_error(port, "address already in use"));
        }

        *self.state.bound.lock().unwrap_or_else(PoisonError::into_inner) = Some(port);
        self.state.set(NodeStatus::Started);
        Ok(())
    }

    async fn close(&self) -> Result<(), NodeError> {
        self.shared.close_calls.fetch_add(1, Ordering::Relaxed);
        let port = self.port();

        let status = self.state.get();
        if matches!(status, NodeStatus::Stopped | NodeStatus::Stopping) {
            return Err(NodeError::Close {
                port,
                reason: "server is already closed or closing".to_string(),
            });
        }

        self.state.set(NodeStatus::Stopping);
        tokio::task::yield_now().await;

        let faults = &self.shared.faults;
        if !faults.should_fail_close() {
            self.state.finish_stop(&self.shared);
            return Ok(());
        }

        if !faults.stick_on_close_failure.load(Ordering::Relaxed) {
            let settle = Duration::from_millis(faults.close_settle_ms.load(Ordering::Relaxed));
            if settle.is_zero() {
                self.state.finish_stop(&self.shared);
            } else {
                let state = Arc::clone(&self.state);
                let shared = Arc::clone(&self.shared);
                tokio::spawn(async move {
                    tokio::time::sleep(settle).await;
                    state.finish_stop(&shared);
                });
            }
        }

        Err(NodeError::Close {
            port,
            reason: "injected close failure".to_string(),
        })
    }

    fn status(&self) -> NodeStatus {
        self.state.get()
    }

    fn provider(&self) -> Option<Arc<dyn Provider>> {
        match self.state.get() {
            NodeStatus::Started | NodeStatus::Paused => Some(Arc::new(MemoryProvider {
                network_id: self.options.network_id,
                accounts: Arc::clone(&self.accounts),
                shared: Arc::clone(&self.shared),
            })),
            _ => None,
        }
    }
}

/// JSON-RPC responder backed by the launcher's accounts.
struct MemoryProvider {
    network_id: u64,
    accounts: Arc<Vec<Account>>,
    shared: Arc<Shared>,
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, NodeError> {
        if self.shared.faults.should_fail_rpc() {
            return Err(NodeError::rpc(method, "injected rpc failure"));
        }

        match method {
            "eth_accounts" => Ok(self.accounts.iter().map(|a| json!(a.address)).collect()),
            "eth_getBalance" => {
                let address = params
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| NodeError::rpc(method, "missing address parameter"))?;
                let wei = self
                    .accounts
                    .iter()
                    .find(|a| a.address.eq_ignore_ascii_case(address))
                    .map_or(0, |a| a.balance_wei);
                Ok(json!(format!("{wei:#x}")))
            }
            "eth_chainId" => Ok(json!(format!("{:#x}", self.network_id))),
            "net_version" => Ok(json!(self.network_id.to_string())),
            "eth_blockNumber" => Ok(json!("0x0")),
            other => Err(NodeError::rpc(other, "method not found")),
        }
    }
}
