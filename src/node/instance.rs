//! # NodeInstance: one disposable node bound to one port.
//!
//! An instance is registered once per port and reused across restarts; each
//! start launches a fresh process and replaces the previous handle once the
//! new one is listening.
//!
//! ## Lifecycle
//! ```text
//!            start()                      quit()
//! (no process) ──► Starting ──► Started ──► Stopping ──► Stopped ──► start() ...
//!                     │                        │
//!                     └─ listen fails          └─ close fails ─► poll status == Stopped
//!                        (Bind error)                             (best effort, never re-raised)
//! ```
//!
//! ## Rules
//! - Status is always read from the process handle, never cached.
//! - `start` and `quit` on one instance are serialised by a lifecycle lock.
//! - `start` on a node that is `Starting` or `Started` fails with a bind error
//!   and leaves the running process untouched; quit it first.
//! - `quit` only fails with `NotRunning` (never started); close failures are
//!   logged, polled and reported through the returned status.

use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{json, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::{
    error::NodeError,
    events::{Bus, Event, EventKind, PortPublisher},
    executor::retry_until_true,
    node::{Balance, LauncherRef, NodeOptions, NodeStatus, ProcessRef, Provider},
    policies::RetryPolicy,
};

/// Process handle plus the options it was launched with.
struct Current {
    process: ProcessRef,
    options: NodeOptions,
}

/// Handle to one logical node on a fixed port.
///
/// Shared between the [`NodeRegistry`](crate::NodeRegistry) and callers as `Arc<NodeInstance>`.
pub struct NodeInstance {
    port: u16,
    launcher: LauncherRef,
    stop_poll: RetryPolicy,
    events: PortPublisher,
    current: RwLock<Option<Current>>,
    lifecycle: Mutex<()>,
}

impl NodeInstance {
    /// Creates an instance for `port` with no process yet.
    pub(crate) fn new(port: u16, launcher: LauncherRef, stop_poll: RetryPolicy, bus: Bus) -> Self {
        Self {
            port,
            launcher,
            stop_poll,
            events: bus.for_port(port),
            current: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Port this instance is bound to.
    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Current status of the process; `Stopped` if none was ever launched.
    pub fn status(&self) -> NodeStatus {
        self.process()
            .map(|p| p.status())
            .unwrap_or(NodeStatus::Stopped)
    }

    /// Options of the last start, if any.
    pub fn options(&self) -> Option<NodeOptions> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.options.clone())
    }

    /// True iff the status is `Starting` or `Started`.
    pub fn needs_stopping(&self) -> bool {
        self.status().needs_stopping()
    }

    /// Launches a new process from `options` and listens on this instance's port.
    ///
    /// The port in `options` is ignored; the instance port always wins.
    /// Fails with [`NodeError::Bind`] if the port is taken or this instance is
    /// still running. Not retried here.
    pub async fn start(&self, options: &NodeOptions) -> Result<(), NodeError> {
        let _guard = self.lock().await;
        self.start_locked(options, 1).await
    }

    /// Stops the process, confirming shutdown by polling when `close` fails.
    ///
    /// Returns the final observed status so callers can assert on it:
    /// `Stopped` when shutdown was confirmed, anything else when the poll budget
    /// ran out. Fails only with [`NodeError::NotRunning`] if the instance was
    /// never started. Calling `quit` on an already stopped instance returns
    /// `Ok(Stopped)` without touching the process.
    pub async fn quit(&self) -> Result<NodeStatus, NodeError> {
        let _guard = self.lock().await;
        self.quit_locked().await
    }

    /// Returns the account addresses of the node, in node order.
    pub async fn get_accounts(&self) -> Result<Vec<String>, NodeError> {
        let value = self.provider()?.request("eth_accounts", Vec::new()).await?;
        serde_json::from_value(value).map_err(|e| NodeError::rpc("eth_accounts", e))
    }

    /// Returns the balance of the first account at the latest block.
    ///
    /// A node without accounts yields [`Balance::ZERO`].
    pub async fn get_balance(&self) -> Result<Balance, NodeError> {
        let accounts = self.get_accounts().await?;
        let Some(account) = accounts.into_iter().next() else {
            info!(port = self.port, "no accounts found");
            return Ok(Balance::ZERO);
        };

        let value = self
            .provider()?
            .request("eth_getBalance", vec![json!(account), json!("latest")])
            .await?;
        parse_quantity("eth_getBalance", &value)
    }

    // ---------------------------
    // Lock-held operations
    // ---------------------------

    /// Acquires the lifecycle lock; `_locked` methods expect it to be held.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().await
    }

    pub(crate) async fn start_locked(&self, options: &NodeOptions, attempt: u32) -> Result<(), NodeError> {
        let options = options.clone().with_port(self.port);
        self.events.publish(Event::new(EventKind::NodeStarting).with_attempt(attempt));

        match self.launch_and_listen(options).await {
            Ok(status) => {
                debug!(port = self.port, attempt, %status, "node listening");
                self.events.publish(
                    Event::new(EventKind::NodeStarted)
                        .with_attempt(attempt)
                        .with_status(status),
                );
                Ok(())
            }
            Err(e) => {
                self.events.publish(
                    Event::new(EventKind::StartFailed)
                        .with_attempt(attempt)
                        .with_reason(e.to_string()),
                );
                Err(e)
            }
        }
    }

    pub(crate) async fn quit_locked(&self) -> Result<NodeStatus, NodeError> {
        let process = self.process().ok_or(NodeError::NotRunning { port: self.port })?;
        let before = process.status();
        if before == NodeStatus::Stopped {
            return Ok(NodeStatus::Stopped);
        }

        self.events.publish(Event::new(EventKind::NodeStopping).with_status(before));

        let err = match process.close().await {
            Ok(()) => {
                let status = process.status();
                self.publish_stopped(status);
                return Ok(status);
            }
            Err(e) => e,
        };

        let status = process.status();
        warn!(port = self.port, %status, error = %err, "caught error closing node");
        self.events.publish(
            Event::new(EventKind::StopFailed)
                .with_status(status)
                .with_reason(err.to_string()),
        );

        let port = self.port;
        let confirmed = retry_until_true(&self.stop_poll, || {
            let process = Arc::clone(&process);
            async move {
                let status = process.status();
                debug!(port, %status, "status while waiting for stop");
                Ok::<_, Infallible>(status == NodeStatus::Stopped)
            }
        })
        .await;

        let status = process.status();
        match confirmed {
            Ok(true) => {
                info!(port, %status, "node stop confirmed after close error");
                self.publish_stopped(status);
            }
            Ok(false) => {
                warn!(port, %status, "node did not confirm stop");
                self.events.publish(Event::new(EventKind::StopUnconfirmed).with_status(status));
            }
            Err(e) => {
                warn!(port, %status, error = %e, "node did not confirm stop");
                self.events.publish(
                    Event::new(EventKind::StopUnconfirmed)
                        .with_status(status)
                        .with_reason(e.to_string()),
                );
            }
        }
        Ok(status)
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    /// Launches and listens a fresh process; `current` keeps the previous
    /// handle until the new one is listening.
    async fn launch_and_listen(&self, options: NodeOptions) -> Result<NodeStatus, NodeError> {
        let status = self.status();
        if status.needs_stopping() {
            return Err(NodeError::Bind {
                port: self.port,
                reason: format!("node already {status}"),
            });
        }

        let process = self.launcher.launch(&options)?;
        if let Err(e) = process.listen(self.port).await {
            if process.status().needs_stopping() {
                if let Err(close_err) = process.close().await {
                    debug!(port = self.port, error = %close_err, "failed to close half-started node");
                }
            }
            return Err(e);
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Current {
            process: Arc::clone(&process),
            options,
        });
        Ok(process.status())
    }

    fn process(&self) -> Option<ProcessRef> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| Arc::clone(&c.process))
    }

    /// Provider of a live process, or `NotRunning`.
    fn provider(&self) -> Result<Arc<dyn Provider>, NodeError> {
        let not_running = NodeError::NotRunning { port: self.port };
        match self.process() {
            Some(p) if p.status() != NodeStatus::Stopped => p.provider().ok_or(not_running),
            _ => Err(not_running),
        }
    }

    fn publish_stopped(&self, status: NodeStatus) {
        self.events.publish(Event::new(EventKind::NodeStopped).with_status(status));
    }
}

impl fmt::Debug for NodeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInstance")
            .field("port", &self.port)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Parses a JSON-RPC quantity result into a balance.
fn parse_quantity(method: &str, value: &Value) -> Result<Balance, NodeError> {
    let hex = value
        .as_str()
        .ok_or_else(|| NodeError::rpc(method, format!("expected hex quantity, got {value}")))?;
    Balance::from_hex(hex).map_err(|e| NodeError::rpc(method, format!("{hex}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devnet::MemoryLauncher;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::Instant;

    const PORT: u16 = 18545;

    fn instance(launcher: &MemoryLauncher) -> NodeInstance {
        NodeInstance::new(
            PORT,
            Arc::new(launcher.clone()),
            RetryPolicy::new(5).with_delay(Duration::from_millis(1000)),
            Bus::new(64),
        )
    }

    #[tokio::test]
    async fn test_fresh_instance_is_stopped_and_not_running() {
        let node = instance(&MemoryLauncher::new());
        assert_eq!(node.status(), NodeStatus::Stopped);
        assert!(!node.needs_stopping());
        assert!(node.options().is_none());
        assert!(matches!(node.quit().await, Err(NodeError::NotRunning { port: PORT })));
        assert!(matches!(node.get_accounts().await, Err(NodeError::NotRunning { .. })));
    }

    #[tokio::test]
    async fn test_start_binds_instance_port() {
        let launcher = MemoryLauncher::new();
        let node = instance(&launcher);

        let opts = NodeOptions::default().with_port(1);
        node.start(&opts).await.unwrap();

        assert_eq!(node.status(), NodeStatus::Started);
        assert!(node.needs_stopping());
        assert!(launcher.is_bound(PORT));
        assert!(!launcher.is_bound(1));
        assert_eq!(node.options().map(|o| o.port), Some(PORT));
    }

    #[tokio::test]
    async fn test_start_on_foreign_port_is_bind_error() {
        let launcher = MemoryLauncher::new();
        assert!(launcher.occupy(PORT));
        let node = instance(&launcher);

        let err = node.start(&NodeOptions::default()).await.unwrap_err();
        assert!(matches!(err, NodeError::Bind { port: PORT, .. }));
        assert!(!node.needs_stopping());
    }

    #[tokio::test]
    async fn test_start_while_running_keeps_live_process() {
        let launcher = MemoryLauncher::new();
        let node = instance(&launcher);
        node.start(&NodeOptions::default()).await.unwrap();

        let err = node.start(&NodeOptions::default()).await.unwrap_err();
        assert!(matches!(err, NodeError::Bind { port: PORT, .. }));
        assert_eq!(launcher.launched(), 1);
        assert_eq!(node.status(), NodeStatus::Started);
        assert!(launcher.is_bound(PORT));

        assert_eq!(node.quit().await.unwrap(), NodeStatus::Stopped);
        assert!(!launcher.is_bound(PORT));
        node.start(&NodeOptions::default()).await.unwrap();
        assert_eq!(node.status(), NodeStatus::Started);
    }

    #[tokio::test]
    async fn test_failed_restart_keeps_previous_handle() {
        let launcher = MemoryLauncher::new();
        let node = instance(&launcher);
        let first = NodeOptions {
            network_id: 7,
            ..NodeOptions::default()
        };
        node.start(&first).await.unwrap();
        assert_eq!(node.quit().await.unwrap(), NodeStatus::Stopped);

        assert!(launcher.occupy(PORT));
        let second = NodeOptions {
            network_id: 8,
            ..NodeOptions::default()
        };
        assert!(node.start(&second).await.is_err());
        assert_eq!(node.options().map(|o| o.network_id), Some(7));
        assert_eq!(node.quit().await.unwrap(), NodeStatus::Stopped);
    }

    #[test]
    fn test_debug_shows_port_and_status() {
        let node = instance(&MemoryLauncher::new());
        let shown = format!("{node:?}");
        assert!(shown.contains("port: 18545"), "{shown}");
        assert!(shown.contains("status: Stopped"), "{shown}");
    }

    #[tokio::test]
    async fn test_accounts_and_balance() {
        let launcher = MemoryLauncher::new()
            .with_account("0x00000000000000000000000000000000000000a1", 1_234_567_890_123_456_789)
            .with_account("0x00000000000000000000000000000000000000b2", 7);
        let node = instance(&launcher);
        node.start(&NodeOptions::default()).await.unwrap();

        let accounts = node.get_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0], "0x00000000000000000000000000000000000000a1");

        let balance = node.get_balance().await.unwrap();
        assert_eq!(balance.to_string(), "1.2346");
    }

    #[tokio::test]
    async fn test_balance_without_accounts_is_zero() {
        let node = instance(&MemoryLauncher::new());
        node.start(&NodeOptions::default()).await.unwrap();
        assert_eq!(node.get_balance().await.unwrap(), Balance::ZERO);
    }

    #[tokio::test]
    async fn test_quit_then_queries_are_not_running() {
        let launcher = MemoryLauncher::new();
        let node = instance(&launcher);
        node.start(&NodeOptions::default()).await.unwrap();

        assert_eq!(node.quit().await.unwrap(), NodeStatus::Stopped);
        assert!(!launcher.is_bound(PORT));
        assert!(matches!(node.get_accounts().await, Err(NodeError::NotRunning { .. })));
        assert!(matches!(node.get_balance().await, Err(NodeError::NotRunning { .. })));
    }

    #[tokio::test]
    async fn test_second_quit_is_noop() {
        let launcher = MemoryLauncher::new();
        let node = instance(&launcher);
        node.start(&NodeOptions::default()).await.unwrap();

        assert_eq!(node.quit().await.unwrap(), NodeStatus::Stopped);
        launcher.faults().fail_close_always.store(true, Ordering::Relaxed);
        assert_eq!(node.quit().await.unwrap(), NodeStatus::Stopped);
        assert_eq!(launcher.close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_swallows_close_failure_and_polls() {
        let launcher = MemoryLauncher::new();
        let node = instance(&launcher);
        node.start(&NodeOptions::default()).await.unwrap();

        launcher.faults().fail_close_always.store(true, Ordering::Relaxed);
        launcher.faults().stick_on_close_failure.store(true, Ordering::Relaxed);

        let started = Instant::now();
        let status = node.quit().await.unwrap();

        assert_eq!(status, NodeStatus::Stopping);
        assert_eq!(launcher.close_calls(), 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "polled for {elapsed:?}");
        assert!(elapsed < Duration::from_secs(6), "polled for {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_confirms_late_stop() {
        let launcher = MemoryLauncher::new();
        let node = instance(&launcher);
        node.start(&NodeOptions::default()).await.unwrap();

        launcher.faults().fail_close_once.store(true, Ordering::Relaxed);
        launcher
            .faults()
            .close_settle_ms
            .store(2_500, Ordering::Relaxed);

        let started = Instant::now();
        assert_eq!(node.quit().await.unwrap(), NodeStatus::Stopped);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "confirmed after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "confirmed after {elapsed:?}");
        assert!(!launcher.is_bound(PORT));
    }

    #[tokio::test]
    async fn test_malformed_balance_is_rpc_error() {
        assert!(matches!(
            parse_quantity("eth_getBalance", &json!(12)),
            Err(NodeError::Rpc { .. })
        ));
        assert!(matches!(
            parse_quantity("eth_getBalance", &json!("0xnope")),
            Err(NodeError::Rpc { .. })
        ));
        assert_eq!(
            parse_quantity("eth_getBalance", &json!("0xde0b6b3a7640000")).unwrap(),
            Balance::from_wei(1_000_000_000_000_000_000)
        );
    }
}
