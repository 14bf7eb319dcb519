//! # NodeRegistry: port → node instance table.
//!
//! The registry hands out one [`NodeInstance`] per port and (re)starts it on
//! every [`NodeRegistry::acquire`].
//!
//! ## Architecture
//! ```text
//! acquire(port, overrides)
//!   ├─► options = defaults ⊕ overrides (port forced)
//!   ├─► get or register instance ──► NodeRegistered
//!   ├─► lifecycle lock (per port)
//!   ├─► needs_stopping? ──► RestartRequested ──► quit
//!   └─► retry(start policy):
//!          start_locked(attempt) ── ok ──► return instance
//!                │
//!                └─ err ─► quit (best effort) ─► re-raise
//!                                                   └─► exhausted ─► StartExhausted
//! ```
//!
//! ## Rules
//! - At most one instance per port; entries are never removed.
//! - `acquire` returns only after the start settled.
//! - Within one `acquire`, the previous node is stopped before the new one starts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::{
    core::{builder::RegistryBuilder, RegistryConfig},
    error::NodeError,
    events::{Bus, Event, EventKind},
    executor::retry,
    node::{LauncherRef, NodeInstance, NodeOverrides, NodeStatus},
    policies::{RetryMode, RetryPolicy},
};

/// Table of node instances keyed by port.
pub struct NodeRegistry {
    cfg: RegistryConfig,
    launcher: LauncherRef,
    bus: Bus,
    nodes: RwLock<HashMap<u16, Arc<NodeInstance>>>,
}

impl NodeRegistry {
    /// Starts building a registry that launches nodes through `launcher`.
    pub fn builder(launcher: LauncherRef) -> RegistryBuilder {
        RegistryBuilder::new(launcher)
    }

    pub(crate) fn new_internal(cfg: RegistryConfig, launcher: LauncherRef, bus: Bus) -> Self {
        Self {
            cfg,
            launcher,
            bus,
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &RegistryConfig {
        &self.cfg
    }

    /// Returns a started node on `port`, restarting it if it is already running.
    ///
    /// Caller overrides win over the configured defaults; the port argument
    /// always wins over `overrides.port`. Each start attempt that fails quits
    /// the instance before the next delay. When the start policy is exhausted
    /// the error is [`NodeError::RetryExhausted`].
    pub async fn acquire(
        &self,
        port: u16,
        overrides: NodeOverrides,
    ) -> Result<Arc<NodeInstance>, NodeError> {
        let options = self.cfg.defaults.clone().merged(overrides).with_port(port);
        let instance = self.get_or_register(port).await;
        let guard = instance.lock().await;

        if instance.needs_stopping() {
            self.bus.publish(
                Event::new(EventKind::RestartRequested)
                    .with_port(port)
                    .with_status(instance.status()),
            );
            let status = instance.quit_locked().await?;
            debug!(port, %status, "stopped previous node before restart");
        }

        let policy = self.start_policy();
        let attempts = AtomicU32::new(0);
        let (inst, opts, counter) = (&*instance, &options, &attempts);

        let started = retry(&policy, move || async move {
            let attempt = counter.fetch_add(1, Ordering::Relaxed) + 1;
            match inst.start_locked(opts, attempt).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    match inst.quit_locked().await {
                        Ok(status) => debug!(port, attempt, %status, "cleaned up failed start"),
                        Err(quit_err) => debug!(port, attempt, error = %quit_err, "nothing to clean up"),
                    }
                    Err(e)
                }
            }
        })
        .await;

        if let Err(e) = started {
            self.bus.publish(
                Event::new(EventKind::StartExhausted)
                    .with_port(port)
                    .with_attempt(attempts.load(Ordering::Relaxed))
                    .with_reason(e.to_string()),
            );
            return Err(e.into());
        }

        drop(guard);
        Ok(instance)
    }

    /// Instance registered for `port`, if any.
    pub async fn get(&self, port: u16) -> Option<Arc<NodeInstance>> {
        self.nodes.read().await.get(&port).cloned()
    }

    /// Sorted list of registered ports.
    pub async fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.nodes.read().await.keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    /// Number of registered instances.
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    /// True if no instance was ever registered.
    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    /// Raw receiver for lifecycle events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Quits every instance that needs stopping; returns `(port, final status)` sorted by port.
    pub async fn shutdown_all(&self) -> Vec<(u16, NodeStatus)> {
        let mut nodes: Vec<Arc<NodeInstance>> = self.nodes.read().await.values().cloned().collect();
        nodes.sort_unstable_by_key(|n| n.port());

        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !node.needs_stopping() {
                continue;
            }
            match node.quit().await {
                Ok(status) => out.push((node.port(), status)),
                Err(e) => debug!(port = node.port(), error = %e, "skipped during shutdown"),
            }
        }
        info!(stopped = out.len(), "registry shutdown finished");
        out
    }

    async fn get_or_register(&self, port: u16) -> Arc<NodeInstance> {
        if let Some(node) = self.nodes.read().await.get(&port) {
            return Arc::clone(node);
        }

        let mut nodes = self.nodes.write().await;
        let node = nodes.entry(port).or_insert_with(|| {
            self.bus
                .publish(Event::new(EventKind::NodeRegistered).with_port(port));
            Arc::new(NodeInstance::new(
                port,
                Arc::clone(&self.launcher),
                self.cfg.stop_poll.clone(),
                self.bus.clone(),
            ))
        });
        Arc::clone(node)
    }

    fn start_policy(&self) -> RetryPolicy {
        let mut policy = self.cfg.start.clone();
        policy.mode = RetryMode::UntilSuccess;
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devnet::MemoryLauncher;
    use crate::error::RetryError;
    use std::time::Duration;
    use tokio::time::Instant;

    fn registry(launcher: &MemoryLauncher) -> Arc<NodeRegistry> {
        NodeRegistry::builder(Arc::new(launcher.clone())).build()
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test]
    async fn test_acquire_registers_and_starts() {
        let launcher = MemoryLauncher::new();
        let reg = registry(&launcher);
        let mut rx = reg.subscribe();

        let node = reg.acquire(7545, NodeOverrides::default()).await.unwrap();
        assert_eq!(node.port(), 7545);
        assert_eq!(node.status(), NodeStatus::Started);
        assert!(launcher.is_bound(7545));
        assert_eq!(reg.ports().await, vec![7545]);
        assert_eq!(
            drain(&mut rx),
            vec![EventKind::NodeRegistered, EventKind::NodeStarting, EventKind::NodeStarted]
        );
    }

    #[tokio::test]
    async fn test_overrides_win_over_defaults_except_port() {
        let launcher = MemoryLauncher::new();
        let reg = registry(&launcher);
        let overrides = NodeOverrides {
            network_id: Some(5),
            port: Some(1),
            ..NodeOverrides::default()
        };

        let node = reg.acquire(7546, overrides).await.unwrap();
        let opts = node.options().unwrap();
        assert_eq!(opts.network_id, 5);
        assert_eq!(opts.port, 7546);
        assert_eq!(opts.block_time, 2);
    }

    #[tokio::test]
    async fn test_reacquire_reuses_instance_and_quits_first() {
        let launcher = MemoryLauncher::new();
        let reg = registry(&launcher);

        let first = reg.acquire(7547, NodeOverrides::default()).await.unwrap();
        let mut rx = reg.subscribe();
        let second = reg.acquire(7547, NodeOverrides::default()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reg.len().await, 1);
        assert_eq!(launcher.launched(), 2);
        assert_eq!(launcher.close_calls(), 1);
        assert_eq!(second.status(), NodeStatus::Started);
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::RestartRequested,
                EventKind::NodeStopping,
                EventKind::NodeStopped,
                EventKind::NodeStarting,
                EventKind::NodeStarted,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_recovers_after_transient_bind_failure() {
        let launcher = MemoryLauncher::new();
        launcher.faults().fail_listen_times.store(1, Ordering::Relaxed);
        let reg = registry(&launcher);

        let started = Instant::now();
        let node = reg.acquire(7548, NodeOverrides::default()).await.unwrap();

        assert_eq!(node.status(), NodeStatus::Started);
        assert_eq!(launcher.launched(), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_exhaustion_on_occupied_port() {
        let launcher = MemoryLauncher::new();
        assert!(launcher.occupy(7549));
        let reg = registry(&launcher);
        let mut rx = reg.subscribe();

        let started = Instant::now();
        let err = reg.acquire(7549, NodeOverrides::default()).await.unwrap_err();

        assert!(matches!(
            err,
            NodeError::RetryExhausted(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(launcher.launched(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));

        let kinds = drain(&mut rx);
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::StartFailed).count(), 3);
        assert_eq!(kinds.last(), Some(&EventKind::StartExhausted));

        let node = reg.get(7549).await.unwrap();
        assert!(!node.needs_stopping());
    }

    #[tokio::test]
    async fn test_concurrent_acquire_is_serialised() {
        let launcher = MemoryLauncher::new();
        let reg = registry(&launcher);

        let (a, b) = tokio::join!(
            reg.acquire(7550, NodeOverrides::default()),
            reg.acquire(7550, NodeOverrides::default()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(launcher.launched(), 2);
        assert_eq!(launcher.close_calls(), 1);
        assert_eq!(a.status(), NodeStatus::Started);
    }

    #[tokio::test]
    async fn test_shutdown_all() {
        let launcher = MemoryLauncher::new();
        let reg = registry(&launcher);

        reg.acquire(7552, NodeOverrides::default()).await.unwrap();
        let stopped = reg.acquire(7551, NodeOverrides::default()).await.unwrap();
        stopped.quit().await.unwrap();

        assert_eq!(reg.shutdown_all().await, vec![(7552, NodeStatus::Stopped)]);
        assert!(!launcher.is_bound(7551));
        assert!(!launcher.is_bound(7552));
    }
}
