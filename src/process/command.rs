//! # CommandLauncher: nodes as external child processes.
//!
//! ```text
//! listen(port) ─► port taken? ─► Bind error
//!              ─► spawn `<program> --port <port> ...` ─► poll net_version ─┬─► Started
//!                                                                        ├─► child exited ─► Bind error
//!                                                                        └─► not ready    ─► kill, Bind error
//! close()      ─► kill child ─► Stopped
//! ```
//!
//! The port must be free before spawning, and readiness only counts while
//! the spawned child is alive.

use std::process::Stdio;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    error::NodeError,
    executor::retry_until_true,
    node::{Launch, NodeOptions, NodeProcess, NodeStatus, ProcessRef, Provider},
    policies::RetryPolicy,
    process::HttpProvider,
};

/// Launches nodes by running a ganache-compatible CLI.
#[derive(Clone, Debug)]
pub struct CommandLauncher {
    program: String,
    ready_poll: RetryPolicy,
}

impl CommandLauncher {
    /// Launcher running `program` (for example `ganache-cli`).
    ///
    /// Readiness is polled 50 times, 200 ms apart.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ready_poll: RetryPolicy::new(50).with_delay(Duration::from_millis(200)),
        }
    }

    /// Replaces the readiness polling policy.
    pub fn with_ready_poll(mut self, policy: RetryPolicy) -> Self {
        self.ready_poll = policy;
        self
    }
}

impl Launch for CommandLauncher {
    fn launch(&self, options: &NodeOptions) -> Result<ProcessRef, NodeError> {
        Ok(Arc::new(CommandNode {
            program: self.program.clone(),
            options: options.clone(),
            ready_poll: self.ready_poll.clone(),
            status: AtomicU8::new(NodeStatus::Stopped.bits()),
            child: Mutex::new(None),
            provider: RwLock::new(None),
        }))
    }
}

/// Command-line arguments for `options`, listening on `port`.
pub(crate) fn node_args(options: &NodeOptions, port: u16) -> Vec<String> {
    let mut args = vec![
        "--port".to_string(),
        port.to_string(),
        "--networkId".to_string(),
        options.network_id.to_string(),
        "--blockTime".to_string(),
        options.block_time.to_string(),
        "--mnemonic".to_string(),
        options.mnemonic.clone(),
        "--hardfork".to_string(),
        options.hardfork.clone(),
    ];
    if options.quiet {
        args.push("--quiet".to_string());
    }
    if !options.vm_errors_on_rpc_response {
        args.push("--noVMErrorsOnRPCResponse".to_string());
    }
    for (key, value) in &options.extra {
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => args.push(format!("--{key}")),
            Value::String(s) => args.extend([format!("--{key}"), s.clone()]),
            other => args.extend([format!("--{key}"), other.to_string()]),
        }
    }
    args
}

/// Fails if something on this host already listens on `port`.
fn ensure_port_free(port: u16) -> std::io::Result<()> {
    std::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, port)).map(drop)
}

/// Node running as a child process of this one.
#[derive(Debug)]
pub struct CommandNode {
    program: String,
    options: NodeOptions,
    ready_poll: RetryPolicy,
    status: AtomicU8,
    child: Mutex<Option<Child>>,
    provider: RwLock<Option<Arc<HttpProvider>>>,
}

impl CommandNode {
    fn set_status(&self, status: NodeStatus) {
        self.status.store(status.bits(), Ordering::Release);
    }

    fn fail_listen(&self, port: u16, reason: String) -> NodeError {
        self.set_status(NodeStatus::Stopped);
        NodeError::Bind { port, reason }
    }

    /// True once the child answers `net_version` or has exited.
    async fn ready_or_exited(&self, provider: &HttpProvider) -> Result<bool, NodeError> {
        let mut guard = self.child.lock().await;
        let Some(child) = guard.as_mut() else {
            return Ok(true);
        };
        if child
            .try_wait()
            .map_err(|e| NodeError::Launch { reason: e.to_string() })?
            .is_some()
        {
            return Ok(true);
        }
        drop(guard);
        Ok(provider.request("net_version", Vec::new()).await.is_ok())
    }

    async fn exit_status(&self) -> Option<std::process::ExitStatus> {
        let mut guard = self.child.lock().await;
        let exited = guard.as_mut().and_then(|c| c.try_wait().ok().flatten());
        if exited.is_some() {
            guard.take();
        }
        exited
    }
}

#[async_trait]
impl NodeProcess for CommandNode {
    async fn listen(&self, port: u16) -> Result<(), NodeError> {
        let status = self.status();
        if status != NodeStatus::Stopped {
            return Err(NodeError::Bind {
                port,
                reason: format!("server is {status}"),
            });
        }
        self.set_status(NodeStatus::Starting);

        if let Err(e) = ensure_port_free(port) {
            return Err(self.fail_listen(port, format!("address already in use: {e}")));
        }

        let child = Command::new(&self.program)
            .args(node_args(&self.options, port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                self.set_status(NodeStatus::Stopped);
                NodeError::Launch {
                    reason: format!("{}: {e}", self.program),
                }
            })?;
        debug!(port, pid = ?child.id(), program = %self.program, "node process spawned");
        *self.child.lock().await = Some(child);

        let provider = match HttpProvider::local(port) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                self.kill().await;
                self.set_status(NodeStatus::Stopped);
                return Err(e);
            }
        };

        let ready = retry_until_true(&self.ready_poll, || self.ready_or_exited(&provider)).await;

        if let Some(exit) = self.exit_status().await {
            return Err(self.fail_listen(port, format!("node exited with {exit}")));
        }
        if self.child.lock().await.is_none() {
            return Err(self.fail_listen(port, "node process is gone".to_string()));
        }
        if !matches!(ready, Ok(true)) {
            self.kill().await;
            return Err(self.fail_listen(port, "node did not become ready".to_string()));
        }

        *self.provider.write().unwrap_or_else(PoisonError::into_inner) = Some(provider);
        self.set_status(NodeStatus::Started);
        Ok(())
    }

    async fn close(&self) -> Result<(), NodeError> {
        let port = self.options.port;
        let status = self.status();
        if matches!(status, NodeStatus::Stopped | NodeStatus::Stopping) {
            return Err(NodeError::Close {
                port,
                reason: "server is already closed or closing".to_string(),
            });
        }

        self.set_status(NodeStatus::Stopping);
        self.provider.write().unwrap_or_else(PoisonError::into_inner).take();

        let mut guard = self.child.lock().await;
        let Some(child) = guard.as_mut() else {
            self.set_status(NodeStatus::Stopped);
            return Ok(());
        };

        match child.kill().await {
            Ok(()) => {
                guard.take();
                self.set_status(NodeStatus::Stopped);
                Ok(())
            }
            Err(e) if matches!(child.try_wait(), Ok(Some(_))) => {
                debug!(port, error = %e, "node already exited");
                guard.take();
                self.set_status(NodeStatus::Stopped);
                Ok(())
            }
            Err(e) => Err(NodeError::Close {
                port,
                reason: e.to_string(),
            }),
        }
    }

    fn status(&self) -> NodeStatus {
        NodeStatus::from_bits(self.status.load(Ordering::Acquire)).unwrap_or(NodeStatus::Stopped)
    }

    fn provider(&self) -> Option<Arc<dyn Provider>> {
        if self.status() != NodeStatus::Started {
            return None;
        }
        self.provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(|p| p as Arc<dyn Provider>)
    }
}

impl CommandNode {
    async fn kill(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!(program = %self.program, error = %e, "failed to kill node process");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_args_defaults() {
        let args = node_args(&NodeOptions::default(), 9545);
        assert_eq!(&args[..4], ["--port", "9545", "--networkId", "1337"]);
        assert!(args.contains(&"--quiet".to_string()));
        assert!(args.contains(&"--noVMErrorsOnRPCResponse".to_string()));
        assert!(args.contains(&"muirGlacier".to_string()));
    }

    #[test]
    fn test_node_args_extra() {
        let mut opts = NodeOptions::default();
        opts.quiet = false;
        opts.vm_errors_on_rpc_response = true;
        opts.extra.insert("gasLimit".into(), json!(8_000_000));
        opts.extra.insert("deterministic".into(), json!(true));
        opts.extra.insert("verbose".into(), json!(false));
        opts.extra.insert("db".into(), json!("/tmp/chain"));

        let args = node_args(&opts, 1);
        assert!(!args.contains(&"--quiet".to_string()));
        assert!(!args.contains(&"--noVMErrorsOnRPCResponse".to_string()));
        assert!(args.windows(2).any(|w| w == ["--gasLimit", "8000000"]));
        assert!(args.windows(2).any(|w| w == ["--db", "/tmp/chain"]));
        assert!(args.contains(&"--deterministic".to_string()));
        assert!(!args.contains(&"--verbose".to_string()));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let launcher = CommandLauncher::new("/nonexistent/nodevisor-test-node");
        let node = launcher.launch(&NodeOptions::default()).unwrap();

        let err = node.listen(9546).await.unwrap_err();
        assert!(matches!(err, NodeError::Launch { .. }));
        assert_eq!(node.status(), NodeStatus::Stopped);
        assert!(node.provider().is_none());
    }

    #[tokio::test]
    async fn test_foreign_listener_is_bind_error() {
        let foreign = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = foreign.local_addr().unwrap().port();

        let launcher = CommandLauncher::new("/nonexistent/nodevisor-test-node");
        let node = launcher.launch(&NodeOptions::default()).unwrap();

        let err = node.listen(port).await.unwrap_err();
        assert!(matches!(err, NodeError::Bind { port: p, .. } if p == port), "{err:?}");
        assert_eq!(node.status(), NodeStatus::Stopped);
        assert!(node.provider().is_none());
    }

    #[test]
    fn test_port_check_sees_bound_socket() {
        let foreign = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = foreign.local_addr().unwrap().port();
        assert!(ensure_port_free(port).is_err());
        drop(foreign);
        assert!(ensure_port_free(port).is_ok());
    }
}
