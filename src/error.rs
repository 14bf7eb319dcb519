//! Error types used by the retry executor and the node manager.
//!
//! This module defines two main error enums:
//!
//! - [`RetryError`] — raised by the retry combinators when a policy is exhausted.
//! - [`NodeError`] — raised by node instances, the registry and process adapters.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics
//! and [`NodeError::is_retryable`] to classify transient failures.

use thiserror::Error;

/// # Errors produced by the retry combinators.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// The operation never reached the expected outcome within the attempt budget.
    #[error("{message}")]
    Exhausted {
        /// Rejection message configured on the policy.
        message: String,
        /// Number of attempts actually made (`max_retries + 1`).
        attempts: u64,
    },
}

impl RetryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::RetryError;
    ///
    /// let err = RetryError::Exhausted { message: "Retry limit reached".into(), attempts: 3 };
    /// assert_eq!(err.as_label(), "retry_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Exhausted { .. } => "retry_exhausted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RetryError::Exhausted { message, attempts } => {
                format!("{message} (after {attempts} attempts)")
            }
        }
    }
}

/// # Errors produced by node instances and their process adapters.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum NodeError {
    /// A retried operation never succeeded within its policy.
    #[error("retry exhausted: {0}")]
    RetryExhausted(#[from] RetryError),

    /// The node process could not bind/listen on the requested port.
    #[error("failed to bind port {port}: {reason}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying failure message.
        reason: String,
    },

    /// The node process failed to close.
    #[error("failed to close node on port {port}: {reason}")]
    Close {
        /// Port the node was bound to.
        port: u16,
        /// Underlying failure message.
        reason: String,
    },

    /// An operation needing a started process ran before start or after stop.
    #[error("node on port {port} is not running")]
    NotRunning {
        /// Port of the instance.
        port: u16,
    },

    /// The node rejected or failed a JSON-RPC request, or returned a malformed result.
    #[error("rpc `{method}` failed: {reason}")]
    Rpc {
        /// JSON-RPC method name.
        method: String,
        /// Underlying failure message.
        reason: String,
    },

    /// The launcher could not create a node process from the given options.
    #[error("failed to launch node: {reason}")]
    Launch {
        /// Underlying failure message.
        reason: String,
    },
}

impl NodeError {
    /// Creates an [`NodeError::Rpc`] from any displayable failure.
    pub fn rpc(method: impl Into<String>, reason: impl ToString) -> Self {
        NodeError::Rpc {
            method: method.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::NodeError;
    ///
    /// let err = NodeError::NotRunning { port: 8545 };
    /// assert_eq!(err.as_label(), "node_not_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            NodeError::RetryExhausted(_) => "node_retry_exhausted",
            NodeError::Bind { .. } => "node_bind_failed",
            NodeError::Close { .. } => "node_close_failed",
            NodeError::NotRunning { .. } => "node_not_running",
            NodeError::Rpc { .. } => "node_rpc_failed",
            NodeError::Launch { .. } => "node_launch_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            NodeError::RetryExhausted(e) => e.as_message(),
            NodeError::Bind { port, reason } => format!("bind :{port}: {reason}"),
            NodeError::Close { port, reason } => format!("close :{port}: {reason}"),
            NodeError::NotRunning { port } => format!("not running: :{port}"),
            NodeError::Rpc { method, reason } => format!("rpc {method}: {reason}"),
            NodeError::Launch { reason } => format!("launch: {reason}"),
        }
    }

    /// Indicates whether the failure is transient and worth another attempt.
    ///
    /// Returns `true` for [`NodeError::Bind`] and [`NodeError::Rpc`], `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use nodevisor::NodeError;
    ///
    /// let bind = NodeError::Bind { port: 8545, reason: "in use".into() };
    /// assert!(bind.is_retryable());
    ///
    /// let stopped = NodeError::NotRunning { port: 8545 };
    /// assert!(!stopped.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::Bind { .. } | NodeError::Rpc { .. })
    }
}
