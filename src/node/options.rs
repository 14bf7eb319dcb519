//! # Node launch options.
//!
//! [`NodeOptions`] is the full option set handed to a [`Launch`](crate::Launch)
//! implementation. [`NodeOverrides`] carries caller-supplied values; merging
//! lets every `Some` override win over the defaults.
//!
//! Options are opaque pass-through values for the node; their serialized keys
//! follow the node's own option names so they can be loaded from or forwarded
//! as JSON.
//!
//! # Example
//! ```rust
//! use nodevisor::{NodeOptions, NodeOverrides};
//!
//! let opts = NodeOptions::default().merged(NodeOverrides {
//!     network_id: Some(5),
//!     ..NodeOverrides::default()
//! });
//! assert_eq!(opts.network_id, 5);
//! assert_eq!(opts.port, 8545);
//! assert_eq!(opts.hardfork, "muirGlacier");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Deterministic mnemonic used by default so account addresses are stable across runs.
pub const DEFAULT_MNEMONIC: &str =
    "phrase upgrade clock rough situate wedding elder clever doctor stamp excess tent";

/// Default JSON-RPC port.
pub const DEFAULT_PORT: u16 = 8545;

/// Full set of options used to launch a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    /// Seconds between automatically mined blocks.
    #[serde(rename = "blockTime")]
    pub block_time: u64,
    /// Network identifier reported by `net_version`.
    pub network_id: u64,
    /// Mnemonic the node derives its accounts from.
    pub mnemonic: String,
    /// Port the node listens on.
    pub port: u16,
    /// Surface VM errors as JSON-RPC errors.
    #[serde(rename = "vmErrorsOnRPCResponse")]
    pub vm_errors_on_rpc_response: bool,
    /// Hardfork identifier.
    pub hardfork: String,
    /// Suppress node output.
    pub quiet: bool,
    /// Additional options forwarded untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for NodeOptions {
    /// Default options:
    ///
    /// - `block_time = 2`
    /// - `network_id = 1337`
    /// - `mnemonic = DEFAULT_MNEMONIC`
    /// - `port = 8545`
    /// - `vm_errors_on_rpc_response = false`
    /// - `hardfork = "muirGlacier"`
    /// - `quiet = true`
    fn default() -> Self {
        Self {
            block_time: 2,
            network_id: 1337,
            mnemonic: DEFAULT_MNEMONIC.to_string(),
            port: DEFAULT_PORT,
            vm_errors_on_rpc_response: false,
            hardfork: "muirGlacier".to_string(),
            quiet: true,
            extra: Map::new(),
        }
    }
}

impl NodeOptions {
    /// Applies `overrides` on top of `self`; every `Some` value and every extra key wins.
    #[must_use]
    pub fn merged(mut self, overrides: NodeOverrides) -> Self {
        let NodeOverrides {
            block_time,
            network_id,
            mnemonic,
            port,
            vm_errors_on_rpc_response,
            hardfork,
            quiet,
            extra,
        } = overrides;

        if let Some(v) = block_time {
            self.block_time = v;
        }
        if let Some(v) = network_id {
            self.network_id = v;
        }
        if let Some(v) = mnemonic {
            self.mnemonic = v;
        }
        if let Some(v) = port {
            self.port = v;
        }
        if let Some(v) = vm_errors_on_rpc_response {
            self.vm_errors_on_rpc_response = v;
        }
        if let Some(v) = hardfork {
            self.hardfork = v;
        }
        if let Some(v) = quiet {
            self.quiet = v;
        }
        self.extra.extend(extra);
        self
    }

    /// Returns the options bound to `port`.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Caller-supplied option values; `None` keeps the default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOverrides {
    #[serde(rename = "blockTime", skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "vmErrorsOnRPCResponse", skip_serializing_if = "Option::is_none")]
    pub vm_errors_on_rpc_response: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardfork: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
