//! # Node status as reported by a node process.
//!
//! The node reports its state with power-of-two flags; this crate treats the
//! state as a single discrete value and never combines flags.
//!
//! ```text
//! flag  state
//!    1  Started
//!    2  Starting
//!    4  Stopped
//!    8  Stopping
//!   16  Paused
//! ```

use std::fmt;

/// Discrete lifecycle state of a node process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Not listening; the port is free.
    Stopped,
    /// `listen` is in progress.
    Starting,
    /// Listening and answering requests.
    Started,
    /// `close` is in progress (or stuck).
    Stopping,
    /// Mining/processing suspended while the server stays up.
    Paused,
}

impl NodeStatus {
    /// Returns the node's native flag for this state.
    pub fn bits(self) -> u8 {
        match self {
            NodeStatus::Started => 1,
            NodeStatus::Starting => 2,
            NodeStatus::Stopped => 4,
            NodeStatus::Stopping => 8,
            NodeStatus::Paused => 16,
        }
    }

    /// Parses a native flag; combined or unknown bit patterns yield `None`.
    ///
    /// # Example
    /// ```
    /// use nodevisor::NodeStatus;
    ///
    /// assert_eq!(NodeStatus::from_bits(4), Some(NodeStatus::Stopped));
    /// assert_eq!(NodeStatus::from_bits(1 | 2), None);
    /// ```
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(NodeStatus::Started),
            2 => Some(NodeStatus::Starting),
            4 => Some(NodeStatus::Stopped),
            8 => Some(NodeStatus::Stopping),
            16 => Some(NodeStatus::Paused),
            _ => None,
        }
    }

    /// True iff the node is `Starting` or `Started` and must be stopped before reuse of its port.
    #[inline]
    pub fn needs_stopping(self) -> bool {
        matches!(self, NodeStatus::Starting | NodeStatus::Started)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Stopped => "stopped",
            NodeStatus::Starting => "starting",
            NodeStatus::Started => "started",
            NodeStatus::Stopping => "stopping",
            NodeStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
