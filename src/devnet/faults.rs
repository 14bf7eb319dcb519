//! Fault injection for in-memory nodes.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Fault injection state shared by every node of one [`MemoryLauncher`](super::MemoryLauncher).
///
/// Flags are plain atomics so tests can flip them while nodes are running.
#[derive(Debug, Default)]
pub struct FaultInjector {
    /// Number of upcoming `listen` calls that fail with a bind error.
    pub fail_listen_times: AtomicU32,

    /// The next `close` fails; cleared once consumed.
    pub fail_close_once: AtomicBool,
    /// Every `close` fails.
    pub fail_close_always: AtomicBool,

    /// After a failed close, keep the node in `Stopping` forever (port stays bound).
    pub stick_on_close_failure: AtomicBool,
    /// After a failed close, milliseconds until the node reaches `Stopped` (0 = immediately).
    pub close_settle_ms: AtomicU64,

    /// Every JSON-RPC request fails.
    pub fail_rpc_always: AtomicBool,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the next `listen` should fail (consumes one injected failure).
    pub fn should_fail_listen(&self) -> bool {
        self.fail_listen_times
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Check if the next `close` should fail.
    pub fn should_fail_close(&self) -> bool {
        if self.fail_close_always.load(Ordering::Relaxed) {
            return true;
        }
        self.fail_close_once.swap(false, Ordering::Relaxed)
    }

    /// Check if RPC requests should fail.
    pub fn should_fail_rpc(&self) -> bool {
        self.fail_rpc_always.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_failures_are_consumed() {
        let faults = FaultInjector::new();
        faults.fail_listen_times.store(2, Ordering::Relaxed);
        assert!(faults.should_fail_listen());
        assert!(faults.should_fail_listen());
        assert!(!faults.should_fail_listen());
    }

    #[test]
    fn test_close_once_vs_always() {
        let faults = FaultInjector::new();
        faults.fail_close_once.store(true, Ordering::Relaxed);
        assert!(faults.should_fail_close());
        assert!(!faults.should_fail_close());

        faults.fail_close_always.store(true, Ordering::Relaxed);
        assert!(faults.should_fail_close());
        assert!(faults.should_fail_close());
    }
}
