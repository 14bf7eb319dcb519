//! # Registry configuration.
//!
//! Provides [`RegistryConfig`], the settings a [`NodeRegistry`](crate::NodeRegistry)
//! applies to every node it manages.
//!
//! Config is used in two ways:
//! 1. **Registry creation**: `NodeRegistry::builder(launcher).with_config(cfg)`
//! 2. **Instance defaults**: every registered instance polls with `stop_poll`
//!    and every `acquire` merges caller overrides over `defaults`.

use std::time::Duration;

use crate::{node::NodeOptions, policies::RetryPolicy};

/// Configuration for the node registry.
///
/// ## Field semantics
/// - `start`: policy wrapping each start inside `acquire` (mode is always `UntilSuccess`)
/// - `stop_poll`: policy used by `quit` to confirm shutdown after a close failure
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `defaults`: options merged under every `acquire` override
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Start retry policy used by `acquire`.
    ///
    /// A failed attempt quits the instance before the next delay.
    pub start: RetryPolicy,

    /// Status polling policy used by `quit` when `close` fails.
    ///
    /// Exhaustion is never raised from `quit` regardless of `throw_on_exhaustion`;
    /// the final observed status is returned instead.
    pub stop_poll: RetryPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Base options for every start.
    pub defaults: NodeOptions,
}

impl RegistryConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RegistryConfig {
    /// Default configuration:
    ///
    /// - `start = 2 retries, 1000 ms`
    /// - `stop_poll = 5 retries, 1000 ms, no throw`
    /// - `bus_capacity = 1024`
    /// - `defaults = NodeOptions::default()`
    fn default() -> Self {
        Self {
            start: RetryPolicy::new(2).with_delay(Duration::from_millis(1000)),
            stop_poll: RetryPolicy::new(5).with_delay(Duration::from_millis(1000)),
            bus_capacity: 1024,
            defaults: NodeOptions::default(),
        }
    }
}
