//! Retry policies.
//!
//! This module groups the knobs that control **how many times** an operation
//! is attempted and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`] attempt budget, fixed delay, rejection message, mode flags
//! - [`RetryMode`]   how `retry` interprets success and failure
//!
//! ## Quick wiring
//! ```text
//! RegistryConfig { start: RetryPolicy, stop_poll: RetryPolicy, .. }
//!      ├─► NodeRegistry::acquire  ─► retry(start, || instance.start(..))
//!      └─► NodeInstance::quit     ─► retry_until_true(stop_poll, || status == Stopped)
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → single attempt, no delay, "Retry limit reached".
//! - Start policy used by the registry: 2 retries, 1000ms, `UntilSuccess`.
//! - Stop-poll policy used by instances: 5 retries, 1000ms, no throw.

mod retry;

pub use retry::{RetryMode, RetryPolicy, DEFAULT_REJECTION_MESSAGE};
