//! Retry executor: bounded, fixed-delay re-invocation of async operations.
//!
//! ## Contents
//! - [`retry`] re-runs a fallible operation, interpreting results per [`RetryMode`](crate::RetryMode)
//! - [`retry_until_true`] polls a predicate until it reports `true`
//!
//! ## Loop shape (both combinators)
//! ```text
//! for attempt in 0..=max_retries {
//!   ├─► attempt > 0 && delay > 0 ─► sleep(delay)
//!   ├─► run operation / predicate (sequential, never parallel)
//!   └─► outcome decides: return now, or continue
//! }
//! exhausted ─► RetryError::Exhausted { rejection_message, attempts }
//!              (retry_until_true may return Ok(false) instead)
//! ```
//!
//! ## Rules
//! - No attempt starts after the budget is exhausted.
//! - The delay is never applied before the first attempt.
//! - Each attempt is awaited before the next one starts, so its side effects are visible.

mod poll;
mod retry;

pub use poll::retry_until_true;
pub use retry::retry;

use crate::{error::RetryError, policies::RetryPolicy};

fn exhausted(policy: &RetryPolicy) -> RetryError {
    RetryError::Exhausted {
        message: policy.rejection_message.clone(),
        attempts: policy.max_attempts(),
    }
}
