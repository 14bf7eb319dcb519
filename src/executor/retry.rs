//! # `retry`: re-run a fallible async operation under a [`RetryPolicy`].
//!
//! ## Modes
//! ```text
//! UntilSuccess:  Ok(v)  ─► return Ok(Some(v))
//!                Err(e) ─► warn!, next attempt
//!
//! UntilFailure:  Ok(_)  ─► discard, next attempt
//!                Err(_) ─► return Ok(None)   (the expected outcome, not logged)
//! ```
//! Budget exhausted in either mode → [`RetryError::Exhausted`].

use std::{fmt, future::Future};

use tokio::time;
use tracing::{trace, warn};

use super::exhausted;
use crate::{
    error::RetryError,
    policies::{RetryMode, RetryPolicy},
};

/// Invokes `operation` up to `policy.max_retries + 1` times.
///
/// Returns `Ok(Some(value))` on the first success in [`RetryMode::UntilSuccess`],
/// and `Ok(None)` on the first failure in [`RetryMode::UntilFailure`].
///
/// # Example
/// ```rust
/// use nodevisor::{retry, RetryPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut calls = 0;
/// let out = retry(&RetryPolicy::new(2), || {
///     calls += 1;
///     let n = calls;
///     async move { if n < 2 { Err("not yet") } else { Ok(n) } }
/// })
/// .await;
///
/// assert_eq!(out, Ok(Some(2)));
/// # }
/// ```
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<Option<T>, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts();

    for attempt in 0..max_attempts {
        if let Some(delay) = policy.delay_before(attempt) {
            time::sleep(delay).await;
        }

        match (operation().await, policy.mode) {
            (Ok(value), RetryMode::UntilSuccess) => return Ok(Some(value)),
            (Ok(_), RetryMode::UntilFailure) => {
                trace!(attempt = attempt + 1, max_attempts, "operation still succeeding");
            }
            (Err(e), RetryMode::UntilSuccess) => {
                warn!(attempt = attempt + 1, max_attempts, error = %e, "error caught in retry");
            }
            (Err(_), RetryMode::UntilFailure) => return Ok(None),
        }
    }

    Err(exhausted(policy))
}
