//! # `retry_until_true`: poll a predicate until it holds.
//!
//! Designed for poll-to-confirm: waiting for an asynchronous state transition
//! (e.g. "has the node reached `Stopped`?") to become observable.
//!
//! ```text
//! Ok(true)  ─► return Ok(true)
//! Ok(false) ─► not yet satisfied, next attempt
//! Err(e)    ─► warn!, not yet satisfied, next attempt (never re-raised)
//!
//! exhausted ─► throw_on_exhaustion ? Err(Exhausted) : Ok(false)
//! ```

use std::{fmt, future::Future};

use tokio::time;
use tracing::{trace, warn};

use super::exhausted;
use crate::{error::RetryError, policies::RetryPolicy};

/// Invokes `predicate` up to `policy.max_retries + 1` times until it yields `true`.
///
/// # Example
/// ```rust
/// use std::convert::Infallible;
/// use nodevisor::{retry_until_true, RetryPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut polls = 0;
/// let done = retry_until_true(&RetryPolicy::new(5), || {
///     polls += 1;
///     let ready = polls == 3;
///     async move { Ok::<_, Infallible>(ready) }
/// })
/// .await;
///
/// assert_eq!(done, Ok(true));
/// assert_eq!(polls, 3);
/// # }
/// ```
pub async fn retry_until_true<E, F, Fut>(policy: &RetryPolicy, mut predicate: F) -> Result<bool, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts();

    for attempt in 0..max_attempts {
        if let Some(delay) = policy.delay_before(attempt) {
            time::sleep(delay).await;
        }

        match predicate().await {
            Ok(true) => return Ok(true),
            Ok(false) => {
                trace!(attempt = attempt + 1, max_attempts, "condition not yet satisfied");
            }
            Err(e) => {
                warn!(attempt = attempt + 1, max_attempts, error = %e, "error caught while polling");
            }
        }
    }

    if policy.throw_on_exhaustion {
        Err(exhausted(policy))
    } else {
        Ok(false)
    }
}
