//! # Retry policy for the retry combinators.
//!
//! [`RetryPolicy`] bundles the knobs read by [`retry`](crate::retry()) and
//! [`retry_until_true`](crate::retry_until_true):
//! - [`RetryPolicy::max_retries`] additional attempts beyond the first;
//! - [`RetryPolicy::delay`] fixed wait between attempts (never before the first);
//! - [`RetryPolicy::rejection_message`] message carried by the exhaustion error;
//! - [`RetryPolicy::mode`] how `retry` interprets results;
//! - [`RetryPolicy::throw_on_exhaustion`] whether `retry_until_true` fails or returns `false`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use nodevisor::{RetryMode, RetryPolicy};
//!
//! let policy = RetryPolicy::new(2).with_delay(Duration::from_secs(1));
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(policy.mode, RetryMode::UntilSuccess);
//! assert_eq!(policy.rejection_message, "Retry limit reached");
//! ```

use std::time::Duration;

/// Message used when a policy is exhausted and no custom one was set.
pub const DEFAULT_REJECTION_MESSAGE: &str = "Retry limit reached";

/// How [`retry`](crate::retry()) interprets the outcome of each attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryMode {
    /// Return the first success; fail when every attempt failed (default).
    #[default]
    UntilSuccess,
    /// Discard successes; the first failure ends the loop successfully.
    UntilFailure,
}

/// Bounded-retries, fixed-delay policy.
///
/// Total attempts are always `max_retries + 1`; the field types make every
/// value a valid policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts beyond the first.
    pub max_retries: u32,
    /// Wait between consecutive attempts (`Duration::ZERO` = no wait).
    pub delay: Duration,
    /// Message carried by [`RetryError::Exhausted`](crate::RetryError::Exhausted).
    pub rejection_message: String,
    /// Result interpretation for `retry`.
    pub mode: RetryMode,
    /// For `retry_until_true`: fail instead of returning `false` on exhaustion.
    pub throw_on_exhaustion: bool,
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `max_retries = 0` (single attempt);
    /// - `delay = 0`;
    /// - `rejection_message = "Retry limit reached"`;
    /// - `mode = UntilSuccess`, `throw_on_exhaustion = false`.
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
            rejection_message: DEFAULT_REJECTION_MESSAGE.to_string(),
            mode: RetryMode::UntilSuccess,
            throw_on_exhaustion: false,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` additional attempts, no delay.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Sets the wait between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the message used when the policy is exhausted.
    #[must_use]
    pub fn with_rejection_message(mut self, message: impl Into<String>) -> Self {
        self.rejection_message = message.into();
        self
    }

    /// Switches `retry` to [`RetryMode::UntilFailure`].
    #[must_use]
    pub fn until_failure(mut self) -> Self {
        self.mode = RetryMode::UntilFailure;
        self
    }

    /// Makes `retry_until_true` fail with `Exhausted` instead of returning `false`.
    #[must_use]
    pub fn throw_on_exhaustion(mut self) -> Self {
        self.throw_on_exhaustion = true;
        self
    }

    /// Total number of attempts the policy allows.
    #[inline]
    pub fn max_attempts(&self) -> u64 {
        u64::from(self.max_retries) + 1
    }

    /// Delay to apply before the given 0-indexed attempt, if any.
    ///
    /// The first attempt never waits; a zero delay never waits.
    #[inline]
    pub fn delay_before(&self, attempt: u64) -> Option<Duration> {
        if attempt == 0 || self.delay.is_zero() {
            None
        } else {
            Some(self.delay)
        }
    }
}
