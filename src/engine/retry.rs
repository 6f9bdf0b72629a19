//! Centralised bounded-retry policy for apply attempts.
//!
//! Retry lives here, in the engine, rather than inside individual adapters:
//! attempt counts, backoff, and per-attempt logging stay observable in one
//! place and adapters stay single-shot.

use std::time::Duration;

use crate::error::ActionError;
use crate::logging::Log;

/// Default number of additional attempts after the first failure.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay before the first retry; doubles on each subsequent one.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// How failed apply attempts are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first (0 disables retries).
    pub max_retries: u32,
    /// Delay before the first retry; doubled after every failed attempt.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given retry count and the default backoff.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }

    /// Total number of attempts this policy allows.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Injectable sleep, so retry backoff is testable without real delays.
#[cfg_attr(test, mockall::automock)]
pub trait Sleeper: Send + Sync {
    /// Block the current thread for the given duration.
    fn sleep(&self, duration: Duration);
}

/// Production [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Run `attempt` up to `policy.attempts()` times with exponential backoff.
///
/// Every non-final failure is logged as a warning; only the final attempt's
/// result is returned.
///
/// # Errors
///
/// Returns the last attempt's [`ActionError`] when all attempts fail.
pub fn run_with_retry(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    log: &dyn Log,
    label: &str,
    attempt: impl Fn() -> Result<(), ActionError>,
) -> Result<(), ActionError> {
    let attempts = policy.attempts();
    let mut backoff = policy.initial_backoff;
    let mut n = 1u32;
    loop {
        match attempt() {
            Ok(()) => return Ok(()),
            Err(e) if n < attempts => {
                log.warn(&format!(
                    "{label}: attempt {n}/{attempts} failed ({e}); retrying in {}ms",
                    backoff.as_millis()
                ));
                sleeper.sleep(backoff);
                backoff = backoff.saturating_mul(2);
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
