//! Attempt counts and backoff in one place.
//!
//! The same policy drives two things: how many progressively wider windows the resolver searches
//! before it gives a node up, and how often a failing call to an external collaborator is retried
//! (with sleeps in between) before the deterministic fallback takes over.

use std::time::Duration;

/// Failure classification for retried operations.
pub trait Retryable {
    /// Whether another attempt could succeed.
    fn is_retryable(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq)]
/// Bounded attempts with exponential backoff.
pub struct RetryPolicy {
    /// Total attempts, the first included. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub backoff_initial: Duration,
    /// Growth factor per further failure, also used to widen search windows.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_initial: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            backoff_max: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    /// Number of attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    #[must_use]
    /// Growth factor for the given 1-based attempt: 1 for the first, then multiplied per attempt.
    pub fn factor(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        self.backoff_multiplier.max(1.0).powi(exponent)
    }

    #[must_use]
    /// Delay to wait after the given 1-based attempt failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = self.backoff_initial.as_secs_f64() * self.factor(attempt);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    /// Runs `op` until it succeeds, fails fatally, or attempts run out, sleeping between tries.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once attempts are exhausted.
    pub fn run<T, E: Retryable>(&self, op: impl FnMut(u32) -> Result<T, E>) -> Result<T, E> {
        self.run_with_sleep(op, std::thread::sleep)
    }

    /// [`RetryPolicy::run`] with an injectable sleep.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once attempts are exhausted.
    pub fn run_with_sleep<T, E: Retryable>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, E>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, E> {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    log::debug!("attempt {attempt}/{attempts} failed, retrying");
                    sleep(self.backoff(attempt));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/retry.rs"]
mod tests;
