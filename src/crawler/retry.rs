//! Bounded retry with a fixed delay
//!
//! Page and detail fetches both go through [`RetryPolicy`]. A failed attempt
//! is followed by a fixed wait (no jitter) and another try, up to
//! `max_retries` additional attempts. Running out of attempts is reported as
//! [`RetryOutcome::Exhausted`] so the caller decides whether that is fatal.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Result of running an operation under a retry policy
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded on attempt number `attempts` (1-based)
    Success { value: T, attempts: u32 },

    /// Every attempt failed; `last_error` is from the final one
    Exhausted { attempts: u32, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Converts into a plain `Result`, dropping the attempt count
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Exhausted { last_error, .. } => Err(last_error),
        }
    }
}

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries after the first attempt
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total number of tries this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Runs `operation` until it succeeds or the attempts run out
    ///
    /// # Arguments
    ///
    /// * `label` - What is being attempted, used in log lines
    /// * `operation` - Produces a fresh future for every attempt
    ///
    /// # Returns
    ///
    /// `Success` with the value and the attempt it took, or `Exhausted` with
    /// the last error after `max_retries + 1` failed tries
    pub async fn execute<T, E, F, Fut>(&self, label: &str, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    };
                }
                Err(error) if attempt <= self.max_retries => {
                    tracing::warn!(
                        "{} failed: {}. Retrying ({}/{}) after {:?}",
                        label,
                        error,
                        attempt,
                        self.max_retries,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!("{} failed: {}. Max retries reached", label, error);
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    };
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}
