//! Bounded retry with randomized delays.
//!
//! Every retrying operation in the crate (check-in, single box opening,
//! transaction submission) goes through [`RetryPolicy::run`]. The same
//! [`DelayRange`] type drives the anti-throttling pauses between steps.

use std::future::Future;
use std::time::Duration;

use log::{error, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::{Error, Result};

/// Inclusive range of milliseconds a randomized pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self { min_ms: min * 1_000, max_ms: max * 1_000 }
    }

    /// Draw one pause length. An inverted range collapses to `min_ms`.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }

    pub async fn sleep(&self) {
        let pause = self.sample();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

/// How many times to repeat a failed operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Pause before each retry
    pub delay: DelayRange,
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success(T),
    /// Every allowed attempt failed with a retryable error.
    Exhausted { attempts: u32, error: Error },
    /// An attempt failed with an error the predicate refused to retry.
    Terminal { attempts: u32, error: Error },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> Option<u32> {
        match self {
            | RetryOutcome::Success(_) => None,
            | RetryOutcome::Exhausted { attempts, .. } | RetryOutcome::Terminal { attempts, .. } => {
                Some(*attempts)
            }
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> RetryOutcome<U> {
        match self {
            | RetryOutcome::Success(value) => RetryOutcome::Success(f(value)),
            | RetryOutcome::Exhausted { attempts, error } => RetryOutcome::Exhausted { attempts, error },
            | RetryOutcome::Terminal { attempts, error } => RetryOutcome::Terminal { attempts, error },
        }
    }

    /// Collapse into a plain result; exhaustion becomes [`Error::RetriesExhausted`].
    pub fn into_result(self, operation: &str) -> Result<T> {
        match self {
            | RetryOutcome::Success(value) => Ok(value),
            | RetryOutcome::Exhausted { attempts, error } => Err(Error::RetriesExhausted {
                operation: operation.to_string(),
                attempts,
                last_error: error.to_string(),
            }),
            | RetryOutcome::Terminal { error, .. } => Err(error),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: DelayRange) -> Self {
        Self { max_retries, delay }
    }

    /// Policy that retries immediately; used by tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, delay: DelayRange::ZERO }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects, or
    /// `max_retries + 1` attempts have been made. `op` receives the 1-based
    /// attempt number.
    pub async fn run<T, F, Fut, P>(&self, operation: &str, mut op: F, retryable: P) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                | Ok(value) => return RetryOutcome::Success(value),
                | Err(error) if !retryable(&error) => {
                    error!("{} failed with a non-retryable error: {}", operation, error);
                    return RetryOutcome::Terminal { attempts: attempt, error };
                }
                | Err(error) if attempt >= max_attempts => {
                    error!("{} failed, giving up after {} attempts: {}", operation, attempt, error);
                    return RetryOutcome::Exhausted { attempts: attempt, error };
                }
                | Err(error) => {
                    warn!(
                        "{} failed: {}, retrying... ({}/{})",
                        operation, error, attempt, self.max_retries
                    );
                    self.delay.sleep().await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_sample_stays_in_range() {
        let range = DelayRange { min_ms: 20, max_ms: 40 };
        for _ in 0..100 {
            let d = range.sample().as_millis() as u64;
            assert!((20..=40).contains(&d));
        }
        assert_eq!(DelayRange::ZERO.sample(), Duration::ZERO);
        assert_eq!(DelayRange { min_ms: 9, max_ms: 3 }.sample(), Duration::from_millis(9));
        assert_eq!(DelayRange::from_secs(2, 8), DelayRange { min_ms: 2_000, max_ms: 8_000 });
    }

    #[test]
    fn test_zero_delay_does_not_sleep() {
        let started = std::time::Instant::now();
        tokio_test::block_on(DelayRange::ZERO.sleep());
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_gives_up_after_six_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(5);

        let outcome: RetryOutcome<()> = policy
            .run(
                "flaky op",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::RpcError("connection refused".into())) }
                },
                Error::is_retryable,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_matches!(outcome, RetryOutcome::Exhausted { attempts: 6, .. });
    }

    #[tokio::test]
    async fn test_succeeds_on_later_attempt() {
        let policy = RetryPolicy::immediate(5);
        let outcome = policy
            .run(
                "eventually ok",
                |attempt| async move {
                    if attempt < 3 {
                        Err(Error::RpcError("busy".into()))
                    } else {
                        Ok(attempt)
                    }
                },
                Error::is_retryable,
            )
            .await;
        assert_matches!(outcome, RetryOutcome::Success(3));
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = RetryPolicy::immediate(5)
            .run(
                "login",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::ApiError { status: 401, message: "expired".into() }) }
                },
                Error::is_retryable,
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts(), Some(1));
        assert_matches!(outcome.into_result("login"), Err(Error::ApiError { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_exhausted_into_result() {
        let outcome: RetryOutcome<()> = RetryPolicy::immediate(0)
            .run("submit", |_| async { Err(Error::RpcError("down".into())) }, |_| true)
            .await;
        assert_matches!(
            outcome.into_result("submit"),
            Err(Error::RetriesExhausted { attempts: 1, ref operation, .. }) if operation == "submit"
        );
    }
}
