use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Delay between failed request attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// One try of a probe or request. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryAttempt {
    /// 1-based attempt index
    pub attempt: u32,
    pub succeeded: bool,
    pub latency_ms: f64,
    pub error: Option<String>,
}

impl RetryAttempt {
    pub fn success(attempt: u32, elapsed: Duration) -> Self {
        Self { attempt, succeeded: true, latency_ms: as_millis(elapsed), error: None }
    }

    pub fn failure(attempt: u32, elapsed: Duration, error: impl Into<String>) -> Self {
        Self { attempt, succeeded: false, latency_ms: as_millis(elapsed), error: Some(error.into()) }
    }
}

fn as_millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Bounded retry-with-backoff: up to `attempts` sequential tries, a fixed
/// `delay` after each failure, first success wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// `attempts` is raised to 1 if zero
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts: attempts.max(1), delay }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// The closure receives the 1-based attempt index. Latency is measured
    /// per attempt, so backoff sleeps never show up in a success's latency.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts = Vec::with_capacity(self.attempts as usize);

        for index in 1..=self.attempts {
            let start = Instant::now();
            let message = match operation(index).await {
                Ok(value) => {
                    attempts.push(RetryAttempt::success(index, start.elapsed()));
                    return RetryOutcome { value: Some(value), attempts };
                }
                Err(error) => error.to_string(),
            };

            debug!(attempt = index, of = self.attempts, error = %message, "Attempt failed");
            attempts.push(RetryAttempt::failure(index, start.elapsed(), message));

            if index < self.attempts && !self.delay.is_zero() {
                sleep(self.delay).await;
            }
        }

        RetryOutcome { value: None, attempts }
    }
}

/// Result of [`RetryPolicy::run`]: the value of the first successful attempt
/// (if any) plus every attempt made.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub value: Option<T>,
    pub attempts: Vec<RetryAttempt>,
}

impl<T> RetryOutcome<T> {
    /// Latency of the successful attempt
    pub fn latency_ms(&self) -> Option<f64> {
        self.attempts.last().filter(|attempt| attempt.succeeded).map(|attempt| attempt.latency_ms)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|attempt| attempt.error.as_deref())
    }

    /// Human readable failure description, e.g. `failed after 3 attempts (HTTP 503)`
    pub fn failure_summary(&self) -> String {
        let count = self.attempts.len();
        let noun = if count == 1 { "attempt" } else { "attempts" };
        match self.last_error() {
            Some(error) => format!("failed after {count} {noun} ({error})"),
            None => format!("failed after {count} {noun}"),
        }
    }
}
