//! Bounded retry with a pause between attempts
//!
//! The policy is independent of HTTP: it wraps any fallible async
//! operation, so the fetcher and its tests share the same loop.

use std::future::Future;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

/// Default number of attempts per query date
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts (in milliseconds)
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// How the pause grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same pause every time
    Fixed,
    /// Pause doubles after every failure: 1s, 2s, 4s, ...
    Exponential,
}

/// Retry policy for one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: u32,
    /// Base pause between attempts in milliseconds
    pub delay_ms: u64,
    /// Growth of the pause
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_DELAY_MS,
            backoff: Backoff::Fixed,
        }
    }
}

/// Every attempt failed; carries the last error
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Attempts that were made
    pub attempts: u32,
    /// Error returned by the final attempt
    pub last_error: E,
}

impl RetryPolicy {
    /// Policy that makes a single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Attempts actually made; zero is treated as one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause before attempt `attempt + 1`, given `attempt` failures so far (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms = match self.backoff {
            Backoff::Fixed => self.delay_ms,
            Backoff::Exponential => self
                .delay_ms
                .saturating_mul(2u64.saturating_pow(attempt)),
        };
        Duration::from_millis(delay_ms)
    }

    /// Run `operation` until it succeeds or the policy is exhausted.
    ///
    /// `label` identifies the unit of work in log output.
    ///
    /// # Example
    /// ```
    /// use availability_core::retry::RetryPolicy;
    ///
    /// # async fn example() {
    /// let policy = RetryPolicy { delay_ms: 0, ..RetryPolicy::default() };
    /// let value: Result<u32, _> = policy.run("demo", || async { Ok::<_, String>(7) }).await;
    /// assert_eq!(value.unwrap(), 7);
    /// # }
    /// ```
    pub async fn run<T, E, F, Fut>(&self, label: &str, operation: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.run_with_hook(label, operation, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_retry` with the number of
    /// failed attempts before each pause.
    pub async fn run_with_hook<T, E, F, Fut, H>(
        &self,
        label: &str,
        mut operation: F,
        mut on_retry: H,
    ) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        H: FnMut(u32),
    {
        let attempts = self.attempts();
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(Exhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:?}",
                        label, attempt, attempts, error, delay
                    );
                    on_retry(attempt);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }
}
