use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::RetryError;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
        }
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn retry<T, E, Op, Fut>(&self, mut operation: Op) -> Result<T, RetryError<E>>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        retry_in_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                }
                Err(last_error) => {
                    return Err(RetryError {
                        attempts: attempt,
                        last_error,
                    });
                }
            }
            tokio::time::sleep(self.delay).await;
            attempt += 1;
        }
    }
}
