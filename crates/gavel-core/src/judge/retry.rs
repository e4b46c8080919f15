//! Bounded retry with linear backoff, written as an explicit state machine:
//!
//! ```text
//! Attempting(n) --ok--> Success
//!      |err, n < max
//!      v
//! Retrying(n) --sleep(n * base_delay)--> Attempting(n + 1)
//!      |err, n == max
//!      v
//!  Exhausted
//! ```

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Effective attempt budget; a zero budget still makes one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause after failed attempt `attempt` (1-based) before the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

#[derive(Debug)]
enum AttemptState<T> {
    Attempting { attempt: u32 },
    Retrying { attempt: u32, error: anyhow::Error },
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32, error: anyhow::Error },
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32, error: anyhow::Error },
}

/// Drive `op` until it succeeds or the policy's attempt budget is spent.
/// `op` receives the 1-based attempt number.
pub async fn run_with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let max = policy.attempts();
    let mut state = AttemptState::Attempting { attempt: 1 };
    loop {
        state = match state {
            AttemptState::Attempting { attempt } => match op(attempt).await {
                Ok(value) => AttemptState::Success {
                    value,
                    attempts: attempt,
                },
                Err(error) if attempt >= max => AttemptState::Exhausted {
                    attempts: attempt,
                    error,
                },
                Err(error) => AttemptState::Retrying { attempt, error },
            },
            AttemptState::Retrying { attempt, error } => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    "judge attempt {}/{} failed: {:#}; retrying in {:?}",
                    attempt,
                    max,
                    error,
                    delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                AttemptState::Attempting {
                    attempt: attempt + 1,
                }
            }
            AttemptState::Success { value, attempts } => {
                return RetryOutcome::Success { value, attempts }
            }
            AttemptState::Exhausted { attempts, error } => {
                return RetryOutcome::Exhausted { attempts, error }
            }
        };
    }
}
