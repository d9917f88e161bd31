//! Long-running remote operations
//!
//! Mutating ARM calls often return before the change is applied and hand
//! back something to poll. [`Operation`] wraps both cases so callers always
//! `wait` for completion while they still hold their named locks.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Still running; poll again after `retry_after` if the server said so
    InProgress { retry_after: Option<Duration> },
    Done(T),
}

/// Something that can be asked whether a remote operation has finished
#[async_trait]
pub trait PollOperation<T>: Send {
    async fn poll(&mut self) -> Result<PollStatus<T>>;
}

/// Backoff between polls
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the second poll
    pub initial_interval: Duration,

    /// Upper bound for any computed delay
    pub max_interval: Duration,

    /// Growth factor per attempt
    pub multiplier: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl PollConfig {
    /// Delay to use after the `attempt`-th unfinished poll (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(32) as i32);
        let delay = self.initial_interval.mul_f64(factor);
        delay.min(self.max_interval)
    }
}

enum OperationState<T> {
    Completed(T),
    Pending {
        description: String,
        poller: Box<dyn PollOperation<T>>,
    },
}

/// Handle to a remote operation that may still be running
pub struct Operation<T> {
    state: OperationState<T>,
}

impl<T: Send> Operation<T> {
    /// The remote call finished synchronously
    pub fn completed(value: T) -> Self {
        Self {
            state: OperationState::Completed(value),
        }
    }

    /// The remote call must be polled until it finishes
    pub fn pending(
        description: impl Into<String>,
        poller: impl PollOperation<T> + 'static,
    ) -> Self {
        Self {
            state: OperationState::Pending {
                description: description.into(),
                poller: Box::new(poller),
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, OperationState::Completed(_))
    }

    /// Poll until the operation finishes.
    ///
    /// There is no deadline here; bound the call with
    /// [`Timeouts::run`](crate::timeouts::Timeouts::run).
    pub async fn wait(self, config: &PollConfig) -> Result<T> {
        let (description, mut poller) = match self.state {
            OperationState::Completed(value) => return Ok(value),
            OperationState::Pending {
                description,
                poller,
            } => (description, poller),
        };

        let mut attempt = 0;
        loop {
            match poller.poll().await? {
                PollStatus::Done(value) => {
                    tracing::debug!("{} completed after {} polls", description, attempt + 1);
                    return Ok(value);
                }
                PollStatus::InProgress { retry_after } => {
                    let delay = retry_after.unwrap_or_else(|| config.delay_for_attempt(attempt));
                    tracing::trace!("{} still in progress, next poll in {:?}", description, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl<T> std::fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            OperationState::Completed(_) => f.write_str("Operation::Completed"),
            OperationState::Pending { description, .. } => {
                write!(f, "Operation::Pending({})", description)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use tokio::time::Instant;

    struct Countdown {
        remaining: u32,
        retry_after: Option<Duration>,
    }

    #[async_trait]
    impl PollOperation<&'static str> for Countdown {
        async fn poll(&mut self) -> Result<PollStatus<&'static str>> {
            if self.remaining == 0 {
                return Ok(PollStatus::Done("Succeeded"));
            }
            self.remaining -= 1;
            Ok(PollStatus::InProgress {
                retry_after: self.retry_after,
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl PollOperation<()> for Failing {
        async fn poll(&mut self) -> Result<PollStatus<()>> {
            Err(CloudError::OperationFailed("provisioning state Failed".into()))
        }
    }

    #[test]
    fn test_delay_for_attempt_backs_off_and_caps() {
        let config = PollConfig {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(1000), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_completed_operation_returns_immediately() {
        let op = Operation::completed(42);
        assert!(op.is_completed());
        assert_eq!(op.wait(&PollConfig::default()).await.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_operation_polls_with_backoff() {
        let op = Operation::pending(
            "PUT vnet-a",
            Countdown {
                remaining: 3,
                retry_after: None,
            },
        );
        assert!(!op.is_completed());

        let started = Instant::now();
        let status = op.wait(&PollConfig::default()).await.unwrap();

        assert_eq!(status, "Succeeded");
        // 1s + 2s + 4s of backoff before the fourth poll
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(7) && elapsed < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_retry_after_takes_precedence() {
        let op = Operation::pending(
            "DELETE vnet-a",
            Countdown {
                remaining: 2,
                retry_after: Some(Duration::from_secs(10)),
            },
        );

        let started = Instant::now();
        op.wait(&PollConfig::default()).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21));
    }

    #[tokio::test]
    async fn test_poll_error_propagates() {
        let op = Operation::pending("PUT nsg", Failing);
        let err = op.wait(&PollConfig::default()).await.unwrap_err();
        assert!(matches!(err, CloudError::OperationFailed(_)));
    }
}
