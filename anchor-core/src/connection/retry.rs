use std::future::Future;
use std::time::Duration;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// `RetryPolicy` is a fixed interval policy with a hard attempt ceiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// at least one attempt is always made
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn get_max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn get_interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INTERVAL)
    }
}

/// `Clock` abstracts waiting between attempts
#[async_trait]
pub trait Clock: Clone + Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// `Attempt` is what one try of a retried operation reports
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T, E> {
    Ready(T),
    Pending,
    Abort(E),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    Timeout { attempts: u32 },
    Aborted(E),
}

/// `retry` runs `operation` until it's ready, aborted or the policy ceiling is reached
///
/// `operation` receives the 1-based attempt number. There is no sleep after the last attempt
pub async fn retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    clock: &C,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
    C: Clock,
{
    for attempt in 1..=policy.get_max_attempts() {
        match operation(attempt).await {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Abort(err) => return Err(RetryError::Aborted(err)),
            Attempt::Pending => {
                debug!("[retry] attempt {} of {} pending", attempt, policy.get_max_attempts());
                if attempt < policy.get_max_attempts() {
                    clock.sleep(policy.get_interval()).await;
                }
            }
        }
    }

    Err(RetryError::Timeout {
        attempts: policy.get_max_attempts(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// `FakeClock` records every requested sleep and returns immediately
    #[derive(Clone, Default)]
    pub(crate) struct FakeClock {
        pub(crate) sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl FakeClock {
        pub(crate) fn slept(&self) -> Vec<Duration> {
            self.sleeps.lock().map(|sleeps| sleeps.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        async fn sleep(&self, duration: Duration) {
            if let Ok(mut sleeps) = self.sleeps.lock() {
                sleeps.push(duration);
            }
        }
    }

    #[tokio::test]
    async fn test_ready_after_some_attempts() {
        let clock = FakeClock::default();
        let policy = RetryPolicy::default();

        let result: Result<u32, RetryError<String>> = retry(&policy, &clock, |attempt| async move {
            match attempt {
                3 => Attempt::Ready(attempt),
                _ => Attempt::Pending,
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(clock.slept(), vec![Duration::from_secs(1), Duration::from_secs(1)])
    }

    #[tokio::test]
    async fn test_timeout_after_ceiling() {
        let clock = FakeClock::default();
        let policy = RetryPolicy::new(10, Duration::from_millis(500));

        let result: Result<(), RetryError<String>> =
            retry(&policy, &clock, |_| async { Attempt::Pending }).await;

        assert_eq!(result, Err(RetryError::Timeout { attempts: 10 }));
        assert_eq!(clock.slept().len(), 9)
    }

    #[tokio::test]
    async fn test_abort_stops_immediately() {
        let clock = FakeClock::default();
        let policy = RetryPolicy::default();

        let result: Result<(), RetryError<String>> = retry(&policy, &clock, |_| async {
            Attempt::Abort("rejected".to_string())
        })
        .await;

        assert_eq!(result, Err(RetryError::Aborted("rejected".to_string())));
        assert!(clock.slept().is_empty())
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, DEFAULT_INTERVAL).get_max_attempts(), 1)
    }
}
