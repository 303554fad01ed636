//! Outer retry policy
//!
//! Wraps whole runs with exponential backoff and an optional per-attempt
//! deadline. Only `CapabilityFailure` is retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::{CapabilityError, Result, WorkflowError};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first; 0 is treated as 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Deadline for each attempt
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let delay = self.base_delay.as_secs_f64() * self.multiplier.powi(retry as i32 - 1);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Run `attempt` until it succeeds, fails terminally, or attempts run out
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut n = 1;
        loop {
            let result = match self.timeout {
                Some(deadline) => match tokio::time::timeout(deadline, attempt()).await {
                    Ok(result) => result,
                    Err(_) => Err(WorkflowError::CapabilityFailure {
                        capability: "workflow".to_string(),
                        source: CapabilityError::timeout(format!(
                            "run exceeded {}ms",
                            deadline.as_millis()
                        )),
                    }),
                },
                None => attempt().await,
            };

            match result {
                Err(e) if e.is_retryable() && n < attempts => {
                    let delay = self.delay_for_retry(n);
                    warn!(attempt = n, max_attempts = attempts, error = %e, "retrying run in {:?}", delay);
                    sleep(delay).await;
                    n += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> WorkflowError {
        WorkflowError::capability(CapabilityKind::Router, CapabilityError::new("503"))
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for_retry(0), Duration::ZERO);
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_capability_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = RetryPolicy::default()
            .run(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = RetryPolicy::default()
            .with_max_attempts(2)
            .run(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(matches!(result, Err(WorkflowError::CapabilityFailure { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_protocol_violation_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = RetryPolicy::default()
            .run(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(WorkflowError::ProtocolViolation { route: 99 }) }
            })
            .await;

        assert!(matches!(result, Err(WorkflowError::ProtocolViolation { route: 99 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_capability_failure() {
        let result: Result<()> = RetryPolicy::no_retry()
            .with_timeout(Duration::from_millis(50))
            .run(|| async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(WorkflowError::CapabilityFailure { source, .. }) => {
                assert_eq!(source.kind, crate::error::CapabilityErrorKind::Timeout);
            }
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }
}
