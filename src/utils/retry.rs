// src/utils/retry.rs
use std::future::Future;
use std::time::Duration;

/// Bounded retry with exponentially increasing delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or attempts run out.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        is_transient: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_transient(&err) => {
                    let wait = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label,
                        attempt,
                        self.max_attempts,
                        err,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => {
                    if attempt > 1 {
                        tracing::error!("{} failed after {} attempts: {}", label, attempt, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_retries_transient_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = Cell::new(0);
        let result: Result<&str, String> = tokio_test::block_on(policy.run(
            "flaky",
            |_| true,
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(format!("boom {}", n))
                    } else {
                        Ok("done")
                    }
                }
            },
        ));
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = Cell::new(0);
        let result: Result<(), String> = tokio_test::block_on(policy.run(
            "down",
            |_| true,
            || {
                calls.set(calls.get() + 1);
                async { Err("still down".to_string()) }
            },
        ));
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_permanent_error_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = Cell::new(0);
        let result: Result<(), String> = tokio_test::block_on(policy.run(
            "missing",
            |err: &String| !err.contains("404"),
            || {
                calls.set(calls.get() + 1);
                async { Err("404 not found".to_string()) }
            },
        ));
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
