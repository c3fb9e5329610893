use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Exponential backoff settings for outgoing platform calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Preset for delivering chat replies: 3 attempts, waits of 500ms then 1s
    pub fn reply_delivery() -> Self {
        Self::new(3, Duration::from_millis(500)).with_max_delay(Duration::from_secs(2))
    }

    /// Delay before the given attempt (0-indexed); the first attempt never waits
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::reply_delivery()
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts. Returns the last error on failure.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: Retry attempt {}/{} after {:?}",
                operation_name,
                attempt + 1,
                config.max_attempts,
                delay
            );
            sleep(delay).await;
        }

        let error = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{}: Succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if !should_retry(&error) {
            debug!("{}: Error is not retryable: {}", operation_name, error);
            return Err(error);
        }

        attempt += 1;
        if attempt >= config.max_attempts {
            warn!(
                "{}: All {} attempts failed. Last error: {}",
                operation_name, config.max_attempts, error
            );
            return Err(error);
        }

        warn!(
            "{}: Attempt {}/{} failed ({}), retrying",
            operation_name, attempt, config.max_attempts, error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig::new(3, Duration::from_millis(10))
    }

    #[test]
    fn test_reply_delivery_preset() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(500));
        assert_eq!(config.max_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryConfig::new(0, Duration::from_secs(1)).max_attempts, 1);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new(4, Duration::from_secs(1)).with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_respects_max() {
        let config = RetryConfig::new(10, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3));

        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<u32, &str> = with_retry_if(
            &fast(),
            "test",
            || {
                let c = counter.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<&str, String> = with_retry_if(
            &fast(),
            "test",
            || {
                let c = counter.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok("sent")
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), "sent");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<(), String> = with_retry_if(
            &fast(),
            "test",
            || {
                let c = counter.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("failure {}", n))
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_on_non_retryable_error() {
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<(), &str> = with_retry_if(
            &fast(),
            "test",
            || {
                let c = counter.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("400 Bad Request")
                }
            },
            |e: &&str| !e.starts_with("400"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
