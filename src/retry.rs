use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Initial delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles the delay each time)
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Preset: connecting to the database at startup (5 attempts)
    /// Delays: 1s, 2s, 4s, 8s = 15s total wait time, enough for a
    /// container-started Postgres to accept connections
    pub fn database_connect() -> Self {
        Self::new(5, Duration::from_secs(1)).with_max_delay(Duration::from_secs(8))
    }

    /// Delay before the given attempt (0-indexed)
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
        Self::database_connect()
    }
}

/// Execute an async operation with retries, stopping early when `should_retry`
/// rejects the error (a malformed URL will not fix itself, a refused connection might).
///
/// # Panics
/// Panics if `config.max_attempts` is 0
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
    assert!(
        config.max_attempts >= 1,
        "RetryConfig.max_attempts must be >= 1, got {}",
        config.max_attempts
    );

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

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let remaining = config.max_attempts - attempt - 1;
                if remaining == 0 || !should_retry(&e) {
                    warn!(
                        "{}: Giving up after attempt {}/{}: {}",
                        operation_name,
                        attempt + 1,
                        config.max_attempts,
                        e
                    );
                    return Err(e);
                }
                warn!(
                    "{}: Attempt {}/{} failed ({}), {} retries remaining",
                    operation_name,
                    attempt + 1,
                    config.max_attempts,
                    e,
                    remaining
                );
            }
        }
        attempt += 1;
    }
}
