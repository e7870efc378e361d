use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry policy. `max_attempts` counts the first try.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl RetryConfig {
    /// Same spacing between every attempt, no jitter.
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            exponential_base: 1.0,
            jitter: false,
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (0-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Why a retried operation stopped without a value.
#[derive(Debug)]
pub enum RetryError<E> {
    /// `should_retry` rejected the error, no further attempts were made.
    Aborted { attempts: u32, error: E },
    /// Every attempt failed.
    Exhausted { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Aborted { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Aborted { error, .. } | RetryError::Exhausted { error, .. } => error,
        }
    }
}

/// Runs `operation` up to `config.max_attempts` times, sleeping between
/// attempts. Errors for which `should_retry` returns false end the loop at once.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) => {
                let attempts = attempt + 1;
                if !should_retry(&e) {
                    debug!("{} aborted on attempt {}: {}", operation_name, attempts, e);
                    return Err(RetryError::Aborted { attempts, error: e });
                }
                if attempts >= max_attempts {
                    warn!(
                        "{} failed after {} attempts. Last error: {}",
                        operation_name, attempts, e
                    );
                    return Err(RetryError::Exhausted { attempts, error: e });
                }

                let delay = config.delay_after(attempt);
                warn!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name, attempts, max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Retries every error.
pub async fn with_retry<T, E, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, operation_name, operation, |_| true).await
}
