//! Retry policy with exponential backoff and optional jitter

use crate::config::FetchConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Random jitter of ±30% on each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl From<&FetchConfig> for RetryConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            jitter: config.jitter,
            ..Default::default()
        }
    }
}

/// Run `f` until it succeeds or the retries are spent, returning the last error
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut backoff = config.initial_backoff;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_retries {
                    warn!(
                        operation,
                        attempts = attempt + 1,
                        error = %e,
                        "Giving up after retries"
                    );
                    return Err(e);
                }
                attempt += 1;

                let delay = calculate_backoff(backoff, config.jitter);
                warn!(
                    operation,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying"
                );

                tokio::time::sleep(delay).await;

                backoff = Duration::from_millis(
                    ((backoff.as_millis() as f64 * config.backoff_multiplier)
                        .min(config.max_backoff.as_millis() as f64)) as u64,
                );
            }
        }
    }
}

fn calculate_backoff(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let jitter_factor = 1.0 + rand::thread_rng().gen_range(-0.3..0.3);
        Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
    } else {
        base
    }
}
