//! Bounded exponential backoff for the startup connect loop.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Parameters for exponential backoff.
#[derive(Debug, Clone)]
pub struct BackoffParams {
    /// Initial delay in milliseconds
    pub initial_ms: u64,
    /// Multiplier for each retry
    pub mult: f64,
    /// Maximum delay in milliseconds
    pub max_ms: u64,
    /// Maximum number of tries
    pub max_tries: u32,
}

impl Default for BackoffParams {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            mult: 2.0,
            max_ms: 10_000,
            max_tries: 5,
        }
    }
}

impl BackoffParams {
    pub fn with_tries(max_tries: u32) -> Self {
        Self {
            max_tries,
            ..Self::default()
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// Retries only while `can_retry` approves the error; gives up after
/// `max_tries` attempts and returns the last error.
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    mut f: F,
    can_retry: R,
    params: &BackoffParams,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut backoff_ms = 0u64;
    let mut tries = 0u32;

    loop {
        match f().await {
            Ok(result) => {
                if tries > 0 {
                    debug!("Operation succeeded after {} retries", tries);
                }
                return Ok(result);
            }
            Err(e) => {
                tries += 1;
                if tries >= params.max_tries || !can_retry(&e) {
                    return Err(e);
                }

                backoff_ms = if backoff_ms == 0 {
                    params.initial_ms
                } else {
                    ((backoff_ms as f64) * params.mult).min(params.max_ms as f64) as u64
                };

                debug!("Attempt {} failed ({}), retrying in {}ms", tries, e, backoff_ms);
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let params = BackoffParams {
            initial_ms: 1,
            mult: 1.0,
            max_ms: 1,
            max_tries: 5,
        };

        let result = retry_with_backoff(
            || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient")
                } else {
                    Ok(42)
                }
            },
            |_| true,
            &params,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_tries() {
        let attempts = AtomicU32::new(0);
        let params = BackoffParams {
            initial_ms: 1,
            mult: 1.0,
            max_ms: 1,
            max_tries: 3,
        };

        let result: std::result::Result<(), &str> = retry_with_backoff(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("down")
            },
            |_| true,
            &params,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_fatal_errors() {
        let attempts = AtomicU32::new(0);
        let result: std::result::Result<(), &str> = retry_with_backoff(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("fatal")
            },
            |e| *e != "fatal",
            &BackoffParams::default(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
