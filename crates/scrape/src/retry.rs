//! Retry policy shared by every fetcher.
//!
//! The exchanges fail in bursts: edge 403s, half-rendered pages, stalled
//! loading overlays. Transient failures are retried with a bounded,
//! deterministic backoff; parse failures are not, since re-requesting
//! the same malformed payload cannot help.

use std::time::Duration;

use bondboard_core::FetchError;
use log::warn;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay between every attempt.
    Fixed(Duration),
    /// `base * n` before attempt `n + 1`: 1s, 2s, 3s for a 1s base.
    Linear(Duration),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Backoff,
    source_name: &'static str,
}

impl RetryPolicy {
    pub fn new(source_name: &'static str, max_attempts: usize, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            source_name,
        }
    }

    /// Policy for plain HTTP endpoints: 3 attempts, linear 1s backoff.
    pub fn http(source_name: &'static str) -> Self {
        Self::new(source_name, 3, Backoff::Linear(Duration::from_secs(1)))
    }

    /// Policy for browser-driven flows: 3 attempts, flat 5s between,
    /// since each attempt already spends most of its time waiting on
    /// page loads.
    pub fn browser(source_name: &'static str) -> Self {
        Self::new(source_name, 3, Backoff::Fixed(Duration::from_secs(5)))
    }

    fn delay_after(&self, failed_attempts: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(base) => base * failed_attempts as u32,
        }
    }

    /// Drive `op` until it succeeds, a non-transient error surfaces, or
    /// attempts run out. The closure receives the zero-based attempt
    /// index. Exhaustion wraps the last error so callers can see both
    /// the attempt count and the terminal cause.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(usize) -> Fut,
        Fut: std::future::Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(FetchError::RetriesExhausted {
                            source_name: self.source_name.to_string(),
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} attempt {}/{} failed, retrying in {:?}: {}",
                        self.source_name, attempt, self.max_attempts, delay, err
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{advance, pause};

    #[test]
    fn test_linear_backoff_grows_per_attempt() {
        let policy = RetryPolicy::http("bse");
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
    }

    #[test]
    fn test_fixed_backoff_is_flat() {
        let policy = RetryPolicy::browser("bse");
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        pause();
        let policy = RetryPolicy::new("nse", 3, Backoff::Fixed(Duration::from_secs(1)));
        let attempts = Arc::new(AtomicUsize::new(0));
        let advancer = tokio::spawn(async {
            advance(Duration::from_secs(1)).await;
            advance(Duration::from_secs(1)).await;
        });

        let result = policy
            .run(|attempt| {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(FetchError::transport("nse", "connection reset"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        advancer.await.unwrap();
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempt_count_and_last_error() {
        pause();
        let policy = RetryPolicy::new("bse", 3, Backoff::Fixed(Duration::from_secs(1)));
        let advancer = tokio::spawn(async {
            advance(Duration::from_secs(1)).await;
            advance(Duration::from_secs(1)).await;
        });

        let result: Result<(), _> = policy
            .run(|_| async { Err(FetchError::transport("bse", "edge 403")) })
            .await;

        advancer.await.unwrap();
        match result.unwrap_err() {
            FetchError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Transport { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_parse_errors_are_not_retried() {
        let policy = RetryPolicy::http("bse");
        let attempts = Arc::new(AtomicUsize::new(0));

        let result: Result<(), _> = policy
            .run(|_| {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::page_parse("bse", "results table missing"))
                }
            })
            .await;

        assert!(matches!(result.unwrap_err(), FetchError::PageParse { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
