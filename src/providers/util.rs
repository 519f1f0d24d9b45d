use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retries an async operation with a bounded number of attempts and a fixed delay
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `attempts`: Total number of runs, at least one
/// - `delay`: Pause between a failed attempt and the next one
///
/// # Returns
/// The first successful result, or the last error once every attempt failed
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    attempts: usize,
    delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                warn!("Attempt {}/{} failed: {}", attempt, attempts, err);
                if attempt >= attempts {
                    return Err(err);
                }
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<usize, String> = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("boom {n}")) } else { Ok(n) }
            },
            3,
            Duration::ZERO,
        )
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_exact_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            },
            4,
            Duration::ZERO,
        )
        .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_attempts() {
        let start = tokio::time::Instant::now();
        let result: Result<(), String> =
            with_retry(|| async { Err("down".to_string()) }, 3, Duration::from_secs(5)).await;
        assert!(result.is_err());
        // two pauses for three attempts, none after the last
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_success() {
        let start = tokio::time::Instant::now();
        let result: Result<u8, String> =
            with_retry(|| async { Ok(1) }, 3, Duration::from_secs(5)).await;
        assert_eq!(result, Ok(1));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicUsize::new(0);
        let _: Result<(), String> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            },
            0,
            Duration::ZERO,
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
