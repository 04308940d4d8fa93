use core_logic::{with_retry, RetryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("success".to_string())
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_success_after_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count < 3 {
            Err(anyhow::anyhow!("temporary error"))
        } else {
            Ok("success".to_string())
        }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_bound_is_exact() {
    // A persistently failing operation runs exactly max_attempts times.
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("permanent error"))
    })
    .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_with_delay() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 50);

    let start = tokio::time::Instant::now();
    let _: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        if counter.load(Ordering::SeqCst) < 3 {
            Err(anyhow::anyhow!("temp"))
        } else {
            Ok("done".to_string())
        }
    })
    .await;

    // delays between the 3 attempts: 50ms + 100ms
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(150));
}

#[test]
fn test_backoff_sequence_doubles() {
    let config = RetryConfig::new(5, 1000);

    assert_eq!(config.delay_before(0), Duration::from_millis(1000));
    assert_eq!(config.delay_before(1), Duration::from_millis(2000));
    assert_eq!(config.delay_before(2), Duration::from_millis(4000));
    assert_eq!(config.delay_before(3), Duration::from_millis(8000));
}

#[test]
fn test_backoff_is_capped() {
    let config = RetryConfig::new(10, 1000).with_max_delay(5000);

    assert_eq!(config.delay_before(6), Duration::from_millis(5000));
    assert_eq!(config.delay_before(20), Duration::from_millis(5000));
}

#[test]
fn test_backoff_jitter_stays_in_bounds() {
    let config = RetryConfig::new(3, 1000).with_jitter(true);

    for _ in 0..100 {
        let delay = config.delay_before(1);
        assert!(delay >= Duration::from_millis(1000));
        assert!(delay <= Duration::from_millis(3000));
    }
}

#[test]
fn test_zero_attempts_clamps_to_one() {
    let config = RetryConfig::new(0, 10);
    assert_eq!(config.max_attempts, 1);
}
