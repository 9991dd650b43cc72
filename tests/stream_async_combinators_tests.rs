use parking_lot::Mutex;
use pushflow::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_map_async_delivers_in_completion_order() {
    let result = from_iter(vec![1u64, 2, 3, 4, 5])
        .map_async(|x, resolve| {
            tokio::spawn(async move {
                sleep(Duration::from_millis(100 - x * 10)).await;
                resolve.resolve(x * 2);
            });
        })
        .collect()
        .await
        .unwrap();

    assert_eq!(result, vec![10, 8, 6, 4, 2]);
}

#[tokio::test]
async fn test_map_async_ends_only_after_every_transform_resolved() {
    let resolvers = Arc::new(Mutex::new(Vec::new()));
    let emitted = Arc::new(AtomicUsize::new(0));
    let ended = Arc::new(AtomicBool::new(false));

    let parked = resolvers.clone();
    let stream = from_iter(vec![1, 2, 3]).map_async(move |x, resolve| {
        parked.lock().push((x, resolve));
    });

    let emitted_clone = emitted.clone();
    let ended_clone = ended.clone();
    stream
        .consume(
            move |_| {
                emitted_clone.fetch_add(1, Ordering::SeqCst);
                Flow::Continue
            },
            move |outcome| {
                assert!(outcome.is_ok());
                ended_clone.store(true, Ordering::SeqCst);
            },
        )
        .unwrap();

    // upstream is exhausted but nothing has resolved yet
    assert!(!ended.load(Ordering::SeqCst));

    let mut pending: Vec<(i32, Resolve<i32>)> = resolvers.lock().drain(..).collect();
    // resolve out of arrival order
    let (x, last) = pending.remove(0);
    while let Some((x, resolve)) = pending.pop() {
        resolve.resolve(x);
        assert!(!ended.load(Ordering::SeqCst));
    }
    last.resolve(x);

    assert!(ended.load(Ordering::SeqCst));
    assert_eq!(emitted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_map_async_synchronous_resolution() {
    let result = range(1, 4, 1)
        .map_async(|x, resolve| resolve.resolve(x * x))
        .collect()
        .await
        .unwrap();
    assert_eq!(result, vec![1, 4, 9, 16]);
}

#[tokio::test]
async fn test_map_async_on_empty_stream() {
    let result = empty::<i32>().map_async(|x, resolve| resolve.resolve(x)).collect().await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_map_async_dropped_resolver_counts_as_done() {
    let result = range(1, 6, 1)
        .map_async(|x, resolve| {
            if x % 2 == 0 {
                resolve.resolve(x);
            }
        })
        .collect()
        .await
        .unwrap();
    assert_eq!(result, vec![2, 4, 6]);
}

#[tokio::test]
async fn test_map_async_reject_ends_with_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result = range(1, 10, 1)
        .map_async(move |x, resolve| {
            counter.fetch_add(1, Ordering::SeqCst);
            if x == 2 {
                resolve.reject(StreamError::Failed("bad element".to_string()));
            } else {
                resolve.resolve(x);
            }
        })
        .collect()
        .await;

    assert_eq!(result, Err(StreamError::Failed("bad element".to_string())));
    // no transform starts after the failure
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_map_async_discards_results_after_stop() {
    let result = from_iter(vec![30u64, 10, 20])
        .map_async(|delay, resolve| {
            tokio::spawn(async move {
                sleep(Duration::from_millis(delay)).await;
                resolve.resolve(delay);
            });
        })
        .limit(1)
        .collect()
        .await
        .unwrap();

    assert_eq!(result, vec![10]);
}

#[tokio::test(start_paused = true)]
async fn test_map_async_upstream_error_waits_for_in_flight() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = tokio::sync::oneshot::channel();

    let source: Stream<i32> = Stream::new(|mut sink: BoxSink<i32>| {
        sink.emit(1);
        sink.end(Err(StreamError::IO("closed".to_string())));
    });
    let seen_clone = seen.clone();
    source
        .map_async(|x, resolve| {
            tokio::spawn(async move {
                sleep(Duration::from_millis(5)).await;
                resolve.resolve(x + 100);
            });
        })
        .consume(
            move |item| {
                seen_clone.lock().push(item);
                Flow::Continue
            },
            move |outcome| {
                let _ = tx.send(outcome);
            },
        )
        .unwrap();

    assert_eq!(rx.await.unwrap(), Err(StreamError::IO("closed".to_string())));
    assert_eq!(*seen.lock(), vec![101]);
}

#[tokio::test]
async fn test_map_async_with_retry_recovers() {
    let result = range(1, 3, 1)
        .map_async_with_retry(
            RetryPolicy::new(2, Duration::ZERO),
            |x, attempt: Attempt<i64, String>| {
                let number = attempt.number();
                if number < 3 {
                    attempt.fail(format!("attempt {} failed", number));
                } else {
                    attempt.succeed(*x * 10);
                }
            },
        )
        .collect()
        .await
        .unwrap();

    assert_eq!(result, vec![Ok(10), Ok(20), Ok(30)]);
}

#[tokio::test]
async fn test_map_async_with_retry_exhausted() {
    let result = from_iter(vec![1])
        .map_async_with_retry(
            RetryPolicy::new(1, Duration::ZERO),
            |_, attempt: Attempt<i32, String>| {
                let message = format!("attempt {}", attempt.number());
                attempt.fail(message);
            },
        )
        .collect()
        .await
        .unwrap();

    assert_eq!(result, vec![Err(RetryError::Failed("attempt 2".to_string()))]);
}

#[tokio::test(start_paused = true)]
async fn test_map_async_with_retry_timeout() {
    let timeout = Duration::from_millis(50);
    let result = from_iter(vec![1, 2])
        .map_async_with_retry(RetryPolicy::new(0, timeout), |_, attempt: Attempt<i32, String>| {
            // never reports
            drop(attempt);
        })
        .collect()
        .await
        .unwrap();

    assert_eq!(result, vec![Err(RetryError::Timeout(timeout)), Err(RetryError::Timeout(timeout))]);
}
