//! Retry/timeout wrapper for fallible asynchronous operations.
//!
//! [`with_retry_timeout`] runs an operation that reports through an
//! [`Attempt`] handle. A failed attempt is re-run immediately while the
//! retry budget lasts. An optional deadline covers all attempts. Whatever
//! happens, the callback runs exactly once: the first outcome to arrive
//! wins and every later one is discarded.

use futures::channel::oneshot;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::RetryError;
use crate::stream_configuration::RetryPolicy;

type Operation<R, E> = Box<dyn Fn(Attempt<R, E>) + Send + Sync>;
type Callback<R, E> = Box<dyn FnOnce(Result<R, RetryError<E>>) + Send>;

/// Completion handle for one attempt.
///
/// Consumed by [`Attempt::complete`], so an attempt reports at most once.
/// Dropping it without completing leaves the outcome to other attempts or
/// to the deadline.
pub struct Attempt<R, E> {
    state: Arc<RetryState<R, E>>,
    number: u32,
}

impl<R, E> Attempt<R, E> {
    /// 1 for the first attempt, 2 for the first retry, ...
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Report the outcome of this attempt
    pub fn complete(self, result: Result<R, E>) {
        let Attempt { state, number } = self;
        match result {
            Ok(value) => {
                state.finish(Ok(value));
            }
            Err(error) => {
                if let Some(next) = state.reserve_retry() {
                    log::debug!("attempt {} failed, starting attempt {}", number, next);
                    RetryState::run(&state, next);
                } else {
                    state.finish(Err(RetryError::Failed(error)));
                }
            }
        }
    }

    pub fn succeed(self, value: R) {
        self.complete(Ok(value))
    }

    pub fn fail(self, error: E) {
        self.complete(Err(error))
    }
}

struct RetryState<R, E> {
    operation: Operation<R, E>,
    inner: Mutex<RetryInner<R, E>>,
}

struct RetryInner<R, E> {
    retries_left: u32,
    attempts: u32,
    // None once the single completion has been delivered
    callback: Option<Callback<R, E>>,
    timer: Option<JoinHandle<()>>,
}

impl<R, E> RetryState<R, E> {
    fn run(state: &Arc<Self>, number: u32) {
        (state.operation)(Attempt {
            state: Arc::clone(state),
            number,
        });
    }

    /// Claim one retry from the budget; returns the next attempt number
    fn reserve_retry(&self) -> Option<u32> {
        let mut inner = self.inner.lock();
        if inner.callback.is_none() || inner.retries_left == 0 {
            return None;
        }
        inner.retries_left -= 1;
        inner.attempts += 1;
        Some(inner.attempts)
    }

    /// Deliver `result` unless an outcome was already delivered.
    /// Returns whether this call delivered.
    fn finish(&self, result: Result<R, RetryError<E>>) -> bool {
        let (callback, timer) = {
            let mut inner = self.inner.lock();
            (inner.callback.take(), inner.timer.take())
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => {
                log::debug!("discarding completion that arrived after the outcome was delivered");
                false
            }
        }
    }
}

/// Run `operation` under `policy` and report the outcome to `callback`.
///
/// `operation` is invoked once per attempt with a fresh [`Attempt`].
/// There is no backoff between attempts. When `policy.timeout` is
/// non-zero a timer races all attempts and, if it wins, the callback
/// receives [`RetryError::Timeout`]; attempts still running are not
/// cancelled but their outcomes are dropped.
///
/// # Panics
/// If a timeout is configured and no Tokio runtime is running.
pub fn with_retry_timeout<R, E, Op, Cb>(policy: &RetryPolicy, operation: Op, callback: Cb)
where
    R: Send + 'static,
    E: Send + 'static,
    Op: Fn(Attempt<R, E>) + Send + Sync + 'static,
    Cb: FnOnce(Result<R, RetryError<E>>) + Send + 'static,
{
    let state = Arc::new(RetryState {
        operation: Box::new(operation),
        inner: Mutex::new(RetryInner {
            retries_left: policy.retries,
            attempts: 1,
            callback: Some(Box::new(callback)),
            timer: None,
        }),
    });

    if policy.has_timeout() {
        let deadline = policy.timeout;
        let timer_state = Arc::clone(&state);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if timer_state.finish(Err(RetryError::Timeout(deadline))) {
                log::warn!("operation timed out after {:?}", deadline);
            }
        });
        state.inner.lock().timer = Some(timer);
    }

    RetryState::run(&state, 1);
}

/// Future-based form of [`with_retry_timeout`].
///
/// Each attempt calls `operation` and drives the returned future on its
/// own task, so an attempt that outlives the deadline keeps running while
/// its result is discarded.
pub async fn retry_timeout<R, E, F, Fut>(
    policy: RetryPolicy,
    operation: F,
) -> Result<R, RetryError<E>>
where
    R: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    with_retry_timeout(
        &policy,
        move |attempt: Attempt<R, E>| {
            let attempt_future = operation();
            tokio::spawn(async move { attempt.complete(attempt_future.await) });
        },
        move |result| {
            let _ = tx.send(result);
        },
    );
    rx.await.unwrap_or(Err(RetryError::Abandoned))
}

/// Shorthand for a policy with `retries` retries and no deadline
pub fn retries(retries: u32) -> RetryPolicy {
    RetryPolicy::new(retries, Duration::ZERO)
}
