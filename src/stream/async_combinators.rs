//! Async combinators: map_async and map_async_with_retry.
//!
//! `map_async` starts a transform for every upstream element without
//! waiting for earlier ones to resolve. Results are delivered in completion
//! order, not arrival order; no resequencing buffer is kept.
//!
//! Completion accounting: the downstream `end` fires once the upstream has
//! ended and no transform is in flight. After downstream asks to stop, no
//! new transform is started and results of those still in flight are
//! discarded.

use parking_lot::Mutex;
use std::sync::Arc;

use super::core::{BoxSink, Flow, Sink, Stream};
use crate::error::{RetryError, StreamError, StreamResult};
use crate::retry::{with_retry_timeout, Attempt};
use crate::stream_configuration::RetryPolicy;

/// Completion handle for one `map_async` transform.
///
/// Resolving consumes the handle. Dropping it unresolved counts as a
/// completion that delivers nothing, so the stage can still end.
pub struct Resolve<U> {
    stage: Option<Arc<Mutex<MapAsyncState<U>>>>,
}

impl<U> Resolve<U> {
    /// Deliver the transformed element
    pub fn resolve(mut self, value: U) {
        if let Some(stage) = self.stage.take() {
            settle(&stage, Settled::Value(value));
        }
    }

    /// Report a failure. The stage starts no further transforms and ends
    /// with `error` once in-flight transforms drain.
    pub fn reject(mut self, error: StreamError) {
        if let Some(stage) = self.stage.take() {
            settle(&stage, Settled::Error(error));
        }
    }
}

impl<U> Drop for Resolve<U> {
    fn drop(&mut self) {
        if let Some(stage) = self.stage.take() {
            log::debug!("map_async transform dropped its resolver without a value");
            settle(&stage, Settled::Nothing);
        }
    }
}

pub trait AsyncStreamExt<T>: Sized {
    /// Transform each element asynchronously; `transform` receives the
    /// element and a [`Resolve`] handle to call when done.
    fn map_async<U, F>(self, transform: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T, Resolve<U>) + Send + Sync + 'static;

    /// Run one fallible operation per element under `policy` and emit each
    /// outcome. The operation is re-invoked for retries with the same
    /// element.
    fn map_async_with_retry<U, E, Op>(
        self,
        policy: RetryPolicy,
        operation: Op,
    ) -> Stream<Result<U, RetryError<E>>>
    where
        T: Sync,
        U: Send + 'static,
        E: Send + 'static,
        Op: Fn(&T, Attempt<U, E>) + Send + Sync + 'static;
}

impl<T: Send + 'static> AsyncStreamExt<T> for Stream<T> {
    fn map_async<U, F>(self, transform: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T, Resolve<U>) + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        self.lift(move |downstream| MapAsyncSink {
            stage: Arc::new(Mutex::new(MapAsyncState {
                downstream: Some(downstream),
                pending: 0,
                upstream_ended: false,
                halted: false,
                error: None,
            })),
            transform: Arc::clone(&transform),
        })
    }

    fn map_async_with_retry<U, E, Op>(
        self,
        policy: RetryPolicy,
        operation: Op,
    ) -> Stream<Result<U, RetryError<E>>>
    where
        T: Sync,
        U: Send + 'static,
        E: Send + 'static,
        Op: Fn(&T, Attempt<U, E>) + Send + Sync + 'static,
    {
        let operation = Arc::new(operation);
        self.map_async(move |item: T, resolve: Resolve<Result<U, RetryError<E>>>| {
            let item = Arc::new(item);
            let operation = Arc::clone(&operation);
            with_retry_timeout(
                &policy,
                move |attempt| operation(item.as_ref(), attempt),
                move |outcome| resolve.resolve(outcome),
            );
        })
    }
}

struct MapAsyncState<U> {
    downstream: Option<BoxSink<U>>,
    pending: usize,
    upstream_ended: bool,
    halted: bool,
    error: Option<StreamError>,
}

impl<U> MapAsyncState<U> {
    /// Take the downstream sink if the stage is complete
    fn take_if_done(&mut self) -> Option<(BoxSink<U>, StreamResult<()>)> {
        if !self.upstream_ended || self.pending > 0 {
            return None;
        }
        let downstream = self.downstream.take()?;
        let outcome = match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        Some((downstream, outcome))
    }
}

enum Settled<U> {
    Value(U),
    Error(StreamError),
    Nothing,
}

fn settle<U>(stage: &Mutex<MapAsyncState<U>>, settled: Settled<U>) {
    let done = {
        let mut state = stage.lock();
        state.pending = state.pending.saturating_sub(1);
        match settled {
            Settled::Value(value) if !state.halted => {
                // emission is serialized by the stage lock
                if let Some(downstream) = state.downstream.as_mut() {
                    if downstream.emit(value).is_stop() {
                        state.halted = true;
                    }
                }
            }
            Settled::Value(_) => {
                log::debug!("discarding map_async result that resolved after downstream stopped");
            }
            Settled::Error(err) => {
                state.halted = true;
                state.error.get_or_insert(err);
            }
            Settled::Nothing => {}
        }
        state.take_if_done()
    };
    if let Some((downstream, outcome)) = done {
        downstream.end(outcome);
    }
}

struct MapAsyncSink<U, F> {
    stage: Arc<Mutex<MapAsyncState<U>>>,
    transform: Arc<F>,
}

impl<T, U, F> Sink<T> for MapAsyncSink<U, F>
where
    U: Send + 'static,
    F: Fn(T, Resolve<U>) + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        {
            let mut state = self.stage.lock();
            if state.halted {
                return Flow::Stop;
            }
            state.pending += 1;
        }
        (self.transform)(
            item,
            Resolve {
                stage: Some(Arc::clone(&self.stage)),
            },
        );
        // a transform that resolved synchronously may already have halted us
        Flow::from(!self.stage.lock().halted)
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let done = {
            let mut state = self.stage.lock();
            state.upstream_ended = true;
            if let Err(err) = outcome {
                state.error.get_or_insert(err);
            }
            state.take_if_done()
        };
        if let Some((downstream, outcome)) = done {
            downstream.end(outcome);
        }
    }
}
