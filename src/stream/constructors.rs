//! Stream sources.
//!
//! Replayable sources (`from_iter`, `range`, `integers`, ...) push
//! synchronously in a loop until the sink answers `Stop` or the bound is
//! reached, then end. `from_futures` is single-pass and runs on tokio.

use futures::stream::StreamExt as _;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;

use super::core::{BoxSink, Flow, Stream};
use crate::error::StreamError;

/// A stream that ends immediately
pub fn empty<T: Send + 'static>() -> Stream<T> {
    Stream::new(|sink: BoxSink<T>| sink.end(Ok(())))
}

/// Emit a single element
pub fn once<T>(item: T) -> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    Stream::new(move |mut sink: BoxSink<T>| {
        sink.emit(item.clone());
        sink.end(Ok(()));
    })
}

/// Emit every element of a collection, in order.
///
/// The elements are kept for replay, so each consumption clones them.
pub fn from_iter<I, T>(items: I) -> Stream<T>
where
    I: IntoIterator<Item = T>,
    T: Clone + Send + Sync + 'static,
{
    from_vec(items.into_iter().collect())
}

pub fn from_vec<T>(items: Vec<T>) -> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    let items = Arc::new(items);
    Stream::new(move |mut sink: BoxSink<T>| {
        for item in items.iter() {
            if sink.emit(item.clone()).is_stop() {
                break;
            }
        }
        sink.end(Ok(()));
    })
}

/// Count from `min` to `max` inclusive by `step`.
///
/// A negative step counts down; a zero step produces nothing.
pub fn range(min: i64, max: i64, step: i64) -> Stream<i64> {
    Stream::new(move |mut sink: BoxSink<i64>| {
        if step == 0 {
            log::warn!("range({}, {}, 0) has no step; emitting nothing", min, max);
            sink.end(Ok(()));
            return;
        }
        let mut current = Some(min);
        while let Some(value) = current {
            let in_bounds = if step > 0 { value <= max } else { value >= max };
            if !in_bounds || sink.emit(value).is_stop() {
                break;
            }
            current = value.checked_add(step);
        }
        sink.end(Ok(()));
    })
}

/// `seed`, `seed + step`, `seed + 2 * step`, ... until the consumer stops.
///
/// Ends normally if the next value would overflow.
pub fn integers(seed: i64, step: i64) -> Stream<i64> {
    Stream::new(move |mut sink: BoxSink<i64>| {
        let mut current = Some(seed);
        while let Some(value) = current {
            if sink.emit(value).is_stop() {
                break;
            }
            current = value.checked_add(step);
        }
        sink.end(Ok(()));
    })
}

/// Repeat a value until the consumer stops
pub fn repeat<T>(item: T) -> Stream<T>
where
    T: Clone + Send + Sync + 'static,
{
    generate(move || item.clone())
}

/// Emit `f()` until the consumer stops
pub fn generate<T, F>(f: F) -> Stream<T>
where
    T: Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Stream::new(move |mut sink: BoxSink<T>| {
        while sink.emit(f()).is_continue() {}
        sink.end(Ok(()));
    })
}

/// Uniformly distributed integers in `min..=max` until the consumer stops
pub fn random(min: i64, max: i64) -> Stream<i64> {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    generate(move || rand::thread_rng().gen_range(low..=high))
}

/// Push the items of a `futures::Stream`.
///
/// Single-pass: the inner stream is handed to the first consumption and a
/// second consumption ends with [`StreamError::SourceExhausted`]. Must be
/// consumed inside a Tokio runtime.
pub fn from_futures<S>(source: S) -> Stream<S::Item>
where
    S: futures::Stream + Send + Unpin + 'static,
    S::Item: Send + 'static,
{
    let source = Arc::new(Mutex::new(Some(source)));
    Stream::new(move |mut sink: BoxSink<S::Item>| {
        let Some(mut source) = source.lock().take() else {
            sink.end(Err(StreamError::SourceExhausted));
            return;
        };
        tokio::spawn(async move {
            while let Some(item) = source.next().await {
                if sink.emit(item) == Flow::Stop {
                    break;
                }
            }
            sink.end(Ok(()));
        });
    })
}
