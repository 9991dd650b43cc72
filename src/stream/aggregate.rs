//! Buffering combinators: reduce/fold (both directions), scan (both
//! directions), compress, count and partition.
//!
//! Left-to-right variants keep a running accumulator. Right-to-left
//! variants cannot be computed incrementally, so they compress the upstream
//! into one `Vec` first and fold from the tail.
//!
//! On an upstream error every buffer is discarded and the error is
//! forwarded without a final emission.

use std::sync::Arc;

use super::core::{BoxSink, Flow, Sink, Stream};
use super::transform::TransformStreamExt;
use crate::error::StreamResult;

pub trait AggregateStreamExt<T>: Sized {
    /// Combine all elements with `f`, the first element seeding the
    /// accumulator. Emits one value at end, or nothing for an empty stream.
    fn reduce<F>(self, f: F) -> Stream<T>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static;

    /// Combine all elements into `init` with `f`. Always emits one value at end.
    fn fold<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static;

    /// [`AggregateStreamExt::reduce`] from the last element to the first
    fn reduce_right<F>(self, f: F) -> Stream<T>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static;

    /// [`AggregateStreamExt::fold`] from the last element to the first
    fn fold_right<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static;

    /// Emit the seed, then the accumulator after every element.
    /// The seed is emitted when the first element arrives.
    fn scan<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static;

    /// Like [`AggregateStreamExt::scan`], seeded by the first element
    fn scan_reduce<F>(self, f: F) -> Stream<T>
    where
        T: Clone,
        F: Fn(T, T) -> T + Send + Sync + 'static;

    fn scan_right<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static;

    fn scan_right_reduce<F>(self, f: F) -> Stream<T>
    where
        T: Clone,
        F: Fn(T, T) -> T + Send + Sync + 'static;

    /// Materialize the whole upstream into one `Vec`, emitted at end
    fn compress(self) -> Stream<Vec<T>>;

    /// Number of elements, emitted at end
    fn count(self) -> Stream<usize>;

    /// Group consecutive elements into batches of `size`; a shorter final
    /// batch is flushed at end unless downstream already stopped.
    ///
    /// # Panics
    /// If `size` is zero.
    fn partition(self, size: usize) -> Stream<Vec<T>>;
}

impl<T: Send + 'static> AggregateStreamExt<T> for Stream<T> {
    fn reduce<F>(self, f: F) -> Stream<T>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move |downstream| ReduceSink {
            downstream,
            acc: None,
            f: Arc::clone(&f),
        })
    }

    fn fold<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move |downstream| FoldSink {
            downstream,
            acc: Some(init.clone()),
            f: Arc::clone(&f),
        })
    }

    fn reduce_right<F>(self, f: F) -> Stream<T>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.compress()
            .filter_map(move |items| items.into_iter().rev().reduce(|acc, item| f(acc, item)))
    }

    fn fold_right<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        self.compress()
            .map(move |items| items.into_iter().rev().fold(init.clone(), |acc, item| f(acc, item)))
    }

    fn scan<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move |downstream| ScanSink {
            downstream,
            acc: Some(init.clone()),
            seed_pending: true,
            f: Arc::clone(&f),
        })
    }

    fn scan_reduce<F>(self, f: F) -> Stream<T>
    where
        T: Clone,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move |downstream| ScanReduceSink {
            downstream,
            acc: None,
            f: Arc::clone(&f),
        })
    }

    fn scan_right<A, F>(self, init: A, f: F) -> Stream<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        self.compress()
            .map(move |items| {
                if items.is_empty() {
                    return Vec::new();
                }
                let mut steps = Vec::with_capacity(items.len() + 1);
                let mut acc = init.clone();
                steps.push(acc.clone());
                for item in items.into_iter().rev() {
                    acc = f(acc, item);
                    steps.push(acc.clone());
                }
                steps
            })
            .flatten()
    }

    fn scan_right_reduce<F>(self, f: F) -> Stream<T>
    where
        T: Clone,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.compress()
            .map(move |items| {
                let mut steps: Vec<T> = Vec::with_capacity(items.len());
                for item in items.into_iter().rev() {
                    let next = match steps.last() {
                        Some(acc) => f(acc.clone(), item),
                        None => item,
                    };
                    steps.push(next);
                }
                steps
            })
            .flatten()
    }

    fn compress(self) -> Stream<Vec<T>> {
        self.lift(|downstream| CompressSink {
            downstream,
            items: Vec::new(),
        })
    }

    fn count(self) -> Stream<usize> {
        self.lift(|downstream| CountSink {
            downstream,
            count: 0,
        })
    }

    fn partition(self, size: usize) -> Stream<Vec<T>> {
        assert!(size > 0, "partition: size must be greater than zero");
        self.lift(move |downstream| PartitionSink {
            downstream,
            size,
            batch: Vec::with_capacity(size),
            stopped: false,
        })
    }
}

struct ReduceSink<T, F> {
    downstream: BoxSink<T>,
    acc: Option<T>,
    f: Arc<F>,
}

impl<T, F> Sink<T> for ReduceSink<T, F>
where
    T: Send,
    F: Fn(T, T) -> T + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        let next = match self.acc.take() {
            Some(acc) => (self.f)(acc, item),
            None => item,
        };
        self.acc = Some(next);
        Flow::Continue
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let ReduceSink {
            mut downstream,
            acc,
            ..
        } = *self;
        if outcome.is_ok() {
            if let Some(acc) = acc {
                downstream.emit(acc);
            }
        }
        downstream.end(outcome);
    }
}

struct FoldSink<A, F> {
    downstream: BoxSink<A>,
    acc: Option<A>,
    f: Arc<F>,
}

impl<T, A, F> Sink<T> for FoldSink<A, F>
where
    A: Send,
    F: Fn(A, T) -> A + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        if let Some(acc) = self.acc.take() {
            self.acc = Some((self.f)(acc, item));
        }
        Flow::Continue
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let FoldSink {
            mut downstream,
            acc,
            ..
        } = *self;
        if outcome.is_ok() {
            if let Some(acc) = acc {
                downstream.emit(acc);
            }
        }
        downstream.end(outcome);
    }
}

struct ScanSink<A, F> {
    downstream: BoxSink<A>,
    acc: Option<A>,
    seed_pending: bool,
    f: Arc<F>,
}

impl<T, A, F> Sink<T> for ScanSink<A, F>
where
    A: Clone + Send,
    F: Fn(A, T) -> A + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        let Some(acc) = self.acc.take() else {
            return Flow::Stop;
        };
        if self.seed_pending {
            self.seed_pending = false;
            if self.downstream.emit(acc.clone()).is_stop() {
                return Flow::Stop;
            }
        }
        let next = (self.f)(acc, item);
        self.acc = Some(next.clone());
        self.downstream.emit(next)
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}

struct ScanReduceSink<T, F> {
    downstream: BoxSink<T>,
    acc: Option<T>,
    f: Arc<F>,
}

impl<T, F> Sink<T> for ScanReduceSink<T, F>
where
    T: Clone + Send,
    F: Fn(T, T) -> T + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        let next = match self.acc.take() {
            Some(acc) => (self.f)(acc, item),
            None => item,
        };
        self.acc = Some(next.clone());
        self.downstream.emit(next)
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}

struct CompressSink<T> {
    downstream: BoxSink<Vec<T>>,
    items: Vec<T>,
}

impl<T: Send> Sink<T> for CompressSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        self.items.push(item);
        Flow::Continue
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let CompressSink {
            mut downstream,
            items,
        } = *self;
        if outcome.is_ok() {
            downstream.emit(items);
        }
        downstream.end(outcome);
    }
}

struct CountSink {
    downstream: BoxSink<usize>,
    count: usize,
}

impl<T> Sink<T> for CountSink {
    fn emit(&mut self, _item: T) -> Flow {
        self.count += 1;
        Flow::Continue
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let CountSink {
            mut downstream,
            count,
        } = *self;
        if outcome.is_ok() {
            downstream.emit(count);
        }
        downstream.end(outcome);
    }
}

struct PartitionSink<T> {
    downstream: BoxSink<Vec<T>>,
    size: usize,
    batch: Vec<T>,
    stopped: bool,
}

impl<T: Send> Sink<T> for PartitionSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        if self.stopped {
            return Flow::Stop;
        }
        self.batch.push(item);
        if self.batch.len() < self.size {
            return Flow::Continue;
        }
        let full = std::mem::replace(&mut self.batch, Vec::with_capacity(self.size));
        if self.downstream.emit(full).is_stop() {
            self.stopped = true;
            return Flow::Stop;
        }
        Flow::Continue
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let PartitionSink {
            mut downstream,
            batch,
            stopped,
            ..
        } = *self;
        if outcome.is_ok() && !stopped && !batch.is_empty() {
            downstream.emit(batch);
        }
        downstream.end(outcome);
    }
}
