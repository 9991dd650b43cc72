//! Windowing combinators: limit/head/first, skip, last and tail
use std::collections::VecDeque;

use super::core::{BoxSink, Flow, Sink, Stream};
use crate::error::StreamResult;

pub trait WindowStreamExt<T>: Sized {
    /// Deliver at most `count` elements, then ask upstream to stop.
    fn limit(self, count: usize) -> Stream<T>;

    /// Alias of [`WindowStreamExt::limit`]
    fn head(self, count: usize) -> Stream<T> {
        self.limit(count)
    }

    fn first(self) -> Stream<T> {
        self.limit(1)
    }

    /// Discard the first `count` elements
    fn skip(self, count: usize) -> Stream<T>;

    /// Only the final element, emitted at end
    fn last(self) -> Stream<T>;

    /// Only the final `count` elements, emitted in order at end
    fn tail(self, count: usize) -> Stream<T>;
}

impl<T: Send + 'static> WindowStreamExt<T> for Stream<T> {
    fn limit(self, count: usize) -> Stream<T> {
        self.lift(move |downstream| LimitSink {
            downstream,
            remaining: count,
        })
    }

    fn skip(self, count: usize) -> Stream<T> {
        self.lift(move |downstream| SkipSink {
            downstream,
            remaining: count,
        })
    }

    fn last(self) -> Stream<T> {
        self.tail(1)
    }

    fn tail(self, count: usize) -> Stream<T> {
        self.lift(move |downstream| TailSink {
            downstream,
            size: count,
            window: VecDeque::with_capacity(count.min(1024)),
        })
    }
}

struct LimitSink<T> {
    downstream: BoxSink<T>,
    remaining: usize,
}

impl<T> Sink<T> for LimitSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        if self.remaining == 0 {
            return Flow::Stop;
        }
        self.remaining -= 1;
        let flow = self.downstream.emit(item);
        if self.remaining == 0 {
            Flow::Stop
        } else {
            flow
        }
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}

struct SkipSink<T> {
    downstream: BoxSink<T>,
    remaining: usize,
}

impl<T> Sink<T> for SkipSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Flow::Continue;
        }
        self.downstream.emit(item)
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}

struct TailSink<T> {
    downstream: BoxSink<T>,
    size: usize,
    window: VecDeque<T>,
}

impl<T: Send> Sink<T> for TailSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        if self.size == 0 {
            return Flow::Continue;
        }
        if self.window.len() == self.size {
            self.window.pop_front();
        }
        self.window.push_back(item);
        Flow::Continue
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let TailSink {
            mut downstream,
            window,
            ..
        } = *self;
        if outcome.is_ok() {
            for item in window {
                if downstream.emit(item).is_stop() {
                    break;
                }
            }
        }
        downstream.end(outcome);
    }
}
