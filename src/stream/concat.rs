//! Sequential concatenation: append and prepend.
//!
//! Stream `k + 1` is started from the completion of stream `k`, never
//! earlier, so ordering across streams is preserved by construction.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::core::{BoxSink, Flow, Production, Sink, Stream};
use crate::error::StreamResult;

pub trait ConcatStreamExt<T>: Sized {
    /// This stream, then each of `others` in order
    fn append<I>(self, others: I) -> Stream<T>
    where
        I: IntoIterator<Item = Stream<T>>;

    /// Each of `others` in order, then this stream
    fn prepend<I>(self, others: I) -> Stream<T>
    where
        I: IntoIterator<Item = Stream<T>>;
}

impl<T: Send + 'static> ConcatStreamExt<T> for Stream<T> {
    fn append<I>(self, others: I) -> Stream<T>
    where
        I: IntoIterator<Item = Stream<T>>,
    {
        let others: Vec<Production<T>> = others.into_iter().map(|s| s.production()).collect();
        self.extend(move |head| {
            let mut sequence = Vec::with_capacity(others.len() + 1);
            sequence.push(head);
            sequence.extend(others);
            concat(sequence)
        })
    }

    fn prepend<I>(self, others: I) -> Stream<T>
    where
        I: IntoIterator<Item = Stream<T>>,
    {
        let mut sequence: Vec<Production<T>> = others.into_iter().map(|s| s.production()).collect();
        self.extend(move |tail| {
            sequence.push(tail);
            concat(sequence)
        })
    }
}

fn concat<T: Send + 'static>(sequence: Vec<Production<T>>) -> Production<T> {
    let sequence = Arc::new(sequence);
    Arc::new(move |downstream: BoxSink<T>| {
        let queue: VecDeque<Production<T>> = sequence.iter().cloned().collect();
        run_sequence(downstream, queue);
    })
}

/// Hand-off between a running production and the loop that started it.
///
/// A source that ends synchronously parks the downstream here instead of
/// starting the next production from inside its own `end`, so stack depth
/// stays flat however many streams are chained.
struct Handoff<T> {
    in_production: bool,
    parked: Option<(BoxSink<T>, VecDeque<Production<T>>)>,
}

fn run_sequence<T: Send + 'static>(mut downstream: BoxSink<T>, mut queue: VecDeque<Production<T>>) {
    loop {
        let next = match queue.pop_front() {
            Some(next) => next,
            None => return downstream.end(Ok(())),
        };
        let handoff = Arc::new(Mutex::new(Handoff {
            in_production: true,
            parked: None,
        }));
        next(Box::new(ConcatSink {
            downstream,
            queue,
            stopped: false,
            handoff: Arc::clone(&handoff),
        }));

        let mut state = handoff.lock();
        state.in_production = false;
        match state.parked.take() {
            Some((parked_downstream, parked_queue)) => {
                downstream = parked_downstream;
                queue = parked_queue;
            }
            // still running asynchronously; its end resumes the sequence
            None => return,
        }
    }
}

struct ConcatSink<T> {
    downstream: BoxSink<T>,
    queue: VecDeque<Production<T>>,
    stopped: bool,
    handoff: Arc<Mutex<Handoff<T>>>,
}

impl<T: Send + 'static> Sink<T> for ConcatSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        if self.stopped {
            return Flow::Stop;
        }
        let flow = self.downstream.emit(item);
        if flow.is_stop() {
            self.stopped = true;
        }
        flow
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let ConcatSink {
            downstream,
            queue,
            stopped,
            handoff,
        } = *self;
        match outcome {
            Err(err) => downstream.end(Err(err)),
            Ok(()) if stopped => downstream.end(Ok(())),
            Ok(()) => {
                let mut state = handoff.lock();
                if state.in_production {
                    state.parked = Some((downstream, queue));
                } else {
                    drop(state);
                    run_sequence(downstream, queue);
                }
            }
        }
    }
}
