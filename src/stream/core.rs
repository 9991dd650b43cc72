//! Core push-stream contract: sinks, productions and the `Stream` handle.
//!
//! A [`Stream`] is a production procedure. Invoking it with a [`Sink`]
//! starts delivery: the producer calls [`Sink::emit`] zero or more times
//! and then [`Sink::end`] at most once. `end` consumes the sink, so the
//! "at most once, nothing after end" rule is enforced by ownership.
//!
//! Combinators never mutate a stream. They wrap its production with
//! [`Stream::extend`] (or the sink-level helper [`Stream::lift`]) and
//! return a new `Stream` value. Per-consumption state (buffers, counters)
//! lives in the sink a combinator builds for each run, so a pipeline over a
//! replayable source can be consumed again once the previous run ended.

use futures::channel::{mpsc, oneshot};
use futures::future;
use futures::stream::{self as futures_stream, BoxStream, StreamExt as _};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{StreamError, StreamResult};

/// Signal returned by a sink after each delivered element.
///
/// `Stop` is advisory: it asks the immediately upstream stage not to emit
/// again. It does not cancel work that is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        matches!(self, Flow::Stop)
    }

    pub fn is_continue(self) -> bool {
        matches!(self, Flow::Continue)
    }
}

impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}

/// Receiving end of a stream.
pub trait Sink<T>: Send {
    /// Deliver one element.
    fn emit(&mut self, item: T) -> Flow;

    /// Signal completion. `Ok(())` is normal exhaustion.
    fn end(self: Box<Self>, outcome: StreamResult<()>);
}

pub type BoxSink<T> = Box<dyn Sink<T>>;

/// The production procedure behind a stream
pub type Production<T> = Arc<dyn Fn(BoxSink<T>) + Send + Sync>;

/// Sink assembled from an emit closure and a completion closure
pub struct FnSink<E, D> {
    on_emit: E,
    on_end: D,
}

impl<E, D> FnSink<E, D> {
    pub fn new(on_emit: E, on_end: D) -> Self {
        Self { on_emit, on_end }
    }
}

impl<T, E, D> Sink<T> for FnSink<E, D>
where
    E: FnMut(T) -> Flow + Send,
    D: FnOnce(StreamResult<()>) + Send,
{
    fn emit(&mut self, item: T) -> Flow {
        (self.on_emit)(item)
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        (self.on_end)(outcome)
    }
}

/// A lazily evaluated, push-based stream of `T`.
pub struct Stream<T> {
    production: Production<T>,
    active: Arc<AtomicBool>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            production: Arc::clone(&self.production),
            active: Arc::clone(&self.active),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("active", &self.active.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Stream<T> {
    /// Create a stream from a production procedure
    pub fn new<P>(production: P) -> Self
    where
        P: Fn(BoxSink<T>) + Send + Sync + 'static,
    {
        Self::from_production(Arc::new(production))
    }

    pub fn from_production(production: Production<T>) -> Self {
        Self {
            production,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle to the production procedure, for composing streams
    pub fn production(&self) -> Production<T> {
        Arc::clone(&self.production)
    }

    /// Replace the production procedure with `transform(current)`.
    ///
    /// The returned stream is the same pipeline as far as the consumption
    /// guard is concerned.
    pub fn extend<U, F>(self, transform: F) -> Stream<U>
    where
        U: Send + 'static,
        F: FnOnce(Production<T>) -> Production<U>,
    {
        Stream {
            production: transform(self.production),
            active: self.active,
        }
    }

    /// Wrap every downstream sink with the sink built by `wrap`.
    ///
    /// `wrap` runs once per consumption, which is where a combinator
    /// allocates its per-run state.
    pub fn lift<U, S, W>(self, wrap: W) -> Stream<U>
    where
        U: Send + 'static,
        S: Sink<T> + 'static,
        W: Fn(BoxSink<U>) -> S + Send + Sync + 'static,
    {
        self.extend(move |upstream| {
            let production: Production<U> =
                Arc::new(move |downstream: BoxSink<U>| upstream(Box::new(wrap(downstream))));
            production
        })
    }

    /// Whether a consumption of this pipeline is currently in flight
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start production into `sink`.
    ///
    /// Fails with [`StreamError::AlreadyConsuming`] if a previous
    /// consumption has neither ended nor been abandoned; `sink` is dropped
    /// without being ended in that case.
    pub fn consume_with(&self, sink: BoxSink<T>) -> StreamResult<()> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::error!("stream consumed while a previous consumption is still active");
            return Err(StreamError::AlreadyConsuming);
        }

        let guarded = Guarded {
            inner: sink,
            guard: ActiveGuard(Arc::clone(&self.active)),
            stopped: false,
        };
        (self.production)(Box::new(guarded));
        Ok(())
    }

    /// Start production with an emit closure and a completion closure
    pub fn consume<E, D>(&self, on_emit: E, on_end: D) -> StreamResult<()>
    where
        E: FnMut(T) -> Flow + Send + 'static,
        D: FnOnce(StreamResult<()>) + Send + 'static,
    {
        self.consume_with(Box::new(FnSink::new(on_emit, on_end)))
    }

    /// Run `f` for every element, ignoring completion beyond logging errors
    pub fn each<F>(&self, mut f: F) -> StreamResult<()>
    where
        F: FnMut(T) + Send + 'static,
    {
        self.consume(
            move |item| {
                f(item);
                Flow::Continue
            },
            |outcome| {
                if let Err(err) = outcome {
                    log::warn!("stream ended with error: {}", err);
                }
            },
        )
    }

    /// Drive the stream to completion and gather every element.
    ///
    /// Never resolves for an unbounded stream that is not limited.
    pub async fn collect(&self) -> StreamResult<Vec<T>> {
        let (tx, rx) = oneshot::channel();
        self.consume_with(Box::new(CollectSink {
            items: Vec::new(),
            tx,
        }))?;
        rx.await.map_err(|_| StreamError::Cancelled)?
    }

    /// Bridge into a `futures::Stream`.
    ///
    /// Elements are buffered in an unbounded channel; dropping the returned
    /// stream signals `Stop` on the next emission. A failed completion
    /// arrives as a final `Err` item.
    pub fn into_futures_stream(self) -> BoxStream<'static, StreamResult<T>> {
        let (tx, rx) = mpsc::unbounded();
        match self.consume_with(Box::new(ChannelSink { tx })) {
            Ok(()) => rx.boxed(),
            Err(err) => futures_stream::once(future::ready(Err(err))).boxed(),
        }
    }
}

/// Clears the pipeline's activity flag when the consuming sink goes away
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Outermost sink of every consumption
struct Guarded<T> {
    inner: BoxSink<T>,
    guard: ActiveGuard,
    stopped: bool,
}

impl<T> Sink<T> for Guarded<T> {
    fn emit(&mut self, item: T) -> Flow {
        if self.stopped {
            log::debug!("dropping element emitted after the consumer stopped");
            return Flow::Stop;
        }
        let flow = self.inner.emit(item);
        if flow.is_stop() {
            self.stopped = true;
        }
        flow
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let Guarded { inner, guard, .. } = *self;
        // release first so the completion handler may consume the pipeline again
        drop(guard);
        inner.end(outcome);
    }
}

struct CollectSink<T> {
    items: Vec<T>,
    tx: oneshot::Sender<StreamResult<Vec<T>>>,
}

impl<T: Send> Sink<T> for CollectSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        self.items.push(item);
        Flow::Continue
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let CollectSink { items, tx } = *self;
        let _ = tx.send(outcome.map(|()| items));
    }
}

struct ChannelSink<T> {
    tx: mpsc::UnboundedSender<StreamResult<T>>,
}

impl<T: Send> Sink<T> for ChannelSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        Flow::from(self.tx.unbounded_send(Ok(item)).is_ok())
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        if let Err(err) = outcome {
            let _ = self.tx.unbounded_send(Err(err));
        }
    }
}
