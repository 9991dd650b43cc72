//! Rate limiting combinators
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::core::{BoxSink, Flow, Sink, Stream};
use crate::error::StreamResult;
use crate::stream_configuration::ThrottleConfig;

// Extension trait
pub trait RateStreamExt<T>: Sized {
    /// Let at most `allowed_through` elements pass per `window`.
    ///
    /// Elements over the cap are queued in arrival order and released as
    /// later windows open. A normal end is deferred until the queue is
    /// drained; an upstream error discards the queue and ends at once.
    /// Consumption spawns a window timer, so it must happen inside a Tokio
    /// runtime.
    fn throttle(self, allowed_through: usize, window: Duration) -> Stream<T>;

    fn throttle_with(self, config: &ThrottleConfig) -> Stream<T> {
        self.throttle(config.allowed_through, config.window)
    }
}

impl<T: Send + 'static> RateStreamExt<T> for Stream<T> {
    fn throttle(self, allowed_through: usize, window: Duration) -> Stream<T> {
        assert!(allowed_through > 0, "throttle: allowed_through must be greater than zero");
        assert!(!window.is_zero(), "throttle: window must be greater than zero");
        self.lift(move |downstream| {
            let state = Arc::new(Mutex::new(ThrottleState {
                downstream: Some(downstream),
                queue: VecDeque::new(),
                allowed: allowed_through,
                remaining: allowed_through,
                upstream_ended: false,
                stopped: false,
                ticker: None,
            }));
            let ticker = tokio::spawn(run_windows(Arc::clone(&state), window));
            state.lock().ticker = Some(ticker);
            ThrottleSink { state }
        })
    }
}

struct ThrottleState<T> {
    downstream: Option<BoxSink<T>>,
    queue: VecDeque<T>,
    allowed: usize,
    // budget left in the current window
    remaining: usize,
    upstream_ended: bool,
    stopped: bool,
    ticker: Option<JoinHandle<()>>,
}

impl<T> ThrottleState<T> {
    fn deliver(&mut self, item: T) {
        self.remaining -= 1;
        if let Some(downstream) = self.downstream.as_mut() {
            if downstream.emit(item).is_stop() {
                self.stop();
            }
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
        if !self.queue.is_empty() {
            log::debug!("throttle discarding {} queued elements after stop", self.queue.len());
            self.queue.clear();
        }
    }

    fn drain(&mut self) {
        while self.remaining > 0 && !self.stopped {
            match self.queue.pop_front() {
                Some(item) => self.deliver(item),
                None => break,
            }
        }
    }

    /// Hand back the downstream sink once upstream ended and nothing is queued
    fn take_if_done(&mut self) -> Option<BoxSink<T>> {
        if !self.upstream_ended || !self.queue.is_empty() {
            return None;
        }
        let downstream = self.downstream.take()?;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        Some(downstream)
    }
}

async fn run_windows<T>(state: Arc<Mutex<ThrottleState<T>>>, window: Duration) {
    let mut windows = interval_at(Instant::now() + window, window);
    loop {
        windows.tick().await;
        let done = {
            let mut state = state.lock();
            if state.downstream.is_none() {
                break;
            }
            state.remaining = state.allowed;
            log::trace!("throttle window opened with {} queued", state.queue.len());
            state.drain();
            state.take_if_done()
        };
        if let Some(downstream) = done {
            downstream.end(Ok(()));
            break;
        }
    }
}

struct ThrottleSink<T> {
    state: Arc<Mutex<ThrottleState<T>>>,
}

impl<T: Send> Sink<T> for ThrottleSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        let mut state = self.state.lock();
        if state.stopped {
            return Flow::Stop;
        }
        if state.queue.is_empty() && state.remaining > 0 {
            state.deliver(item);
        } else {
            state.queue.push_back(item);
        }
        Flow::from(!state.stopped)
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        let done = {
            let mut state = self.state.lock();
            state.upstream_ended = true;
            if outcome.is_err() {
                state.queue.clear();
            }
            state.take_if_done()
        };
        if let Some(downstream) = done {
            downstream.end(outcome);
        }
    }
}

impl<T> Drop for ThrottleSink<T> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if !state.upstream_ended {
            // abandoned by upstream: nothing will ever end downstream
            if let Some(ticker) = state.ticker.take() {
                ticker.abort();
            }
        }
    }
}
