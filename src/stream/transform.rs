//! Element-wise combinators: map, filter, reject, filter_map, inspect, flatten
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::core::{BoxSink, Flow, Sink, Stream};
use crate::error::StreamResult;

/// Element that may hold a sequence of inner elements
pub trait Nested {
    type Item;
    fn unnest(self) -> Unnested<Self::Item>;
}

/// Result of [`Nested::unnest`]
pub enum Unnested<I> {
    /// A sequence; every element is emitted on its own
    Many(Vec<I>),
    /// Not a sequence; passed through unchanged
    One(I),
}

impl<I> Nested for Vec<I> {
    type Item = I;

    fn unnest(self) -> Unnested<I> {
        Unnested::Many(self)
    }
}

impl Nested for Value {
    type Item = Value;

    fn unnest(self) -> Unnested<Value> {
        match self {
            Value::Array(items) => Unnested::Many(items),
            other => Unnested::One(other),
        }
    }
}

pub trait TransformStreamExt<T>: Sized {
    /// Apply `f` to each element
    fn map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static;

    /// Keep elements for which `predicate` holds
    fn filter<P>(self, predicate: P) -> Stream<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static;

    /// Alias of [`TransformStreamExt::filter`]
    fn select<P>(self, predicate: P) -> Stream<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter(predicate)
    }

    /// Drop elements for which `predicate` holds
    fn reject<P>(self, predicate: P) -> Stream<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static;

    fn filter_map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Option<U> + Send + Sync + 'static;

    /// Observe each element without changing it
    fn inspect<F>(self, f: F) -> Stream<T>
    where
        F: Fn(&T) + Send + Sync + 'static;

    /// Emit the inner elements of every sequence element, in order.
    /// Elements that are not sequences pass through.
    fn flatten(self) -> Stream<<T as Nested>::Item>
    where
        T: Nested,
        <T as Nested>::Item: Send + 'static;
}

impl<T: Send + 'static> TransformStreamExt<T> for Stream<T> {
    fn map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move |downstream| MapSink {
            downstream,
            f: Arc::clone(&f),
        })
    }

    fn filter<P>(self, predicate: P) -> Stream<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.lift(move |downstream| FilterSink {
            downstream,
            predicate: Arc::clone(&predicate),
            keep: true,
        })
    }

    fn reject<P>(self, predicate: P) -> Stream<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.lift(move |downstream| FilterSink {
            downstream,
            predicate: Arc::clone(&predicate),
            keep: false,
        })
    }

    fn filter_map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Option<U> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move |downstream| FilterMapSink {
            downstream,
            f: Arc::clone(&f),
        })
    }

    fn inspect<F>(self, f: F) -> Stream<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.map(move |item| {
            f(&item);
            item
        })
    }

    fn flatten(self) -> Stream<<T as Nested>::Item>
    where
        T: Nested,
        <T as Nested>::Item: Send + 'static,
    {
        self.lift(|downstream| FlattenSink {
            downstream,
            _outer: PhantomData,
        })
    }
}

struct MapSink<U, F> {
    downstream: BoxSink<U>,
    f: Arc<F>,
}

impl<T, U, F> Sink<T> for MapSink<U, F>
where
    F: Fn(T) -> U + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        self.downstream.emit((self.f)(item))
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}

struct FilterSink<T, P> {
    downstream: BoxSink<T>,
    predicate: Arc<P>,
    keep: bool,
}

impl<T, P> Sink<T> for FilterSink<T, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        if (self.predicate)(&item) == self.keep {
            self.downstream.emit(item)
        } else {
            Flow::Continue
        }
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}

struct FilterMapSink<U, F> {
    downstream: BoxSink<U>,
    f: Arc<F>,
}

impl<T, U, F> Sink<T> for FilterMapSink<U, F>
where
    F: Fn(T) -> Option<U> + Send + Sync,
{
    fn emit(&mut self, item: T) -> Flow {
        match (self.f)(item) {
            Some(mapped) => self.downstream.emit(mapped),
            None => Flow::Continue,
        }
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}

struct FlattenSink<T: Nested> {
    downstream: BoxSink<T::Item>,
    _outer: PhantomData<fn(T)>,
}

impl<T: Nested> Sink<T> for FlattenSink<T> {
    fn emit(&mut self, item: T) -> Flow {
        match item.unnest() {
            Unnested::Many(items) => {
                for inner in items {
                    if self.downstream.emit(inner).is_stop() {
                        return Flow::Stop;
                    }
                }
                Flow::Continue
            }
            Unnested::One(single) => self.downstream.emit(single),
        }
    }

    fn end(self: Box<Self>, outcome: StreamResult<()>) {
        self.downstream.end(outcome)
    }
}
