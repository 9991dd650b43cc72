//! Push-based lazy streams and their combinators
//!
//! [`core`] defines the sink/production contract and the [`Stream`] handle.
//! Every other module adds combinators as an extension trait implemented
//! for `Stream<T>`; bring them into scope through [`crate::prelude`].

pub mod core;
pub mod constructors;
pub mod transform;
pub mod aggregate;
pub mod window;
pub mod concat;
pub mod record;
pub mod text;
pub mod async_combinators;
pub mod rate;

// Re-export core types (`self::` so the path does not resolve to the `core` crate)
pub use self::core::{BoxSink, Flow, FnSink, Production, Sink, Stream};

// Re-export constructors
pub use constructors::{
    empty, from_futures, from_iter, from_vec, generate, integers, once, random, range, repeat,
};

// Re-export synchronous combinators
pub use transform::{Nested, TransformStreamExt, Unnested};
pub use aggregate::AggregateStreamExt;
pub use window::WindowStreamExt;
pub use concat::ConcatStreamExt;
pub use record::RecordStreamExt;
pub use text::{CsvDialect, JoinStreamExt, SplitStreamExt};

// Re-export async and rate limiting combinators
pub use async_combinators::{AsyncStreamExt, Resolve};
pub use rate::RateStreamExt;
