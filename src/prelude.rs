//! `use pushflow::prelude::*;` brings every combinator trait into scope

pub use crate::error::{RetryError, StreamError, StreamResult};
pub use crate::retry::{retry_timeout, with_retry_timeout, Attempt};
pub use crate::stream::constructors::*;
pub use crate::stream::{
    AggregateStreamExt, AsyncStreamExt, BoxSink, ConcatStreamExt, CsvDialect, Flow, FnSink,
    JoinStreamExt, RateStreamExt, RecordStreamExt, Resolve, Sink, SplitStreamExt, Stream,
    TransformStreamExt, WindowStreamExt,
};
pub use crate::stream_configuration::{FramingConfig, RetryPolicy, ThrottleConfig};
