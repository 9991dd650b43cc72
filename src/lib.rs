pub mod error;
pub mod stream;
pub mod retry;
pub mod framing;

pub mod stream_configuration;
pub mod prelude;

// Re-export the everyday surface at the crate root
pub use error::{RetryError, StreamError, StreamResult};
pub use stream::{Flow, Sink, Stream};
pub use retry::{retry_timeout, with_retry_timeout, Attempt};
pub use stream_configuration::{FramingConfig, RetryPolicy, ThrottleConfig};
