//! Message framing over raw duplex byte channels.
//!
//! Turns an unstructured byte stream into discrete JSON messages and back.
//! [`codec`] holds the wire format and the incremental decoder;
//! [`channel`] binds them to tokio readers and writers and to [`Stream`].
//!
//! [`Stream`]: crate::stream::Stream

pub mod channel;
pub mod codec;
pub mod frame_errors;

pub use channel::{message_source, FramedChannel, FramedReader, FramedWriter};
pub use codec::{decode_payload, encode_frame, frame_payload, FrameDecoder, END_BYTE, START_BYTE};
pub use frame_errors::FramingError;
