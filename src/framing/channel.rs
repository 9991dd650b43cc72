//! Framed message channels over tokio byte streams
use futures::StreamExt as _;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use super::codec::{decode_payload, encode_frame, FrameDecoder};
use super::frame_errors::FramingError;
use crate::error::{StreamError, StreamResult};
use crate::stream::{BoxSink, Stream};
use crate::stream_configuration::FramingConfig;

/// Receiving half: reassembles frames from an `AsyncRead`
pub struct FramedReader<R> {
    reader: R,
    decoder: FrameDecoder,
    ready: VecDeque<Result<Vec<u8>, FramingError>>,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, &FramingConfig::default())
    }

    pub fn with_config(reader: R, config: &FramingConfig) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::new(config),
            ready: VecDeque::new(),
            chunk: vec![0; config.read_chunk_size.max(1)],
        }
    }

    /// Next frame payload, `None` at end of input.
    ///
    /// A malformed frame yields `Some(Err(..))` and the following call
    /// continues with the next frame. A read failure yields
    /// [`FramingError::Io`].
    pub async fn read_payload(&mut self) -> Option<Result<Vec<u8>, FramingError>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Some(frame);
            }
            let read = match self.reader.read(&mut self.chunk).await {
                Ok(read) => read,
                Err(err) => return Some(Err(err.into())),
            };
            if read == 0 {
                if self.decoder.has_partial() {
                    log::warn!("framed channel closed in the middle of a frame");
                    self.decoder.reset();
                }
                return None;
            }
            self.ready.extend(self.decoder.push(&self.chunk[..read]));
        }
    }

    /// Next decoded message, `None` at end of input
    pub async fn recv<M: DeserializeOwned>(&mut self) -> Option<Result<M, FramingError>> {
        let frame = self.read_payload().await?;
        Some(frame.and_then(|payload| decode_payload(&payload)))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Sending half: writes one frame per message
pub struct FramedWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encode and write `message` as a single frame
    pub async fn send<M: Serialize + ?Sized>(&mut self, message: &M) -> Result<(), FramingError> {
        let frame = encode_frame(message)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send every element of `messages`, returning how many were written.
    ///
    /// Stops at the first write failure or upstream error.
    pub async fn send_all<M>(&mut self, messages: Stream<M>) -> StreamResult<usize>
    where
        M: Serialize + Send + 'static,
    {
        let mut messages = messages.into_futures_stream();
        let mut sent = 0;
        while let Some(message) = messages.next().await {
            self.send(&message?).await?;
            sent += 1;
        }
        Ok(sent)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Both directions of one duplex byte channel.
///
/// Each direction keeps its own reassembly buffer.
pub struct FramedChannel<T> {
    reader: FramedReader<ReadHalf<T>>,
    writer: FramedWriter<WriteHalf<T>>,
}

impl<T: AsyncRead + AsyncWrite> FramedChannel<T> {
    pub fn new(io: T) -> Self {
        Self::with_config(io, &FramingConfig::default())
    }

    pub fn with_config(io: T, config: &FramingConfig) -> Self {
        let (read_half, write_half) = io::split(io);
        Self {
            reader: FramedReader::with_config(read_half, config),
            writer: FramedWriter::new(write_half),
        }
    }

    pub async fn send<M: Serialize + ?Sized>(&mut self, message: &M) -> Result<(), FramingError> {
        self.writer.send(message).await
    }

    pub async fn recv<M: DeserializeOwned>(&mut self) -> Option<Result<M, FramingError>> {
        self.reader.recv().await
    }

    pub fn into_split(self) -> (FramedReader<ReadHalf<T>>, FramedWriter<WriteHalf<T>>) {
        (self.reader, self.writer)
    }
}

/// Feed the messages arriving on `reader` into a stream.
///
/// Malformed frames are delivered as `Err` elements and the stream carries
/// on. End of input ends the stream normally; a read failure ends it with
/// [`StreamError::IO`]. Single-pass: a second consumption ends with
/// [`StreamError::SourceExhausted`]. Must be consumed inside a Tokio
/// runtime.
pub fn message_source<M, R>(reader: FramedReader<R>) -> Stream<Result<M, FramingError>>
where
    M: DeserializeOwned + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    let reader = Arc::new(Mutex::new(Some(reader)));
    Stream::new(move |mut sink: BoxSink<Result<M, FramingError>>| {
        let Some(mut reader) = reader.lock().take() else {
            sink.end(Err(StreamError::SourceExhausted));
            return;
        };
        tokio::spawn(async move {
            let outcome = loop {
                match reader.recv::<M>().await {
                    None => break Ok(()),
                    Some(Err(FramingError::Io(err))) => break Err(StreamError::IO(err)),
                    Some(message) => {
                        if let Err(err) = &message {
                            log::warn!("malformed frame: {}", err);
                        }
                        if sink.emit(message).is_stop() {
                            break Ok(());
                        }
                    }
                }
            };
            sink.end(outcome);
        });
    })
}
