//! Sentinel-delimited wire format.
//!
//! Each message travels as `START_BYTE || payload || END_BYTE` where the
//! payload is the UTF-8 JSON text of the message. There is no length
//! prefix and no checksum. Neither sentinel can occur inside a JSON text:
//! `0xFF` is never valid UTF-8 and `0x00` is always escaped by the
//! serializer.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::frame_errors::FramingError;
use crate::stream_configuration::FramingConfig;

pub const START_BYTE: u8 = 0x00;
pub const END_BYTE: u8 = 0xFF;

/// Wrap raw payload bytes in sentinels.
///
/// Fails with [`FramingError::ReservedByte`] if the payload contains a
/// sentinel, since the receiver would split the frame there.
pub fn frame_payload(payload: &[u8]) -> Result<Vec<u8>, FramingError> {
    if let Some(offset) = payload.iter().position(|b| *b == START_BYTE || *b == END_BYTE) {
        return Err(FramingError::ReservedByte {
            byte: payload[offset],
            offset,
        });
    }
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.push(START_BYTE);
    frame.extend_from_slice(payload);
    frame.push(END_BYTE);
    Ok(frame)
}

/// Serialize `message` and frame it, ready for a single write
pub fn encode_frame<M: Serialize + ?Sized>(message: &M) -> Result<Vec<u8>, FramingError> {
    let payload = serde_json::to_vec(message).map_err(|e| FramingError::Encode(e.to_string()))?;
    frame_payload(&payload)
}

/// Decode the payload of one frame (sentinels already stripped)
pub fn decode_payload<M: DeserializeOwned>(payload: &[u8]) -> Result<M, FramingError> {
    if payload.is_empty() {
        return Err(FramingError::EmptyFrame);
    }
    let text = std::str::from_utf8(payload)?;
    serde_json::from_str(text).map_err(|e| FramingError::Decode(e.to_string()))
}

/// Incremental reassembly of frames from arbitrarily split chunks.
///
/// One decoder per channel direction. Bytes are accumulated until an end
/// sentinel completes the frame. A start sentinel discards whatever was
/// buffered and opens a new frame, so a truncated frame never leaks into
/// the next one.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    partial: Vec<u8>,
    overflowed: bool,
    max_frame_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(&FramingConfig::default())
    }
}

impl FrameDecoder {
    pub fn new(config: &FramingConfig) -> Self {
        Self {
            partial: Vec::new(),
            overflowed: false,
            max_frame_len: config.max_frame_len,
        }
    }

    /// Feed one chunk; returns the payload (or error) of every frame the
    /// chunk completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Vec<u8>, FramingError>> {
        let mut frames = Vec::new();
        let mut start = 0;
        for (i, byte) in chunk.iter().enumerate() {
            match *byte {
                START_BYTE => {
                    if self.has_partial() {
                        log::debug!("start byte discarded {} buffered bytes", self.partial.len());
                    }
                    self.reset();
                    start = i + 1;
                }
                END_BYTE => {
                    self.buffer(&chunk[start..i]);
                    frames.push(self.complete());
                    start = i + 1;
                }
                _ => {}
            }
        }
        self.buffer(&chunk[start..]);
        frames
    }

    /// Like [`push`](Self::push), decoding each payload as `M`
    pub fn push_messages<M: DeserializeOwned>(
        &mut self,
        chunk: &[u8],
    ) -> Vec<Result<M, FramingError>> {
        self.push(chunk)
            .into_iter()
            .map(|frame| frame.and_then(|payload| decode_payload(&payload)))
            .collect()
    }

    /// Whether bytes of an incomplete frame are buffered
    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty() || self.overflowed
    }

    /// Drop any partially received frame
    pub fn reset(&mut self) {
        self.partial.clear();
        self.overflowed = false;
    }

    fn buffer(&mut self, bytes: &[u8]) {
        if self.overflowed || bytes.is_empty() {
            return;
        }
        if self.partial.len() + bytes.len() > self.max_frame_len {
            self.partial = Vec::new();
            self.overflowed = true;
            return;
        }
        self.partial.extend_from_slice(bytes);
    }

    fn complete(&mut self) -> Result<Vec<u8>, FramingError> {
        if self.overflowed {
            self.reset();
            return Err(FramingError::FrameTooLarge {
                limit: self.max_frame_len,
            });
        }
        if self.partial.is_empty() {
            return Err(FramingError::EmptyFrame);
        }
        Ok(std::mem::take(&mut self.partial))
    }
}
