//! Error types for framed channels

/// A frame that could not be turned into a message, or a channel failure.
///
/// Malformed frames are reported per frame; the decoder always resumes
/// cleanly at the next frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// Start sentinel immediately followed by the end sentinel
    #[error("Empty frame")]
    EmptyFrame,
    /// Payload bytes are not valid UTF-8
    #[error("Invalid UTF-8 in frame: {0}")]
    InvalidUtf8(String),
    /// Payload text is not a valid message
    #[error("Failed to decode frame: {0}")]
    Decode(String),
    /// Message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(String),
    /// Payload contains one of the sentinel bytes
    #[error("Payload contains reserved byte {byte:#04x} at offset {offset}")]
    ReservedByte { byte: u8, offset: usize },
    #[error("Frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
    /// Underlying byte channel failed
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FramingError {
    fn from(err: std::io::Error) -> Self {
        FramingError::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for FramingError {
    fn from(err: std::str::Utf8Error) -> Self {
        FramingError::InvalidUtf8(err.to_string())
    }
}
