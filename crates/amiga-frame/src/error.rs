/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No zero byte terminates the topic prefix.
    #[error("missing prefix terminator")]
    MissingTerminator,

    /// The topic prefix is not valid UTF-8 or contains a NUL byte.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Fewer bytes than the fixed header requires.
    #[error("frame too short ({len} bytes after prefix, need {needed})")]
    TooShort { len: usize, needed: usize },

    /// The envelope header contains an invalid magic number.
    #[error("invalid magic 0x{found:016x}")]
    InvalidMagic { found: u64 },

    /// An IPC message carried an unknown message-type byte.
    #[error("invalid message type 0x{0:02x}")]
    InvalidMessageType(u8),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The size-prefixed LZ4 envelope could not be decompressed.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

impl FrameError {
    /// Malformed envelope: the single frame is dropped, the stream is intact.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::MissingTerminator
                | FrameError::InvalidPrefix(_)
                | FrameError::TooShort { .. }
                | FrameError::InvalidMagic { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
