use std::time::Duration;

/// Errors that can occur in channel and subscription operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] amiga_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] amiga_frame::FrameError),

    /// No connection could be established within the retry budget.
    #[error("could not connect to {address} after {attempts} attempt(s)")]
    Connection { address: String, attempts: u32 },

    /// Send or receive did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// An exchange failed after the connection was established.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Protobuf decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The remote end closed the connection.
    #[error("peer disconnected: {0}")]
    Disconnected(String),
}

impl PeerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PeerError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
