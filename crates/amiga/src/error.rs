use amiga_peer::PeerError;

/// Errors returned by client operations.
#[derive(Debug, thiserror::Error)]
pub enum AmigaError {
    /// Arguments rejected locally, before any network I/O.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// The channel could not complete the exchange.
    #[error(transparent)]
    Peer(#[from] PeerError),

    /// The robot answered, but with a failure or an unexpected reply.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl AmigaError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        AmigaError::Validation(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AmigaError::Peer(err) if err.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, AmigaError>;
