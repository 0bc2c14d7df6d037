use std::fmt;
use std::io;

use amiga::frame::FrameError;
use amiga::peer::PeerError;
use amiga::proto::nexus::{reply, Reply};
use amiga::transport::TransportError;
use amiga::AmigaError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::InvalidAddress { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn peer_error(context: &str, err: PeerError) -> CliError {
    match err {
        PeerError::Transport(err) => transport_error(context, err),
        PeerError::Frame(err) => frame_error(context, err),
        PeerError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        PeerError::Connection { .. } | PeerError::Disconnected(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        PeerError::Decode(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        PeerError::RequestFailed(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn amiga_error(context: &str, err: AmigaError) -> CliError {
    match err {
        AmigaError::Validation(_) => CliError::new(USAGE, format!("{context}: {err}")),
        AmigaError::Peer(err) => peer_error(context, err),
        AmigaError::Rejected(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

/// A failure reply from the robot is a command failure.
pub fn check_reply(context: &str, reply: Reply) -> CliResult<()> {
    match reply.kind {
        Some(reply::Kind::Failure(failure)) => Err(CliError::new(
            FAILURE,
            format!("{context}: robot replied with failure: {}", failure.message),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn maps_error_taxonomy_to_exit_codes() {
        assert_eq!(
            amiga_error("x", AmigaError::Validation("bad".into())).code,
            USAGE
        );
        assert_eq!(
            amiga_error("x", AmigaError::Peer(PeerError::Timeout(Duration::from_millis(200)))).code,
            TIMEOUT
        );
        assert_eq!(
            amiga_error(
                "x",
                AmigaError::Peer(PeerError::Connection {
                    address: "tcp://127.0.0.1:1".into(),
                    attempts: 3,
                })
            )
            .code,
            TRANSPORT_ERROR
        );
        assert_eq!(
            peer_error("x", PeerError::Frame(FrameError::MissingTerminator)).code,
            DATA_INVALID
        );
        assert_eq!(amiga_error("x", AmigaError::Rejected("no".into())).code, FAILURE);
    }

    #[test]
    fn failure_reply_is_an_error() {
        use amiga::proto::nexus::{Failure, Success};

        let failed = Reply {
            kind: Some(reply::Kind::Failure(Failure {
                message: "busy".into(),
            })),
        };
        let err = check_reply("pause", failed).expect_err("failure reply");
        assert!(err.message.contains("busy"));

        let ok = Reply {
            kind: Some(reply::Kind::Success(Success {})),
        };
        assert!(check_reply("pause", ok).is_ok());
    }
}
