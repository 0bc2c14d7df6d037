//! Scalability-protocol socket transport.
//!
//! Speaks the NNG-compatible SP wire protocol natively over:
//! - TCP (`tcp://host:port`), used for every robot endpoint
//! - Unix domain sockets (`ipc:///path`), used for the local hardware feed
//!
//! This is the lowest layer of the SDK. Everything else builds on the
//! [`SpStream`] returned by [`dial`].

pub mod address;
pub mod dial;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod stream;

pub use address::{
    Address, Endpoint, DEFAULT_CONFIG_PORT, DEFAULT_FEEDBACK_PORT, DEFAULT_REQUEST_PORT,
    DEFAULT_STREAM_PORT,
};
pub use dial::dial;
pub use error::{Result, TransportError};
pub use listener::{SpListener, DEFAULT_HANDSHAKE_TIMEOUT};
pub use protocol::Protocol;
pub use stream::{Flavor, SpStream};
