//! Resilient messaging on top of SP sockets.
//!
//! - [`RequestChannel`]: one typed request/reply exchange at a time, with
//!   lazy connection, bounded retries and exponential backoff
//! - [`SubscriptionMux`]: one subscription socket fanned out to many
//!   callback or pull subscribers, with failing subscribers isolated
//!
//! [`server`] holds the robot-side counterparts used by simulators and tests.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod request;
pub mod server;
pub mod subscription;

pub use backoff::{BackoffPolicy, ConnectionEvent, ConnectionState};
pub use config::{
    ChannelConfig, Compression, SubscriptionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT,
};
pub use connection::{connect_with_backoff, Connection};
pub use error::{PeerError, Result};
pub use request::RequestChannel;
pub use server::{Publisher, ReplySocket};
pub use subscription::{
    BoxError, CallbackFuture, Subscription, SubscriptionGuard, SubscriptionId, SubscriptionMux,
};
