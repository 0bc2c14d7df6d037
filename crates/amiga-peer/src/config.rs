use std::time::Duration;

use amiga_frame::DEFAULT_MAX_PAYLOAD;

use crate::backoff::BackoffPolicy;

/// Default bound on every send and receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);
/// Default bound on a single dial, handshake included.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Default number of connect attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Body transformation applied around every request and reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    /// 4-byte little-endian uncompressed size followed by an LZ4 block.
    Lz4SizePrepended,
}

/// Configuration for a [`RequestChannel`](crate::RequestChannel).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Send timeout, and receive timeout for the matching reply.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
    pub max_message_size: usize,
    pub compression: Compression,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            max_message_size: DEFAULT_MAX_PAYLOAD,
            compression: Compression::None,
        }
    }
}

impl ChannelConfig {
    /// Defaults with the LZ4 envelope enabled.
    pub fn compressed() -> Self {
        Self {
            compression: Compression::Lz4SizePrepended,
            ..Self::default()
        }
    }
}

/// Configuration for a [`SubscriptionMux`](crate::SubscriptionMux).
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Receive timeout; expiry is the normal idle outcome.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
    /// Sleep while no subscriber is registered.
    pub idle_interval: Duration,
    /// Pause after a receive error before trying again.
    pub error_backoff: Duration,
    /// Only messages starting with this prefix are delivered. Empty accepts all.
    pub topic: Vec<u8>,
    pub max_message_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            idle_interval: Duration::from_millis(100),
            error_backoff: Duration::from_secs(1),
            topic: Vec::new(),
            max_message_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
