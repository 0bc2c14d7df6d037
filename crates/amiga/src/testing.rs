//! In-process fake robot endpoints for unit tests.

use std::time::Duration;

use amiga_frame::{compress, decompress};
use amiga_peer::{BackoffPolicy, ChannelConfig, ReplySocket, SubscriptionConfig};
use amiga_transport::{Address, Protocol, SpListener};
use bytes::Bytes;
use tokio::sync::mpsc;

const MAX_MESSAGE: usize = 1 << 20;

/// Channel settings that fail fast and retry without real sleeps.
pub(crate) fn fast(config: ChannelConfig) -> ChannelConfig {
    ChannelConfig {
        timeout: Duration::from_secs(1),
        connect_timeout: Duration::from_secs(1),
        backoff: BackoffPolicy {
            unit: Duration::from_millis(1),
            cap_units: 10,
        },
        ..config
    }
}

/// Subscription settings with fast retries and short idle sleeps.
pub(crate) fn fast_subscription(config: SubscriptionConfig) -> SubscriptionConfig {
    SubscriptionConfig {
        connect_timeout: Duration::from_secs(1),
        backoff: BackoffPolicy {
            unit: Duration::from_millis(1),
            cap_units: 10,
        },
        idle_interval: Duration::from_millis(5),
        error_backoff: Duration::from_millis(20),
        ..config
    }
}

/// An address nothing listens on.
pub(crate) fn dead_address() -> Address {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("probe bind");
    let port = probe.local_addr().expect("probe addr").port();
    Address::tcp("127.0.0.1", port)
}

/// Serve REP connections one after another on loopback.
///
/// Every request payload (decompressed when `compressed`) is forwarded to
/// the returned receiver and answered with `handler(payload)`.
pub(crate) async fn spawn_robot<F>(
    compressed: bool,
    handler: F,
) -> (Address, mpsc::UnboundedReceiver<Bytes>)
where
    F: Fn(&[u8]) -> Vec<u8> + Send + 'static,
{
    let listener = SpListener::bind(&Address::tcp("127.0.0.1", 0), Protocol::Rep0)
        .await
        .expect("bind fake robot");
    let address = listener.local_address().clone();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok(mut socket) = ReplySocket::accept(&listener, MAX_MESSAGE).await {
            while let Ok((id, payload)) = socket.recv().await {
                let payload = if compressed {
                    decompress(&payload, MAX_MESSAGE).expect("request is lz4")
                } else {
                    payload
                };
                let reply = handler(&payload);
                let _ = tx.send(payload);
                let reply = if compressed {
                    compress(&reply)
                } else {
                    Bytes::from(reply)
                };
                if socket.reply(id, &reply).await.is_err() {
                    break;
                }
            }
        }
    });

    (address, rx)
}
