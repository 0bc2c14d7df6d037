//! Robot-side sockets.
//!
//! Used by simulators and by tests that stand in for a robot. They speak the
//! same wire format the client sockets expect.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use amiga_transport::{Address, Protocol, SpListener};
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{PeerError, Result};

/// Length of the request id prepended to every REQ/REP body.
pub const REQUEST_ID_LEN: usize = 4;

/// Marks the last (and, for direct peers, only) id in a REQ backtrace.
pub const REQUEST_ID_FLAG: u32 = 0x8000_0000;

/// Split a REQ/REP body into its request id and payload.
pub fn split_request_id(mut body: Bytes) -> Result<(u32, Bytes)> {
    if body.len() < REQUEST_ID_LEN {
        return Err(PeerError::RequestFailed(format!(
            "message of {} bytes has no request id",
            body.len()
        )));
    }
    let head = body.split_to(REQUEST_ID_LEN);
    let id = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    if id & REQUEST_ID_FLAG == 0 {
        return Err(PeerError::RequestFailed(format!(
            "request id {id:#010x} lacks the end-of-backtrace bit"
        )));
    }
    Ok((id, body))
}

/// Prepend `id` to `payload`.
pub fn with_request_id(id: u32, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(REQUEST_ID_LEN + payload.len());
    buf.put_u32(id);
    buf.put_slice(payload);
    buf.freeze()
}

/// One accepted REP connection.
#[derive(Debug)]
pub struct ReplySocket {
    conn: Connection,
}

impl ReplySocket {
    /// Wait for the next REQ peer on `listener`.
    pub async fn accept(listener: &SpListener, max_message_size: usize) -> Result<Self> {
        let stream = listener.accept().await?;
        let conn = Connection::new(stream, listener.local_address().clone(), max_message_size);
        Ok(Self { conn })
    }

    /// Next request as `(id, payload)`.
    pub async fn recv(&mut self) -> Result<(u32, Bytes)> {
        let body = self.conn.recv().await?;
        split_request_id(body)
    }

    /// Answer request `id`.
    pub async fn reply(&mut self, id: u32, payload: &[u8]) -> Result<()> {
        self.conn.send(with_request_id(id, payload)).await
    }
}

/// Accepts SUB peers and fans every published message out to all of them.
pub struct Publisher {
    address: Address,
    peers: Arc<Mutex<Vec<Connection>>>,
    // Serializes publishes so peers see messages in publish order.
    gate: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
}

impl Publisher {
    /// Bind a PUB socket and start accepting subscribers in the background.
    pub async fn bind(address: &Address, max_message_size: usize) -> Result<Self> {
        let listener = SpListener::bind(address, Protocol::Pub0).await?;
        let address = listener.local_address().clone();
        let peers = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();

        let accept_peers = Arc::clone(&peers);
        let accept_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    _ = accept_cancel.cancelled() => break,
                    accepted = listener.accept() => accepted,
                };
                match accepted {
                    Ok(stream) => {
                        let conn = Connection::new(
                            stream,
                            listener.local_address().clone(),
                            max_message_size,
                        );
                        accept_peers
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(conn);
                        debug!(address = %listener.local_address(), "subscriber attached");
                    }
                    Err(err) => warn!(error = %err, "rejected subscriber"),
                }
            }
        });

        Ok(Self {
            address,
            peers,
            gate: tokio::sync::Mutex::new(()),
            cancel,
        })
    }

    /// Address subscribers should dial. Port 0 binds resolve to the real port.
    pub fn local_address(&self) -> &Address {
        &self.address
    }

    pub fn subscriber_count(&self) -> usize {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Send `body` to every attached subscriber. Returns how many received it.
    ///
    /// Subscribers whose socket fails are dropped.
    pub async fn publish(&self, body: &[u8]) -> usize {
        let _gate = self.gate.lock().await;
        let peers = std::mem::take(&mut *self.peers.lock().unwrap_or_else(PoisonError::into_inner));
        let body = Bytes::copy_from_slice(body);
        let mut alive = Vec::with_capacity(peers.len());
        for mut peer in peers {
            match peer.send(body.clone()).await {
                Ok(()) => alive.push(peer),
                Err(err) => debug!(error = %err, "dropping subscriber"),
            }
        }
        let delivered = alive.len();
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(alive);
        delivered
    }

    /// Poll until at least `count` subscribers are attached or `timeout` passes.
    pub async fn wait_for_subscribers(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.subscriber_count() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("address", &self.address.to_string())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_split() {
        let body = with_request_id(0x8000_0007, b"hello");
        let (id, payload) = split_request_id(body).expect("split");
        assert_eq!(id, 0x8000_0007);
        assert_eq!(&payload[..], b"hello");
    }

    #[test]
    fn request_id_requires_flag_and_length() {
        assert!(split_request_id(Bytes::from_static(&[0x80, 0])).is_err());
        assert!(split_request_id(with_request_id(7, b"x")).is_err());
    }

    #[tokio::test]
    async fn publisher_counts_subscribers() {
        let publisher = Publisher::bind(&Address::tcp("127.0.0.1", 0), 1024)
            .await
            .expect("bind");
        assert_eq!(publisher.publish(b"nobody").await, 0);

        let mut sub = Connection::dial(
            publisher.local_address(),
            Protocol::Sub0,
            Duration::from_secs(1),
            1024,
        )
        .await
        .expect("dial");
        assert!(
            publisher
                .wait_for_subscribers(1, Duration::from_secs(2))
                .await
        );
        assert_eq!(publisher.publish(b"hi").await, 1);
        let got = sub.recv_timeout(Duration::from_secs(1)).await.expect("recv");
        assert_eq!(&got[..], b"hi");
    }
}
