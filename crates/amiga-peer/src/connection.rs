use std::time::Duration;

use amiga_frame::SpCodec;
use amiga_transport::{dial, Address, Protocol, SpStream};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio_util::codec::Framed;
use tracing::{debug, error};

use crate::backoff::BackoffPolicy;
use crate::error::{PeerError, Result};

/// A connected SP socket carrying whole messages.
pub struct Connection {
    framed: Framed<SpStream, SpCodec>,
    address: Address,
}

impl Connection {
    pub fn new(stream: SpStream, address: Address, max_message_size: usize) -> Self {
        let codec = SpCodec::with_max_payload(stream.flavor(), max_message_size);
        Self {
            framed: Framed::new(stream, codec),
            address,
        }
    }

    /// Single dial attempt, no backoff.
    pub async fn dial(
        address: &Address,
        protocol: Protocol,
        connect_timeout: Duration,
        max_message_size: usize,
    ) -> Result<Self> {
        let stream = dial(address, protocol, connect_timeout).await?;
        Ok(Self::new(stream, address.clone(), max_message_size))
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub async fn send(&mut self, body: Bytes) -> Result<()> {
        self.framed.send(body).await?;
        Ok(())
    }

    pub async fn send_timeout(&mut self, body: Bytes, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.send(body))
            .await
            .map_err(|_| PeerError::Timeout(timeout))?
    }

    /// Next message. A clean EOF is reported as [`PeerError::Disconnected`].
    pub async fn recv(&mut self) -> Result<Bytes> {
        match self.framed.next().await {
            Some(message) => Ok(message?),
            None => Err(PeerError::Disconnected(self.address.to_string())),
        }
    }

    /// Like [`Connection::recv`], bounded by `timeout`.
    ///
    /// Cancel-safe: a partially received message stays buffered.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Bytes> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| PeerError::Timeout(timeout))?
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address.to_string())
            .finish()
    }
}

/// Dial `address` up to `max_retries` times.
///
/// Sleeps `backoff.delay(k)` before attempt `k`, including the first.
/// A failed attempt is logged and its socket dropped.
pub async fn connect_with_backoff(
    address: &Address,
    protocol: Protocol,
    max_retries: u32,
    backoff: &BackoffPolicy,
    connect_timeout: Duration,
    max_message_size: usize,
) -> Result<Connection> {
    for attempt in 0..max_retries {
        tokio::time::sleep(backoff.delay(attempt)).await;
        match Connection::dial(address, protocol, connect_timeout, max_message_size).await {
            Ok(connection) => {
                debug!(%address, attempt = attempt + 1, "connected");
                return Ok(connection);
            }
            Err(err) => {
                error!(%address, attempt = attempt + 1, error = %err, "connection attempt failed");
            }
        }
    }
    Err(PeerError::Connection {
        address: address.to_string(),
        attempts: max_retries,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use amiga_transport::SpListener;

    use super::*;

    fn policy(unit: Duration) -> BackoffPolicy {
        BackoffPolicy {
            unit,
            cap_units: 10,
        }
    }

    fn dead_address() -> Address {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("probe bind");
        let port = probe.local_addr().expect("probe addr").port();
        Address::tcp("127.0.0.1", port)
    }

    #[tokio::test]
    async fn failed_connect_sleeps_full_schedule() {
        let started = Instant::now();
        let err = connect_with_backoff(
            &dead_address(),
            Protocol::Req0,
            3,
            &policy(Duration::from_millis(20)),
            Duration::from_secs(1),
            1 << 20,
        )
        .await
        .expect_err("nothing listening");

        assert!(
            matches!(err, PeerError::Connection { attempts: 3, .. }),
            "got {err:?}"
        );
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_millis(20 + 40 + 80),
            "elapsed {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn first_attempt_waits_one_unit() {
        let unit = Duration::from_millis(60);
        let listener = SpListener::bind(&Address::tcp("127.0.0.1", 0), Protocol::Rep0)
            .await
            .expect("bind");
        let address = listener.local_address().clone();
        let accepted_at = tokio::spawn(async move {
            let stream = listener.accept().await.expect("accept");
            (Instant::now(), stream)
        });

        let started = Instant::now();
        let conn = connect_with_backoff(
            &address,
            Protocol::Req0,
            3,
            &policy(unit),
            Duration::from_secs(1),
            1 << 20,
        )
        .await
        .expect("listener is up");
        assert_eq!(conn.address(), &address);

        let (at, _stream) = accepted_at.await.expect("join");
        assert!(
            at.duration_since(started) >= unit,
            "first dial came after {:?}",
            at.duration_since(started)
        );
    }

    #[tokio::test]
    async fn zero_retries_never_dials() {
        let started = Instant::now();
        let err = connect_with_backoff(
            &dead_address(),
            Protocol::Sub0,
            0,
            &policy(Duration::from_secs(1)),
            Duration::from_secs(1),
            1 << 20,
        )
        .await
        .expect_err("no attempts");
        assert!(matches!(err, PeerError::Connection { attempts: 0, .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
