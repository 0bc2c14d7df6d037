use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

use amiga_frame::{compress, decompress};
use amiga_transport::{Address, Protocol};
use bytes::Bytes;
use prost::Message;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::backoff::{ConnectionEvent, ConnectionState};
use crate::config::{ChannelConfig, Compression};
use crate::connection::{connect_with_backoff, Connection};
use crate::error::{PeerError, Result};
use crate::server::{split_request_id, with_request_id, REQUEST_ID_FLAG};

/// A typed request/reply channel to one endpoint.
///
/// The connection is dialed lazily and reused until an exchange breaks it.
/// Callers are serialized: at most one request is on the wire at a time.
pub struct RequestChannel<Req, Rep> {
    address: Address,
    config: ChannelConfig,
    inner: tokio::sync::Mutex<Inner>,
    state: Mutex<ConnectionState>,
    _marker: PhantomData<fn(Req) -> Rep>,
}

struct Inner {
    conn: Option<Connection>,
    next_id: u32,
}

/// How a failed exchange leaves the socket.
enum ExchangeError {
    /// The socket is still usable.
    Keep(PeerError),
    /// The socket must not be reused.
    Discard(PeerError),
}

impl<Req, Rep> RequestChannel<Req, Rep>
where
    Req: Message,
    Rep: Message + Default,
{
    pub fn new(address: Address, config: ChannelConfig) -> Self {
        Self {
            address,
            config,
            inner: tokio::sync::Mutex::new(Inner {
                conn: None,
                next_id: 0,
            }),
            state: Mutex::new(ConnectionState::Unconnected),
            _marker: PhantomData,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure a connection exists, dialing up to `max_retries` times.
    ///
    /// Returns immediately when already connected. Never errors; `false`
    /// means every attempt failed.
    pub async fn connect(&self, max_retries: u32) -> bool {
        let mut inner = self.inner.lock().await;
        self.ensure_connected(&mut inner, max_retries).await
    }

    /// Send `request` and wait for its reply.
    pub async fn send(&self, request: &Req) -> Result<Rep> {
        let reply = self.request_bytes(&request.encode_to_vec()).await?;
        Ok(Rep::decode(reply)?)
    }

    /// Untyped exchange: `payload` is sent as-is (after compression, if
    /// configured) and the reply body is returned undecoded.
    pub async fn request_bytes(&self, payload: &[u8]) -> Result<Bytes> {
        let mut inner = self.inner.lock().await;
        if !self
            .ensure_connected(&mut inner, self.config.max_retries)
            .await
        {
            return Err(PeerError::Connection {
                address: self.address.to_string(),
                attempts: self.config.max_retries,
            });
        }

        let body = match self.config.compression {
            Compression::None => Bytes::copy_from_slice(payload),
            Compression::Lz4SizePrepended => compress(payload),
        };
        let reply = self.exchange(&mut inner, body).await?;
        match self.config.compression {
            Compression::None => Ok(reply),
            Compression::Lz4SizePrepended => {
                Ok(decompress(&reply, self.config.max_message_size)?)
            }
        }
    }

    /// Drop the connection. The next request dials again.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.conn.take().is_some() {
            debug!(address = %self.address, "request channel closed");
        }
        self.transition(ConnectionEvent::Close);
    }

    async fn ensure_connected(&self, inner: &mut Inner, max_retries: u32) -> bool {
        if inner.conn.is_some() {
            return true;
        }
        self.transition(ConnectionEvent::Dial);
        match connect_with_backoff(
            &self.address,
            Protocol::Req0,
            max_retries,
            &self.config.backoff,
            self.config.connect_timeout,
            self.config.max_message_size,
        )
        .await
        {
            Ok(conn) => {
                inner.conn = Some(conn);
                self.transition(ConnectionEvent::Established);
                true
            }
            Err(err) => {
                warn!(address = %self.address, error = %err, "giving up on connection");
                self.transition(ConnectionEvent::GaveUp);
                false
            }
        }
    }

    async fn exchange(&self, inner: &mut Inner, body: Bytes) -> Result<Bytes> {
        let id = REQUEST_ID_FLAG | inner.next_id;
        inner.next_id = inner.next_id.wrapping_add(1) & !REQUEST_ID_FLAG;

        let Some(conn) = inner.conn.as_mut() else {
            return Err(PeerError::Disconnected(self.address.to_string()));
        };
        match round_trip(conn, id, &body, self.config.timeout).await {
            Ok(reply) => Ok(reply),
            Err(ExchangeError::Keep(err)) => Err(err),
            Err(ExchangeError::Discard(err)) => {
                inner.conn = None;
                self.transition(ConnectionEvent::Failed);
                warn!(address = %self.address, error = %err, "discarding request socket");
                Err(match err {
                    PeerError::Timeout(_) => err,
                    other => PeerError::RequestFailed(other.to_string()),
                })
            }
        }
    }

    fn transition(&self, event: ConnectionEvent) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = state.next(event);
    }
}

/// Send one request and wait for the reply carrying the same id.
///
/// A send that does not finish leaves a partial message on the wire, so its
/// socket is discarded. A reply that does not arrive in time only costs the
/// caller this request; a late reply is skipped by id on the next exchange.
async fn round_trip(
    conn: &mut Connection,
    id: u32,
    body: &[u8],
    timeout: std::time::Duration,
) -> std::result::Result<Bytes, ExchangeError> {
    conn.send_timeout(with_request_id(id, body), timeout)
        .await
        .map_err(ExchangeError::Discard)?;

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ExchangeError::Keep(PeerError::Timeout(timeout)));
        }
        let message = match conn.recv_timeout(remaining).await {
            Ok(message) => message,
            Err(PeerError::Timeout(_)) => {
                return Err(ExchangeError::Keep(PeerError::Timeout(timeout)))
            }
            Err(err) => return Err(ExchangeError::Discard(err)),
        };
        let (reply_id, payload) = split_request_id(message).map_err(ExchangeError::Discard)?;
        if reply_id != id {
            debug!(expected = id, got = reply_id, "skipping stale reply");
            continue;
        }
        return Ok(payload);
    }
}

impl<Req, Rep> std::fmt::Debug for RequestChannel<Req, Rep> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestChannel")
            .field("address", &self.address.to_string())
            .field(
                "state",
                &*self.state.lock().unwrap_or_else(PoisonError::into_inner),
            )
            .finish()
    }
}
