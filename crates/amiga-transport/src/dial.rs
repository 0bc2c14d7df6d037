use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use crate::address::Address;
use crate::error::{Result, TransportError};
use crate::protocol::{exchange_headers, Protocol};
use crate::stream::SpStream;

/// Connect to `address` and complete the connection-header exchange.
///
/// The whole dial, handshake included, is bounded by `timeout`.
pub async fn dial(address: &Address, protocol: Protocol, timeout: Duration) -> Result<SpStream> {
    match tokio::time::timeout(timeout, dial_unbounded(address, protocol)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            address: address.to_string(),
            after: timeout,
        }),
    }
}

async fn dial_unbounded(address: &Address, protocol: Protocol) -> Result<SpStream> {
    let mut stream = connect(address).await?;
    exchange_headers(&mut stream, protocol).await?;
    debug!(%address, protocol = protocol.name(), "dialed");
    Ok(stream)
}

async fn connect(address: &Address) -> Result<SpStream> {
    match address {
        Address::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(|source| TransportError::Connect {
                    address: address.to_string(),
                    source,
                })?;
            // Small request frames must not sit in Nagle's buffer.
            let _ = stream.set_nodelay(true);
            Ok(SpStream::from_tcp(stream))
        }
        #[cfg(unix)]
        Address::Ipc(path) => {
            let stream = tokio::net::UnixStream::connect(path)
                .await
                .map_err(|source| TransportError::Connect {
                    address: address.to_string(),
                    source,
                })?;
            Ok(SpStream::from_unix(stream))
        }
        #[cfg(not(unix))]
        Address::Ipc(_) => Err(TransportError::InvalidAddress {
            address: address.to_string(),
            reason: "ipc transport requires unix domain sockets",
        }),
    }
}
