use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TransportError};

/// Connection header size: `00 'S' 'P' 00`, protocol id (2B BE), reserved (2B).
pub const HEADER_LEN: usize = 8;

/// Scalability protocols spoken on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Req0,
    Rep0,
    Pub0,
    Sub0,
}

impl Protocol {
    /// Wire protocol identifier.
    pub const fn id(self) -> u16 {
        match self {
            Protocol::Pub0 => 0x20,
            Protocol::Sub0 => 0x21,
            Protocol::Req0 => 0x30,
            Protocol::Rep0 => 0x31,
        }
    }

    /// The only protocol this one may talk to.
    pub const fn peer(self) -> Protocol {
        match self {
            Protocol::Req0 => Protocol::Rep0,
            Protocol::Rep0 => Protocol::Req0,
            Protocol::Pub0 => Protocol::Sub0,
            Protocol::Sub0 => Protocol::Pub0,
        }
    }

    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0x20 => Some(Protocol::Pub0),
            0x21 => Some(Protocol::Sub0),
            0x30 => Some(Protocol::Req0),
            0x31 => Some(Protocol::Rep0),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Protocol::Req0 => "req",
            Protocol::Rep0 => "rep",
            Protocol::Pub0 => "pub",
            Protocol::Sub0 => "sub",
        }
    }
}

/// Encode the connection header announcing `protocol`.
pub fn encode_header(protocol: Protocol) -> [u8; HEADER_LEN] {
    let id = protocol.id().to_be_bytes();
    [0x00, b'S', b'P', 0x00, id[0], id[1], 0x00, 0x00]
}

/// Decode a peer's connection header.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<Protocol> {
    if header[..4] != [0x00, b'S', b'P', 0x00] {
        return Err(TransportError::Handshake(format!(
            "bad connection header signature {:02x?}",
            &header[..4]
        )));
    }
    if header[6..] != [0x00, 0x00] {
        return Err(TransportError::Handshake(
            "non-zero reserved bytes in connection header".to_string(),
        ));
    }
    let id = u16::from_be_bytes([header[4], header[5]]);
    Protocol::from_id(id)
        .ok_or_else(|| TransportError::Handshake(format!("unknown protocol id 0x{id:04x}")))
}

/// Exchange connection headers and verify the peer speaks `local.peer()`.
pub async fn exchange_headers<S>(stream: &mut S, local: Protocol) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&encode_header(local)).await?;
    stream.flush().await?;

    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await?;
    let remote = decode_header(&header)?;

    if remote != local.peer() {
        return Err(TransportError::Handshake(format!(
            "{} socket cannot talk to {} peer",
            local.name(),
            remote.name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        assert_eq!(
            encode_header(Protocol::Req0),
            [0x00, 0x53, 0x50, 0x00, 0x00, 0x30, 0x00, 0x00]
        );
        assert_eq!(
            encode_header(Protocol::Sub0),
            [0x00, 0x53, 0x50, 0x00, 0x00, 0x21, 0x00, 0x00]
        );
    }

    #[test]
    fn decode_header_validates_fields() {
        let mut header = encode_header(Protocol::Pub0);
        assert_eq!(decode_header(&header).expect("valid"), Protocol::Pub0);

        header[1] = b'X';
        assert!(matches!(
            decode_header(&header),
            Err(TransportError::Handshake(_))
        ));

        let mut header = encode_header(Protocol::Rep0);
        header[7] = 1;
        assert!(matches!(
            decode_header(&header),
            Err(TransportError::Handshake(_))
        ));

        let header = [0x00, b'S', b'P', 0x00, 0x00, 0x99, 0x00, 0x00];
        assert!(matches!(
            decode_header(&header),
            Err(TransportError::Handshake(_))
        ));
    }

    #[test]
    fn peers_are_symmetric() {
        for protocol in [
            Protocol::Req0,
            Protocol::Rep0,
            Protocol::Pub0,
            Protocol::Sub0,
        ] {
            assert_eq!(protocol.peer().peer(), protocol);
            assert_eq!(Protocol::from_id(protocol.id()), Some(protocol));
        }
    }

    #[tokio::test]
    async fn exchange_rejects_incompatible_peer() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let server_task =
            tokio::spawn(async move { exchange_headers(&mut server, Protocol::Pub0).await });

        let result = exchange_headers(&mut client, Protocol::Req0).await;
        assert!(matches!(result, Err(TransportError::Handshake(_))));

        let server_result = server_task.await.expect("server task should join");
        assert!(matches!(server_result, Err(TransportError::Handshake(_))));
    }

    #[tokio::test]
    async fn exchange_accepts_matching_peer() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let server_task =
            tokio::spawn(async move { exchange_headers(&mut server, Protocol::Rep0).await });

        exchange_headers(&mut client, Protocol::Req0)
            .await
            .expect("req/rep handshake should succeed");
        server_task
            .await
            .expect("server task should join")
            .expect("server side should succeed");
    }
}
