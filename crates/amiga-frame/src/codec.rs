use amiga_transport::Flavor;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};

/// Default maximum message size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Message-type byte preceding every IPC message.
pub const IPC_MESSAGE_TYPE: u8 = 0x01;

const LENGTH_SIZE: usize = 8;

/// Message codec for SP streams.
///
/// Wire format:
/// ```text
/// TCP:  ┌──────────────┬────────────────┐
///       │ Length (8B)  │ Body           │
///       │ BE u64       │ (Length bytes) │
///       └──────────────┴────────────────┘
/// IPC:  ┌──────┬──────────────┬────────────────┐
///       │ 0x01 │ Length (8B)  │ Body           │
///       │      │ BE u64       │ (Length bytes) │
///       └──────┴──────────────┴────────────────┘
/// ```
#[derive(Debug, Clone)]
pub struct SpCodec {
    flavor: Flavor,
    max_payload: usize,
}

impl SpCodec {
    pub fn new(flavor: Flavor) -> Self {
        Self::with_max_payload(flavor, DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(flavor: Flavor, max_payload: usize) -> Self {
        Self {
            flavor,
            max_payload,
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn header_size(&self) -> usize {
        match self.flavor {
            Flavor::Tcp => LENGTH_SIZE,
            Flavor::Ipc => 1 + LENGTH_SIZE,
        }
    }
}

impl Decoder for SpCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        let header_size = self.header_size();
        if src.len() < header_size {
            return Ok(None);
        }

        if self.flavor == Flavor::Ipc && src[0] != IPC_MESSAGE_TYPE {
            return Err(FrameError::InvalidMessageType(src[0]));
        }

        let mut length = [0u8; LENGTH_SIZE];
        length.copy_from_slice(&src[header_size - LENGTH_SIZE..header_size]);
        let length = u64::from_be_bytes(length);

        if length > self.max_payload as u64 {
            return Err(FrameError::PayloadTooLarge {
                size: usize::try_from(length).unwrap_or(usize::MAX),
                max: self.max_payload,
            });
        }
        let length = length as usize;

        let total = header_size + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(header_size);
        Ok(Some(src.split_to(length).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if src.is_empty() {
            return Ok(None);
        }
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Bytes> for SpCodec {
    type Error = FrameError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<()> {
        if body.len() > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: body.len(),
                max: self.max_payload,
            });
        }
        dst.reserve(self.header_size() + body.len());
        if self.flavor == Flavor::Ipc {
            dst.put_u8(IPC_MESSAGE_TYPE);
        }
        dst.put_u64(body.len() as u64);
        dst.put_slice(&body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    use super::*;

    #[test]
    fn tcp_layout() {
        let mut codec = SpCodec::new(Flavor::Tcp);
        let mut buf = BytesMut::new();
        codec
            .encode(Bytes::from_static(b"abc"), &mut buf)
            .expect("encode");
        assert_eq!(&buf[..], &[0, 0, 0, 0, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn ipc_layout() {
        let mut codec = SpCodec::new(Flavor::Ipc);
        let mut buf = BytesMut::new();
        codec
            .encode(Bytes::from_static(b"hi"), &mut buf)
            .expect("encode");
        assert_eq!(&buf[..], &[1, 0, 0, 0, 0, 0, 0, 0, 2, b'h', b'i']);

        let message = codec.decode(&mut buf).expect("decode").expect("complete");
        assert_eq!(message.as_ref(), b"hi");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_complete_message() {
        let mut codec = SpCodec::new(Flavor::Tcp);
        let mut buf = BytesMut::from(&[0, 0, 0, 0, 0, 0, 0][..]);
        assert!(codec.decode(&mut buf).expect("decode").is_none());

        buf.put_u8(5);
        buf.put_slice(b"he");
        assert!(codec.decode(&mut buf).expect("decode").is_none());

        buf.put_slice(b"llo");
        let message = codec.decode(&mut buf).expect("decode").expect("complete");
        assert_eq!(message.as_ref(), b"hello");
    }

    #[test]
    fn decode_rejects_oversized_length_before_buffering() {
        let mut codec = SpCodec::with_max_payload(Flavor::Tcp, 1024);
        let mut buf = BytesMut::new();
        buf.put_u64(32 * 1024 * 1024);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::PayloadTooLarge { max: 1024, .. })
        ));
    }

    #[test]
    fn decode_rejects_unknown_ipc_type() {
        let mut codec = SpCodec::new(Flavor::Ipc);
        let mut buf = BytesMut::from(&[7, 0, 0, 0, 0, 0, 0, 0, 0][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::InvalidMessageType(7))
        ));
    }

    #[test]
    fn eof_mid_message_is_connection_closed() {
        let mut codec = SpCodec::new(Flavor::Tcp);
        let mut buf = BytesMut::from(&[0, 0, 0, 0, 0, 0, 0, 9, b'x'][..]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(FrameError::ConnectionClosed)
        ));

        let mut empty = BytesMut::new();
        assert!(codec.decode_eof(&mut empty).expect("clean eof").is_none());
    }

    #[tokio::test]
    async fn framed_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = Framed::new(client, SpCodec::new(Flavor::Tcp));
        let mut reader = Framed::new(server, SpCodec::new(Flavor::Tcp));

        writer
            .send(Bytes::from_static(b"first"))
            .await
            .expect("send first");
        writer
            .send(Bytes::from_static(b"second"))
            .await
            .expect("send second");
        drop(writer);

        let first = reader.next().await.expect("item").expect("decode");
        let second = reader.next().await.expect("item").expect("decode");
        assert_eq!(first.as_ref(), b"first");
        assert_eq!(second.as_ref(), b"second");
        assert!(reader.next().await.is_none());
    }
}
