//! Hardware pub/sub envelope.
//!
//! Every message on the raw hardware feed is a topic prefix, a fixed 44-byte
//! header and an opaque payload:
//!
//! ```text
//! ┌────────────┬──────┬───────────┬──────────┬────────────────┬────────────────┬──────────┬─────────┐
//! │ Prefix     │ 0x00 │ Magic     │ Sequence │ Acqtime        │ Pubtime        │ Checksum │ Payload │
//! │ UTF-8      │      │ (8B LE)   │ (8B LE)  │ secs 8B+nsec 4B│ secs 8B+nsec 4B│ (4B LE)  │         │
//! └────────────┴──────┴───────────┴──────────┴────────────────┴────────────────┴──────────┴─────────┘
//! ```

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Envelope magic: `10435029236456460496`.
pub const MAGIC: u64 = 0x90EC_F7C5_A6CD_56D0;

/// Header size following the prefix terminator.
pub const HEADER_SIZE: usize = 44;

/// A `(seconds, nanoseconds)` pair as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireDuration {
    pub secs: u64,
    pub nanos: u32,
}

impl WireDuration {
    pub fn new(secs: u64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// `None` when the stamp does not fit a [`Duration`]. Wire nanos may
    /// exceed one second.
    pub fn as_duration(&self) -> Option<Duration> {
        Duration::from_secs(self.secs).checked_add(Duration::from_nanos(u64::from(self.nanos)))
    }
}

impl From<Duration> for WireDuration {
    fn from(value: Duration) -> Self {
        Self {
            secs: value.as_secs(),
            nanos: value.subsec_nanos(),
        }
    }
}

/// Acquisition and publish timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stamp {
    pub acqtime: WireDuration,
    pub pubtime: WireDuration,
}

/// Fixed envelope header (magic already validated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvelopeHeader {
    pub sequence: u64,
    pub stamp: Stamp,
    pub payload_checksum: u32,
}

/// One decoded hardware frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub prefix: String,
    pub header: EnvelopeHeader,
    pub payload: Bytes,
}

impl RawFrame {
    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.prefix.len() + 1 + HEADER_SIZE + self.payload.len()
    }
}

/// Decode a raw envelope.
///
/// The payload is a zero-copy slice of `buf`. Nothing past the prefix is
/// interpreted unless the magic matches.
pub fn decode_envelope(buf: Bytes) -> Result<RawFrame> {
    let nul = buf
        .iter()
        .position(|b| *b == 0)
        .ok_or(FrameError::MissingTerminator)?;

    let prefix = std::str::from_utf8(&buf[..nul])
        .map_err(|err| FrameError::InvalidPrefix(err.to_string()))?
        .to_string();

    let header_start = nul + 1;
    let remaining = buf.len() - header_start;
    if remaining < HEADER_SIZE {
        return Err(FrameError::TooShort {
            len: remaining,
            needed: HEADER_SIZE,
        });
    }

    let mut header = &buf[header_start..header_start + HEADER_SIZE];
    let magic = header.get_u64_le();
    if magic != MAGIC {
        return Err(FrameError::InvalidMagic { found: magic });
    }

    let sequence = header.get_u64_le();
    let acqtime = WireDuration::new(header.get_u64_le(), header.get_u32_le());
    let pubtime = WireDuration::new(header.get_u64_le(), header.get_u32_le());
    let payload_checksum = header.get_u32_le();

    Ok(RawFrame {
        prefix,
        header: EnvelopeHeader {
            sequence,
            stamp: Stamp { acqtime, pubtime },
            payload_checksum,
        },
        payload: buf.slice(header_start + HEADER_SIZE..),
    })
}

/// Encode a raw envelope into `dst`.
pub fn encode_envelope(frame: &RawFrame, dst: &mut BytesMut) -> Result<()> {
    if frame.prefix.as_bytes().contains(&0) {
        return Err(FrameError::InvalidPrefix(
            "prefix contains a NUL byte".to_string(),
        ));
    }
    let header = &frame.header;
    dst.reserve(frame.wire_size());
    dst.put_slice(frame.prefix.as_bytes());
    dst.put_u8(0);
    dst.put_u64_le(MAGIC);
    dst.put_u64_le(header.sequence);
    dst.put_u64_le(header.stamp.acqtime.secs);
    dst.put_u32_le(header.stamp.acqtime.nanos);
    dst.put_u64_le(header.stamp.pubtime.secs);
    dst.put_u32_le(header.stamp.pubtime.nanos);
    dst.put_u32_le(header.payload_checksum);
    dst.put_slice(&frame.payload);
    Ok(())
}
