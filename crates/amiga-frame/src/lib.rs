//! Message framing and envelopes for the Amiga SDK.
//!
//! Three codecs live here:
//! - [`SpCodec`]: length-prefixed SP messages on a connected stream
//! - [`envelope`]: the hardware pub/sub envelope (prefix, 44-byte header, payload)
//! - [`compression`]: the size-prefixed LZ4 block envelope of the configuration endpoint
//!
//! All of them are pure. Retry and reconnection live in `amiga-peer`.

pub mod codec;
pub mod compression;
pub mod envelope;
pub mod error;

pub use codec::{SpCodec, DEFAULT_MAX_PAYLOAD, IPC_MESSAGE_TYPE};
pub use compression::{compress, decompress};
pub use envelope::{
    decode_envelope, encode_envelope, EnvelopeHeader, RawFrame, Stamp, WireDuration, HEADER_SIZE,
    MAGIC,
};
pub use error::{FrameError, Result};
