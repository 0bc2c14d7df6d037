//! Size-prefixed LZ4 block envelope used by the configuration endpoint.
//!
//! `[uncompressed length (4B LE)][LZ4 block]`

use bytes::Bytes;

use crate::error::{FrameError, Result};

/// Width of the uncompressed-length prefix.
pub const SIZE_PREFIX_LEN: usize = 4;

/// Compress `data` and prepend its uncompressed length.
pub fn compress(data: &[u8]) -> Bytes {
    Bytes::from(lz4_flex::block::compress_prepend_size(data))
}

/// Reverse [`compress`].
///
/// Fails if the input cannot hold the size prefix, if the declared size is
/// larger than `max_size`, or if the block does not inflate to exactly the
/// declared size.
pub fn decompress(data: &[u8], max_size: usize) -> Result<Bytes> {
    if data.len() < SIZE_PREFIX_LEN {
        return Err(FrameError::Decompression(format!(
            "input too short for size prefix ({} bytes)",
            data.len()
        )));
    }
    let mut prefix = [0u8; SIZE_PREFIX_LEN];
    prefix.copy_from_slice(&data[..SIZE_PREFIX_LEN]);
    let declared = u32::from_le_bytes(prefix) as usize;

    if declared > max_size {
        return Err(FrameError::PayloadTooLarge {
            size: declared,
            max: max_size,
        });
    }
    if declared == 0 {
        return Ok(Bytes::new());
    }

    let inflated = lz4_flex::block::decompress(&data[SIZE_PREFIX_LEN..], declared)
        .map_err(|err| FrameError::Decompression(err.to_string()))?;
    if inflated.len() != declared {
        return Err(FrameError::Decompression(format!(
            "declared {declared} bytes, inflated {}",
            inflated.len()
        )));
    }
    Ok(Bytes::from(inflated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_MAX_PAYLOAD;

    #[test]
    fn roundtrip_repetitive_payload() {
        let data = b"robot_model_facade.wheel_track ".repeat(64);
        let packed = compress(&data);
        assert!(packed.len() < data.len());
        assert_eq!(&packed[..4], &(data.len() as u32).to_le_bytes());

        let unpacked = decompress(&packed, DEFAULT_MAX_PAYLOAD).expect("decompress");
        assert_eq!(unpacked.as_ref(), data.as_slice());
    }

    #[test]
    fn roundtrip_small_and_empty() {
        for data in [&b""[..], b"x", b"\x0a\x00\x12\x03abc"] {
            let unpacked = decompress(&compress(data), DEFAULT_MAX_PAYLOAD).expect("decompress");
            assert_eq!(unpacked.as_ref(), data);
        }
    }

    #[test]
    fn short_input_fails() {
        for data in [&b""[..], b"\x01", b"\x01\x00\x00"] {
            assert!(matches!(
                decompress(data, DEFAULT_MAX_PAYLOAD),
                Err(FrameError::Decompression(_))
            ));
        }
    }

    #[test]
    fn wrong_declared_size_fails() {
        let mut packed = compress(b"hello hello hello hello").to_vec();
        packed[..4].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(
            decompress(&packed, DEFAULT_MAX_PAYLOAD),
            Err(FrameError::Decompression(_))
        ));
    }

    #[test]
    fn declared_size_above_limit_fails() {
        let packed = compress(&[7u8; 256]);
        assert!(matches!(
            decompress(&packed, 64),
            Err(FrameError::PayloadTooLarge { size: 256, max: 64 })
        ));
    }
}
