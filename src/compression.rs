//! Whole-buffer DEFLATE codec
//!
//! Both entry payloads and the serialized directory index pass through this
//! module. The codec is a pure function boundary: each call owns its input
//! and output buffers and leaves no state behind, so `compress` and
//! `decompress` are freely reusable and re-entrant.
//!
//! Streams are zlib-wrapped DEFLATE, so a truncated or bit-flipped payload
//! fails the stream checksum instead of decoding to wrong bytes.

use crate::error::{PackError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress a buffer with DEFLATE at maximum effort
///
/// Deterministic for identical input: the same bytes always produce the same
/// compressed stream.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a buffer produced by [`compress`]
///
/// Returns [`PackError::CorruptData`] if the input is not a valid zlib
/// stream (truncated, wrong magic, failed checksum).
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PackError::CorruptData(format!("zlib stream error: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round_trip() {
        let data = b"Hello, World! ".repeat(100);
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed).unwrap();

        assert_eq!(data.as_slice(), decompressed.as_slice());
        assert!(compressed.len() < data.len());
    }

    #[test]
    fn test_empty_input() {
        let compressed = compress(&[]).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn test_zero_fill_compresses_well() {
        let data = vec![0u8; 50_000];
        let compressed = compress(&data).unwrap();

        // All-zero input shrinks by orders of magnitude under DEFLATE.
        assert!(compressed.len() < data.len() / 100);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_deterministic() {
        let data = b"determinism check".repeat(50);
        assert_eq!(compress(&data).unwrap(), compress(&data).unwrap());
    }

    #[test]
    fn test_truncated_stream_detected() {
        let data = b"some payload that will be cut short".repeat(20);
        let compressed = compress(&data).unwrap();

        let truncated = &compressed[..compressed.len() - 4];
        assert!(matches!(
            decompress(truncated),
            Err(PackError::CorruptData(_))
        ));
    }

    #[test]
    fn test_garbage_input_detected() {
        let garbage = vec![0xAB; 128];
        assert!(matches!(
            decompress(&garbage),
            Err(PackError::CorruptData(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let compressed = compress(&data).unwrap();
            prop_assert_eq!(decompress(&compressed).unwrap(), data);
        }
    }
}
