//! Zlib compression and decompression built on miniz_oxide.

use crate::error::{Error, Result};

/// Compresses data into a zlib stream.
///
/// Uses compression level 6, the usual speed/size balance.
pub fn compress(data: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, 6)
}

/// Decompresses a complete zlib stream.
///
/// # Errors
///
/// Returns `Error::DecompressionFailed` if the stream is empty, corrupted,
/// or truncated.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(Error::DecompressionFailed);
    }
    miniz_oxide::inflate::decompress_to_vec_zlib(data).map_err(|_| Error::DecompressionFailed)
}

/// Decompresses a zlib stream embedded at the start of `data`, producing at
/// most `limit` bytes.
///
/// Pack entries are zlib streams followed by more pack data; the inflater
/// stops at the end of the stream and ignores whatever trails it. The limit
/// bounds memory for declared-size entries, so output longer than `limit`
/// is an error.
pub fn decompress_embedded(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(Error::DecompressionFailed);
    }
    miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(data, limit)
        .map_err(|_| Error::DecompressionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    // C-001: round trip
    #[test]
    fn test_round_trip() {
        let original: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
        let compressed = compress(&original);
        assert_eq!(decompress(&compressed).unwrap(), original);
    }

    // C-002: corrupted stream fails
    #[test]
    fn test_corrupted() {
        let mut compressed = compress(b"some reasonable input data");
        let mid = compressed.len() / 2;
        compressed[mid] ^= 0xFF;
        compressed[mid + 1] ^= 0xFF;
        assert!(matches!(
            decompress(&compressed),
            Err(Error::DecompressionFailed)
        ));
    }

    // C-003: empty input fails
    #[test]
    fn test_empty() {
        assert!(matches!(decompress(&[]), Err(Error::DecompressionFailed)));
    }

    // C-004: truncated stream fails
    #[test]
    fn test_truncated() {
        let compressed = compress(b"hello zlib world");
        assert!(matches!(
            decompress(&compressed[..3]),
            Err(Error::DecompressionFailed)
        ));
    }

    // C-005: embedded stream ignores trailing bytes
    #[test]
    fn test_embedded_trailing_data() {
        let mut data = compress(b"entry payload");
        data.extend_from_slice(b"NEXT PACK ENTRY BYTES");
        let out = decompress_embedded(&data, 64).unwrap();
        assert_eq!(out, b"entry payload");
    }

    // C-006: embedded stream over the limit fails
    #[test]
    fn test_embedded_over_limit() {
        let data = compress(&[7u8; 100]);
        assert!(matches!(
            decompress_embedded(&data, 50),
            Err(Error::DecompressionFailed)
        ));
    }
}
