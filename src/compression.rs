// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Payload compression for large entries.
//!
//! Uses zstd with magic-bytes detection, so readers decompress based on the
//! bytes themselves and plain payloads pass through untouched.

/// Zstd magic bytes (little-endian): 0xFD2FB528
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default compression level (3 is a good balance of speed/ratio)
const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Compression error types
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// Failed to compress data
    #[error("compression failed: {0}")]
    CompressFailed(String),

    /// Failed to decompress data
    #[error("decompression failed: {0}")]
    DecompressFailed(String),

    /// Failed to encode or parse JSON
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Check if data is zstd-compressed by checking magic bytes.
#[inline]
#[must_use]
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZSTD_MAGIC
}

/// Compress bytes at the default level.
pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    zstd::encode_all(data, DEFAULT_COMPRESSION_LEVEL)
        .map_err(|e| CompressionError::CompressFailed(e.to_string()))
}

/// Decompress bytes directly.
///
/// Returns original bytes if not compressed.
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if is_compressed(data) {
        zstd::decode_all(data)
            .map_err(|e| CompressionError::DecompressFailed(e.to_string()))
    } else {
        Ok(data.to_vec())
    }
}
