//! # Map Engine Errors

use mercator_core::RegionCoord;
use thiserror::Error;

/// Errors from tile persistence and the packed tile codec.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend I/O failed for one region.
    #[error("tile store io failed for region {region}: {source}")]
    Io {
        /// Region whose tile was being read or written.
        region: RegionCoord,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Packed tile was shorter than its fixed header.
    #[error("packed tile truncated")]
    Truncated,

    /// Packed tile carried an unknown format version.
    #[error("packed tile version {found} unsupported (expected {expected})")]
    UnsupportedVersion {
        /// Version byte found in the data.
        found: u8,
        /// Version this build writes.
        expected: u8,
    },

    /// Decompressed payload had the wrong length.
    #[error("packed tile payload was {found} bytes, expected {expected}")]
    PayloadLength {
        /// Length after decompression.
        found: usize,
        /// Required payload length.
        expected: usize,
    },

    /// LZ4 block failed to decompress.
    #[error("packed tile decompression failed: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
