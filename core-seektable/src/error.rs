//! # Seek-Table Error Types
//!
//! Errors raised inside the seek-table cache components. None of these escape
//! the public component boundary: each component logs the failure and reports
//! an absent result instead.

use thiserror::Error;

/// Errors that can occur while fingerprinting, loading, generating or binding
/// seek tables.
#[derive(Error, Debug)]
pub enum SeekTableError {
    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// Underlying stream or cache file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Atomic replacement of the cache file failed.
    #[error("Failed to persist cache file: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Cache file image could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    // ========================================================================
    // Format Errors
    // ========================================================================
    /// Cache file is too small to hold the format identifier.
    #[error("Cache file too small: {size} bytes, need at least {required}")]
    FileTooSmall { size: u64, required: u64 },

    /// Cache file was written by a different format version.
    #[error("Identifier mismatch: expected {expected:?}, found {found:?}")]
    IdentifierMismatch { expected: String, found: String },

    /// Cache file body could not be decoded.
    #[error("Malformed cache file: {0}")]
    Malformed(String),

    // ========================================================================
    // Stream Errors
    // ========================================================================
    /// Stream length is zero, negative or could not be measured.
    #[error("Invalid stream length: {0}")]
    InvalidStreamLength(i64),

    // ========================================================================
    // Decoder Errors
    // ========================================================================
    /// Decoder capability call failed.
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Stream has fewer frames than one sampling interval.
    #[error("Stream too short for indexed seeking: {compressed} compressed / {decoded} decoded frames, interval {interval}")]
    StreamTooShort {
        compressed: u64,
        decoded: u64,
        interval: u64,
    },

    /// Decoder produced no seek points.
    #[error("Decoder produced no seek points")]
    NoSeekPoints,

    /// Decoder refused to bind the seek table.
    #[error("Seek table rejected by decoder: {0}")]
    BindRejected(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SeekTableError {
    /// Returns `true` if the cache file exists but cannot be trusted.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            SeekTableError::FileTooSmall { .. }
                | SeekTableError::IdentifierMismatch { .. }
                | SeekTableError::Malformed(_)
        )
    }

    /// Returns `true` if the decoder capability failed or produced unusable data.
    pub fn is_decoder_error(&self) -> bool {
        matches!(
            self,
            SeekTableError::Decoder(_)
                | SeekTableError::StreamTooShort { .. }
                | SeekTableError::NoSeekPoints
                | SeekTableError::BindRejected(_)
        )
    }
}

/// Result type for seek-table operations.
pub type Result<T> = std::result::Result<T, SeekTableError>;
