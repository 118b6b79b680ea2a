//! # Seek-Table Configuration
//!
//! Tunables for fingerprinting, seek-point sampling and the on-disk format gate.

use crate::error::{Result, SeekTableError};
use serde::{Deserialize, Serialize};

/// Format identifier written at the head of every cache file.
pub const DEFAULT_IDENTIFIER: &str = "st-v3";

/// Compressed frames between consecutive seek points.
pub const DEFAULT_FRAMES_PER_SEEK_POINT: u64 = 7;

/// Seek-table cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekTableConfig {
    /// Exact-match version gate for cache files.
    ///
    /// Files carrying any other identifier are ignored on load and replaced on
    /// the next save.
    ///
    /// Default: `"st-v3"`.
    #[serde(default = "default_identifier")]
    pub identifier: String,

    /// Number of compressed frames between seek points.
    ///
    /// Smaller values give faster seeks on slow hardware at the cost of a
    /// larger table.
    ///
    /// Default: 7.
    #[serde(default = "default_frames_per_seek_point")]
    pub frames_per_seek_point: u64,

    /// Upper bound on the number of bytes hashed into a fingerprint.
    ///
    /// Default: 32 KiB.
    #[serde(default = "default_fingerprint_window_bytes")]
    pub fingerprint_window_bytes: u64,

    /// Read buffer size used while fingerprinting.
    ///
    /// Default: 1 KiB.
    #[serde(default = "default_fingerprint_chunk_bytes")]
    pub fingerprint_chunk_bytes: usize,
}

impl Default for SeekTableConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            frames_per_seek_point: default_frames_per_seek_point(),
            fingerprint_window_bytes: default_fingerprint_window_bytes(),
            fingerprint_chunk_bytes: default_fingerprint_chunk_bytes(),
        }
    }
}

impl SeekTableConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the format identifier.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Set the sampling interval.
    pub fn with_frames_per_seek_point(mut self, frames: u64) -> Self {
        self.frames_per_seek_point = frames;
        self
    }

    /// Set the fingerprint sampling window.
    pub fn with_fingerprint_window(mut self, bytes: u64) -> Self {
        self.fingerprint_window_bytes = bytes;
        self
    }

    /// Set the fingerprint read chunk size.
    pub fn with_fingerprint_chunk(mut self, bytes: usize) -> Self {
        self.fingerprint_chunk_bytes = bytes;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.identifier.is_empty() {
            return Err(SeekTableError::InvalidConfig(
                "identifier cannot be empty".to_string(),
            ));
        }

        if self.identifier.len() > u32::MAX as usize {
            return Err(SeekTableError::InvalidConfig(
                "identifier is too long".to_string(),
            ));
        }

        if self.frames_per_seek_point == 0 {
            return Err(SeekTableError::InvalidConfig(
                "frames_per_seek_point must be > 0".to_string(),
            ));
        }

        if self.fingerprint_window_bytes == 0 {
            return Err(SeekTableError::InvalidConfig(
                "fingerprint_window_bytes must be > 0".to_string(),
            ));
        }

        if self.fingerprint_chunk_bytes == 0 {
            return Err(SeekTableError::InvalidConfig(
                "fingerprint_chunk_bytes must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_identifier() -> String {
    DEFAULT_IDENTIFIER.to_string()
}

fn default_frames_per_seek_point() -> u64 {
    DEFAULT_FRAMES_PER_SEEK_POINT
}

fn default_fingerprint_window_bytes() -> u64 {
    32 * 1024
}

fn default_fingerprint_chunk_bytes() -> usize {
    1024
}
