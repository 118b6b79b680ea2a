//! # Seek-Table Types & Decoder Capability
//!
//! Data types shared by the cache components and the narrow decoder contract
//! they consume.
//!
//! The cache never decodes audio itself. Anything that can count frames,
//! compute seek points and accept a precomputed table implements
//! [`SeekIndexer`]; tests use in-memory fakes, production code uses
//! `SymphoniaIndexer` (feature `symphonia`).
//!
//! The stream capability is plain [`std::io::Read`] + [`std::io::Seek`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Cache Key
// ============================================================================

/// Content-derived cache key for an audio stream.
///
/// Derived from the stream length and a bounded sample of its bytes, so it is
/// stable across runs and independent of file metadata. Every `u64` value is a
/// legitimate key; failure to fingerprint is reported as `None` by
/// [`Fingerprinter`](crate::fingerprint::Fingerprinter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for Fingerprint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// Index Types
// ============================================================================

/// Total decoded-frame count for a stream.
pub type FrameCount = u64;

/// One sample of the index, correlating a compressed-stream position with a
/// decoded-output position.
///
/// The meaning of `compressed_position` is decoder-defined (byte offset for
/// raw MP3 readers, packet index for demuxer-based readers). The discard
/// counts carry the state needed to resume bit-exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeekPoint {
    /// Position in the compressed stream.
    pub compressed_position: u64,
    /// First decoded frame produced when resuming at this point.
    pub decoded_frame: u64,
    /// Compressed frames to decode and throw away before output is exact.
    pub compressed_frames_to_discard: u16,
    /// Decoded frames to drop after resuming.
    pub decoded_frames_to_discard: u16,
}

impl SeekPoint {
    pub fn new(compressed_position: u64, decoded_frame: u64) -> Self {
        Self {
            compressed_position,
            decoded_frame,
            ..Default::default()
        }
    }

    pub fn with_discards(mut self, compressed: u16, decoded: u16) -> Self {
        self.compressed_frames_to_discard = compressed;
        self.decoded_frames_to_discard = decoded;
        self
    }
}

/// Ordered seek points sampled at a fixed compressed-frame interval.
pub type SeekTable = Vec<SeekPoint>;

/// Frame totals reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounts {
    /// Number of compressed frames (e.g. MP3 frames or container packets).
    pub compressed: u64,
    /// Number of decoded PCM frames.
    pub decoded: FrameCount,
}

/// A cached or freshly generated index for one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub seek_table: SeekTable,
    pub frame_count: FrameCount,
}

// ============================================================================
// Decoder Capability
// ============================================================================

/// Decoder operations the cache needs in order to build and bind an index.
pub trait SeekIndexer {
    /// Count compressed and decoded frames in the whole stream.
    fn frame_counts(&mut self) -> Result<FrameCounts>;

    /// Compute up to `max_points` seek points spread across the stream.
    ///
    /// Implementations may return fewer points than requested.
    fn calculate_seek_points(&mut self, max_points: usize) -> Result<Vec<SeekPoint>>;

    /// Install a precomputed table for subsequent seeks.
    fn bind_seek_points(&mut self, points: &[SeekPoint]) -> Result<()>;
}

impl<T: SeekIndexer + ?Sized> SeekIndexer for Box<T> {
    fn frame_counts(&mut self) -> Result<FrameCounts> {
        (**self).frame_counts()
    }

    fn calculate_seek_points(&mut self, max_points: usize) -> Result<Vec<SeekPoint>> {
        (**self).calculate_seek_points(max_points)
    }

    fn bind_seek_points(&mut self, points: &[SeekPoint]) -> Result<()> {
        (**self).bind_seek_points(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_display_is_fixed_width_hex() {
        assert_eq!(Fingerprint(0xABCD).to_string(), "000000000000abcd");
        assert_eq!(Fingerprint::from(7u64).as_u64(), 7);
    }

    #[test]
    fn test_seek_point_builder() {
        let point = SeekPoint::new(4096, 11_520).with_discards(1, 529);
        assert_eq!(point.compressed_position, 4096);
        assert_eq!(point.decoded_frame, 11_520);
        assert_eq!(point.compressed_frames_to_discard, 1);
        assert_eq!(point.decoded_frames_to_discard, 529);
    }
}
