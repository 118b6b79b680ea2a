//! Binary layout of the seek-table cache file.
//!
//! The file is two bincode values back to back, encoded with fixed-width
//! little-endian integers:
//!
//! ```text
//! identifier    String                               ("st-v3")
//! mappings      SeekTableFile {
//!                 seek_tables:  BTreeMap<Fingerprint, Vec<SeekPoint>>,
//!                 frame_counts: BTreeMap<Fingerprint, u64>,
//!               }
//! ```
//!
//! The identifier is decoded on its own so that a version mismatch can be
//! told apart from a body that does not decode. Every decode is limited to
//! the bytes actually present, and trailing bytes after the mappings make the
//! file malformed.

use crate::error::{Result, SeekTableError};
use crate::traits::{CacheEntry, Fingerprint, FrameCount, SeekTable};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Width of a bincode length prefix with fixed-int encoding.
const LENGTH_PREFIX_BYTES: usize = 8;

/// bincode settings shared by every read and write of the cache file.
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

/// Smallest file that can hold `identifier`.
pub fn min_file_size(identifier: &str) -> u64 {
    (LENGTH_PREFIX_BYTES + identifier.len()) as u64
}

/// Split a cache file image into its identifier and the undecoded body.
pub fn decode_identifier(image: &[u8]) -> Result<(String, &[u8])> {
    let mut body = image;
    let identifier: String = wire_options()
        .with_limit(image.len() as u64)
        .deserialize_from(&mut body)
        .map_err(|e| SeekTableError::Malformed(format!("identifier: {e}")))?;
    Ok((identifier, body))
}

/// In-memory image of a cache file: two mappings keyed by fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekTableFile {
    seek_tables: BTreeMap<Fingerprint, SeekTable>,
    frame_counts: BTreeMap<Fingerprint, FrameCount>,
}

/// Which half of an entry is absent for a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingHalf {
    SeekTable,
    FrameCount,
}

impl SeekTableFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fingerprints with a seek table.
    pub fn len(&self) -> usize {
        self.seek_tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seek_tables.is_empty() && self.frame_counts.is_empty()
    }

    /// Total seek points across all entries.
    pub fn seek_point_count(&self) -> usize {
        self.seek_tables.values().map(Vec::len).sum()
    }

    pub fn fingerprints(&self) -> impl Iterator<Item = Fingerprint> + '_ {
        self.seek_tables.keys().copied()
    }

    /// Insert or replace both halves of an entry.
    pub fn insert(&mut self, fingerprint: Fingerprint, entry: CacheEntry) {
        self.seek_tables.insert(fingerprint, entry.seek_table);
        self.frame_counts.insert(fingerprint, entry.frame_count);
    }

    /// Look up both halves of an entry; the seek table is checked first.
    pub fn lookup(&self, fingerprint: Fingerprint) -> std::result::Result<CacheEntry, MissingHalf> {
        let seek_table = self
            .seek_tables
            .get(&fingerprint)
            .ok_or(MissingHalf::SeekTable)?;
        let frame_count = self
            .frame_counts
            .get(&fingerprint)
            .ok_or(MissingHalf::FrameCount)?;

        Ok(CacheEntry {
            seek_table: seek_table.clone(),
            frame_count: *frame_count,
        })
    }

    /// Serialize the identifier followed by both mappings.
    pub fn encode(&self, identifier: &str) -> Result<Vec<u8>> {
        let capacity =
            wire_options().serialized_size(identifier)? + wire_options().serialized_size(self)?;
        let mut out = Vec::with_capacity(capacity as usize);

        wire_options().serialize_into(&mut out, identifier)?;
        wire_options().serialize_into(&mut out, self)?;
        Ok(out)
    }

    /// Decode the body that follows the identifier.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        wire_options()
            .with_limit(body.len() as u64)
            .reject_trailing_bytes()
            .deserialize(body)
            .map_err(|e| SeekTableError::Malformed(format!("mappings: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SeekPoint;

    fn entry(points: &[(u64, u64)], frame_count: u64) -> CacheEntry {
        CacheEntry {
            seek_table: points.iter().map(|&(c, d)| SeekPoint::new(c, d)).collect(),
            frame_count,
        }
    }

    fn decode(bytes: &[u8], identifier: &str) -> Result<SeekTableFile> {
        let (found, body) = decode_identifier(bytes)?;
        assert_eq!(found, identifier);
        SeekTableFile::decode_body(body)
    }

    #[test]
    fn test_layout_is_fixed_width_little_endian() {
        let mut file = SeekTableFile::new();
        file.insert(Fingerprint(0x0102), entry(&[(3, 4)], 5));
        let bytes = file.encode("st-v3").unwrap();

        assert_eq!(&bytes[..8], &5u64.to_le_bytes());
        assert_eq!(&bytes[8..13], b"st-v3");
        // one seek table entry
        assert_eq!(&bytes[13..21], &1u64.to_le_bytes());
        assert_eq!(&bytes[21..29], &0x0102u64.to_le_bytes());
        // identifier, map len, key, table len, one 20-byte point, map len, key, count
        assert_eq!(bytes.len(), 13 + 8 + 8 + 8 + 20 + 8 + 8 + 8);
    }

    #[test]
    fn test_encode_decode_preserves_entries() {
        let mut file = SeekTableFile::new();
        file.insert(Fingerprint(1), entry(&[(0, 0), (7, 8064)], 20_000));
        file.insert(
            Fingerprint(u64::MAX),
            CacheEntry {
                seek_table: vec![SeekPoint::new(417, 1152).with_discards(1, 576)],
                frame_count: 1152,
            },
        );

        let bytes = file.encode("st-v3").unwrap();
        let decoded = decode(&bytes, "st-v3").unwrap();
        assert_eq!(decoded, file);
        assert_eq!(decoded.seek_point_count(), 3);
    }

    #[test]
    fn test_identifier_decodes_without_body() {
        let bytes = SeekTableFile::new().encode("st-v2").unwrap();
        let (found, body) = decode_identifier(&bytes).unwrap();

        assert_eq!(found, "st-v2");
        assert_eq!(body.len(), bytes.len() - min_file_size("st-v2") as usize);
    }

    #[test]
    fn test_oversized_identifier_length_is_rejected() {
        let mut bytes = u64::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"st-v3");

        assert!(decode_identifier(&bytes).is_err());
    }

    #[test]
    fn test_truncated_body_is_malformed() {
        let mut file = SeekTableFile::new();
        file.insert(Fingerprint(9), entry(&[(1, 2), (3, 4)], 99));
        let bytes = file.encode("st-v3").unwrap();

        let err = decode(&bytes[..bytes.len() - 3], "st-v3").unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_trailing_bytes_are_malformed() {
        let mut bytes = SeekTableFile::new().encode("st-v3").unwrap();
        bytes.push(0);

        assert!(matches!(
            decode(&bytes, "st-v3"),
            Err(SeekTableError::Malformed(_))
        ));
    }

    #[test]
    fn test_huge_point_count_is_malformed() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u64.to_le_bytes());
        bytes.extend_from_slice(b"st-v3");
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());

        assert!(matches!(
            decode(&bytes, "st-v3"),
            Err(SeekTableError::Malformed(_))
        ));
    }

    #[test]
    fn test_lookup_reports_missing_half() {
        let mut file = SeekTableFile::new();
        file.insert(Fingerprint(1), entry(&[(0, 0)], 10));
        file.frame_counts.remove(&Fingerprint(1));

        assert_eq!(file.lookup(Fingerprint(2)), Err(MissingHalf::SeekTable));
        assert_eq!(file.lookup(Fingerprint(1)), Err(MissingHalf::FrameCount));
    }

    #[test]
    fn test_min_file_size() {
        assert_eq!(min_file_size("st-v3"), 13);
    }
}
