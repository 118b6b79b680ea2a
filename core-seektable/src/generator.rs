//! # Index Generation
//!
//! Builds a fresh seek table through the decoder capability when the cache has
//! no entry for a stream, then persists it alongside every other entry
//! already in the cache file.

use crate::config::SeekTableConfig;
use crate::error::{Result, SeekTableError};
use crate::store::{SeekTableFile, SeekTableStore};
use crate::traits::{CacheEntry, Fingerprint, SeekIndexer};
use tracing::{debug, instrument, warn};

/// Computes seek tables at a fixed compressed-frame interval.
#[derive(Debug, Clone)]
pub struct IndexGenerator {
    frames_per_seek_point: u64,
}

impl IndexGenerator {
    pub fn new(config: &SeekTableConfig) -> Self {
        Self {
            frames_per_seek_point: config.frames_per_seek_point.max(1),
        }
    }

    pub fn frames_per_seek_point(&self) -> u64 {
        self.frames_per_seek_point
    }

    /// Number of seek points requested for a stream of `compressed_frames`.
    ///
    /// One point per interval plus one; the decoder may return fewer.
    pub fn requested_points(&self, compressed_frames: u64) -> u64 {
        compressed_frames.div_ceil(self.frames_per_seek_point) + 1
    }

    /// Ask the decoder for frame counts and seek points.
    ///
    /// Does not touch the cache file.
    pub fn build<I>(&self, indexer: &mut I) -> Result<CacheEntry>
    where
        I: SeekIndexer + ?Sized,
    {
        let counts = indexer.frame_counts()?;
        let interval = self.frames_per_seek_point;

        if counts.compressed < interval || counts.decoded < interval {
            return Err(SeekTableError::StreamTooShort {
                compressed: counts.compressed,
                decoded: counts.decoded,
                interval,
            });
        }

        let requested = usize::try_from(self.requested_points(counts.compressed)).map_err(|_| {
            SeekTableError::Decoder(format!(
                "too many compressed frames to index: {}",
                counts.compressed
            ))
        })?;

        let mut seek_table = indexer.calculate_seek_points(requested)?;
        if seek_table.is_empty() {
            return Err(SeekTableError::NoSeekPoints);
        }
        if seek_table.len() > requested {
            warn!(
                produced = seek_table.len(),
                requested, "Decoder produced more seek points than requested, truncating"
            );
            seek_table.truncate(requested);
        }

        debug!(
            compressed_frames = counts.compressed,
            decoded_frames = counts.decoded,
            requested,
            produced = seek_table.len(),
            "Calculated seek points"
        );

        Ok(CacheEntry {
            seek_table,
            frame_count: counts.decoded,
        })
    }

    /// Build an entry for `fingerprint`, add it to `existing` and rewrite the
    /// cache file.
    ///
    /// Returns `None` if the decoder cannot produce a usable index; the cache
    /// file is not touched in that case. A failed write is logged but the
    /// in-memory entry is still returned, since it is valid for this session.
    #[instrument(skip(self, store, existing, indexer), fields(%fingerprint))]
    pub fn generate<I>(
        &self,
        store: &SeekTableStore,
        fingerprint: Fingerprint,
        existing: &mut SeekTableFile,
        indexer: &mut I,
    ) -> Option<CacheEntry>
    where
        I: SeekIndexer + ?Sized,
    {
        let entry = match self.build(indexer) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Could not generate seek points for stream");
                return None;
            }
        };

        existing.insert(fingerprint, entry.clone());
        if let Err(e) = store.save(existing) {
            warn!(error = %e, "Could not write seek table cache");
        }

        Some(entry)
    }
}

impl Default for IndexGenerator {
    fn default() -> Self {
        Self::new(&SeekTableConfig::default())
    }
}
