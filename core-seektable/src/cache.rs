//! # Seek-Table Cache
//!
//! Get-or-build entry point that ties fingerprinting, the on-disk store and
//! index generation together, then binds the resulting table to the decoder.
//!
//! ```text
//! populate()
//!   ├─> Fingerprinter::compute          (None → give up, no file I/O)
//!   ├─> SeekTableStore::load            (miss is not an error)
//!   ├─> IndexGenerator::generate        (only on miss; None → give up)
//!   └─> SeekIndexer::bind_seek_points   (rejection → give up)
//! ```
//!
//! `None` from [`SeekTableCache::populate`] means "no index"; the caller
//! decides whether to fall back to non-indexed seeking.

use crate::config::SeekTableConfig;
use crate::error::Result;
use crate::fingerprint::Fingerprinter;
use crate::generator::IndexGenerator;
use crate::store::{CacheLookup, SeekTableStore};
use crate::traits::{CacheEntry, Fingerprint, FrameCount, SeekIndexer, SeekTable};
use std::io::{Read, Seek};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Where a populated index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Loaded from the cache file.
    Cached,
    /// Computed by the decoder and written to the cache file.
    Generated,
}

/// An index that has been bound to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedIndex {
    pub fingerprint: Fingerprint,
    /// Total decoded frames in the stream.
    pub frame_count: FrameCount,
    pub seek_table: SeekTable,
    pub source: IndexSource,
}

/// Content-addressed seek-table cache backed by a single file.
#[derive(Debug, Clone)]
pub struct SeekTableCache {
    config: SeekTableConfig,
    fingerprinter: Fingerprinter,
    store: SeekTableStore,
    generator: IndexGenerator,
}

impl SeekTableCache {
    /// Create a cache using the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl Into<PathBuf>, config: SeekTableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(path.into(), config))
    }

    /// Create a cache with the default configuration.
    pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
        Self::from_valid_config(path.into(), SeekTableConfig::default())
    }

    fn from_valid_config(path: PathBuf, config: SeekTableConfig) -> Self {
        Self {
            fingerprinter: Fingerprinter::new(&config),
            store: SeekTableStore::new(path, &config),
            generator: IndexGenerator::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &SeekTableConfig {
        &self.config
    }

    pub fn store(&self) -> &SeekTableStore {
        &self.store
    }

    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    /// Load or build the index for `stream` and bind it to `indexer`.
    ///
    /// The stream's read position is unchanged on return.
    pub fn populate<S, I>(&self, stream: &mut S, indexer: &mut I) -> Option<PopulatedIndex>
    where
        S: Read + Seek + ?Sized,
        I: SeekIndexer + ?Sized,
    {
        let Some(fingerprint) = self.fingerprinter.compute(stream) else {
            warn!("Could not compute the fingerprint of the stream");
            return None;
        };

        self.populate_fingerprinted(fingerprint, indexer)
    }

    /// Same as [`populate`](Self::populate) for a stream whose byte length is
    /// already known.
    pub fn populate_with_length<S, I>(
        &self,
        stream: &mut S,
        length: i64,
        indexer: &mut I,
    ) -> Option<PopulatedIndex>
    where
        S: Read + Seek + ?Sized,
        I: SeekIndexer + ?Sized,
    {
        let Some(fingerprint) = self.fingerprinter.compute_with_length(stream, length) else {
            warn!(length, "Could not compute the fingerprint of the stream");
            return None;
        };

        self.populate_fingerprinted(fingerprint, indexer)
    }

    #[instrument(skip(self, indexer), fields(%fingerprint))]
    fn populate_fingerprinted<I>(
        &self,
        fingerprint: Fingerprint,
        indexer: &mut I,
    ) -> Option<PopulatedIndex>
    where
        I: SeekIndexer + ?Sized,
    {
        let (entry, source) = match self.store.load(fingerprint) {
            CacheLookup::Hit(entry) => (entry, IndexSource::Cached),
            CacheLookup::Miss { mut existing, .. } => {
                let Some(entry) =
                    self.generator
                        .generate(&self.store, fingerprint, &mut existing, indexer)
                else {
                    warn!("Could not load existing or generate new seek points for the stream");
                    return None;
                };
                (entry, IndexSource::Generated)
            }
        };

        let CacheEntry {
            seek_table,
            frame_count,
        } = entry;

        if let Err(e) = indexer.bind_seek_points(&seek_table) {
            warn!(error = %e, "Could not bind the seek points to the decoder");
            return None;
        }

        info!(
            ?source,
            seek_points = seek_table.len(),
            frame_count,
            "Seek table ready"
        );

        Some(PopulatedIndex {
            fingerprint,
            frame_count,
            seek_table,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeekTableError;
    use crate::traits::{FrameCounts, SeekPoint};
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingIndexer {
        bound: Option<Vec<SeekPoint>>,
        reject_bind: bool,
        scans: usize,
    }

    impl SeekIndexer for RecordingIndexer {
        fn frame_counts(&mut self) -> Result<FrameCounts> {
            self.scans += 1;
            Ok(FrameCounts {
                compressed: 70,
                decoded: 80_640,
            })
        }

        fn calculate_seek_points(&mut self, max_points: usize) -> Result<Vec<SeekPoint>> {
            Ok((0..max_points as u64)
                .map(|i| SeekPoint::new(i * 7, i * 8064))
                .collect())
        }

        fn bind_seek_points(&mut self, points: &[SeekPoint]) -> Result<()> {
            if self.reject_bind {
                return Err(SeekTableError::BindRejected("refused".into()));
            }
            self.bound = Some(points.to_vec());
            Ok(())
        }
    }

    fn audio(len: usize) -> Cursor<Vec<u8>> {
        Cursor::new((0..len).map(|i| (i % 251) as u8).collect())
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SeekTableConfig::new().with_frames_per_seek_point(0);
        assert!(SeekTableCache::new("unused.bin", config).is_err());
    }

    #[test]
    fn test_constructors_wire_config_through() {
        let defaults = SeekTableCache::with_defaults("a/seek-tables.bin");
        assert_eq!(defaults.config(), &SeekTableConfig::default());
        assert_eq!(defaults.store().identifier(), "st-v3");
        assert_eq!(defaults.store().path(), std::path::Path::new("a/seek-tables.bin"));

        let config = SeekTableConfig::new()
            .with_identifier("st-test")
            .with_frames_per_seek_point(3);
        let custom = SeekTableCache::new("b/seek-tables.bin", config.clone()).unwrap();
        assert_eq!(custom.config(), &config);
        assert_eq!(custom.store().identifier(), "st-test");
        assert_eq!(custom.generator.frames_per_seek_point(), 3);
    }

    #[test]
    fn test_generate_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeekTableCache::with_defaults(dir.path().join("seek-tables.bin"));
        let mut stream = audio(4096);

        let mut first = RecordingIndexer::default();
        let generated = cache.populate(&mut stream, &mut first).unwrap();
        assert_eq!(generated.source, IndexSource::Generated);
        assert_eq!(generated.frame_count, 80_640);
        assert_eq!(generated.seek_table.len(), 11);
        assert_eq!(first.bound.as_ref(), Some(&generated.seek_table));

        let mut second = RecordingIndexer::default();
        let cached = cache.populate(&mut stream, &mut second).unwrap();
        assert_eq!(cached.source, IndexSource::Cached);
        assert_eq!(cached.seek_table, generated.seek_table);
        assert_eq!(second.scans, 0);
        assert_eq!(second.bound, first.bound);
    }

    #[test]
    fn test_bind_rejection_fails_populate() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeekTableCache::with_defaults(dir.path().join("seek-tables.bin"));
        let mut indexer = RecordingIndexer {
            reject_bind: true,
            ..Default::default()
        };

        assert!(cache.populate(&mut audio(4096), &mut indexer).is_none());
        // The generated entry was still persisted.
        assert_eq!(cache.store().stats().unwrap().entries, 1);
    }
}
