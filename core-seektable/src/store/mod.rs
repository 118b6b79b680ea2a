//! # Seek-Table Store
//!
//! Loads and saves the versioned on-disk table that maps fingerprints to seek
//! tables and frame counts. One file may hold entries for many streams.
//!
//! ## Load pipeline
//!
//! A load runs an ordered chain of checks; the first failing stage ends the
//! load with a [`MissReason`] and no data mutation:
//!
//! 1. file exists and can be stat'ed
//! 2. file is large enough to hold the format identifier
//! 3. identifier matches the configured one exactly
//! 4. both mappings decode
//! 5. fingerprint present in the seek-table mapping
//! 6. fingerprint present in the frame-count mapping
//!
//! A missing file is an ordinary cold cache and is not logged.
//!
//! ## Saves
//!
//! Every save rewrites the whole file: the identifier followed by both full
//! mappings. The new image is written to a temporary file in the same
//! directory and renamed over the target, so readers never observe a partial
//! file. There is no locking; with concurrent writers the last rename wins.

mod codec;

pub use codec::{decode_identifier, min_file_size, MissingHalf, SeekTableFile};

use crate::config::SeekTableConfig;
use crate::error::{Result, SeekTableError};
use crate::traits::{CacheEntry, Fingerprint};
use core_runtime::logging::strip_path;
use std::fs::{self, Metadata, Permissions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

/// Why a load did not produce an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No cache file at the configured path.
    FileMissing,
    /// The file exists but could not be stat'ed or read.
    Unreadable,
    /// The file cannot even hold the format identifier.
    TooSmall,
    /// The file was written with a different identifier.
    IdentifierMismatch,
    /// The mappings after the identifier do not decode.
    Malformed,
    /// Valid file, no seek table for this fingerprint.
    NoSeekTable,
    /// Valid file, no frame count for this fingerprint.
    NoFrameCount,
}

impl MissReason {
    /// Returns `true` when the file itself is unusable, as opposed to a
    /// well-formed file that lacks this fingerprint.
    pub fn invalidates_file(&self) -> bool {
        !matches!(
            self,
            MissReason::NoSeekTable | MissReason::NoFrameCount
        )
    }
}

/// Outcome of [`SeekTableStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    Miss {
        reason: MissReason,
        /// Mappings read from disk, empty unless the file passed stage 4.
        /// New entries are added here before saving so other streams'
        /// entries survive the rewrite.
        existing: SeekTableFile,
    },
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    fn miss(reason: MissReason) -> Self {
        CacheLookup::Miss {
            reason,
            existing: SeekTableFile::new(),
        }
    }
}

/// Summary of a cache file's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub entries: usize,
    pub seek_points: usize,
    pub file_bytes: u64,
}

/// File-backed seek-table store.
#[derive(Debug, Clone)]
pub struct SeekTableStore {
    path: PathBuf,
    identifier: String,
}

impl SeekTableStore {
    pub fn new(path: impl Into<PathBuf>, config: &SeekTableConfig) -> Self {
        Self {
            path: path.into(),
            identifier: config.identifier.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Look up the entry for `fingerprint`.
    ///
    /// Never fails: every problem with the file is reported as a miss.
    #[instrument(skip(self, fingerprint), fields(cache = %self.file_name(), %fingerprint))]
    pub fn load(&self, fingerprint: Fingerprint) -> CacheLookup {
        let existing = match self.read_file() {
            Ok(file) => file,
            Err(reason) => return CacheLookup::miss(reason),
        };

        match existing.lookup(fingerprint) {
            Ok(entry) => {
                debug!(
                    seek_points = entry.seek_table.len(),
                    frame_count = entry.frame_count,
                    "Seek table cache hit"
                );
                CacheLookup::Hit(entry)
            }
            Err(missing) => {
                let reason = match missing {
                    MissingHalf::SeekTable => MissReason::NoSeekTable,
                    MissingHalf::FrameCount => MissReason::NoFrameCount,
                };
                debug!(?reason, entries = existing.len(), "Seek table cache miss");
                CacheLookup::Miss { reason, existing }
            }
        }
    }

    /// Read and validate the whole file (stages 1 to 4).
    pub fn read_file(&self) -> std::result::Result<SeekTableFile, MissReason> {
        let metadata = self.stat()?;
        self.check_size(&metadata)?;
        let image = self.read_image()?;
        let body = self.check_identifier(&image)?;
        self.decode_mappings(body)
    }

    /// Replace the cache file with `file`.
    #[instrument(skip(self, file), fields(cache = %self.file_name(), entries = file.len()))]
    pub fn save(&self, file: &SeekTableFile) -> Result<()> {
        let image = file.encode(&self.identifier)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&image)?;
        if let Some(permissions) = replacement_permissions(&self.path) {
            tmp.as_file().set_permissions(permissions)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        debug!(bytes = image.len(), "Seek table cache written");
        Ok(())
    }

    /// Entry and point counts, or `None` if the file does not validate.
    pub fn stats(&self) -> Option<StoreStats> {
        let file = self.read_file().ok()?;
        let file_bytes = fs::metadata(&self.path).ok()?.len();
        Some(StoreStats {
            entries: file.len(),
            seek_points: file.seek_point_count(),
            file_bytes,
        })
    }

    // ------------------------------------------------------------------------
    // Validation stages
    // ------------------------------------------------------------------------

    fn stat(&self) -> std::result::Result<Metadata, MissReason> {
        match fs::metadata(&self.path) {
            Ok(metadata) if metadata.is_file() => Ok(metadata),
            Ok(_) => {
                warn!("Seek table cache path is not a regular file");
                Err(MissReason::Unreadable)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(MissReason::FileMissing),
            Err(e) => {
                warn!(error = %e, "Could not stat seek table cache");
                Err(MissReason::Unreadable)
            }
        }
    }

    fn check_size(&self, metadata: &Metadata) -> std::result::Result<(), MissReason> {
        let required = min_file_size(&self.identifier);
        if metadata.len() < required {
            let err = SeekTableError::FileTooSmall {
                size: metadata.len(),
                required,
            };
            warn!(error = %err, "Ignoring seek table cache");
            return Err(MissReason::TooSmall);
        }
        Ok(())
    }

    fn read_image(&self) -> std::result::Result<Vec<u8>, MissReason> {
        fs::read(&self.path).map_err(|e| {
            warn!(error = %e, "Could not read seek table cache");
            MissReason::Unreadable
        })
    }

    fn check_identifier<'a>(&self, image: &'a [u8]) -> std::result::Result<&'a [u8], MissReason> {
        match decode_identifier(image) {
            Ok((found, body)) if found == self.identifier => Ok(body),
            Ok((found, _)) => {
                let err = SeekTableError::IdentifierMismatch {
                    expected: self.identifier.clone(),
                    found,
                };
                warn!(error = %err, "Ignoring seek table cache");
                Err(MissReason::IdentifierMismatch)
            }
            Err(e) => {
                warn!(error = %e, "Could not read seek table cache identifier");
                Err(MissReason::IdentifierMismatch)
            }
        }
    }

    fn decode_mappings(&self, body: &[u8]) -> std::result::Result<SeekTableFile, MissReason> {
        SeekTableFile::decode_body(body).map_err(|e| {
            warn!(error = %e, "Seek table cache is malformed, ignoring file");
            MissReason::Malformed
        })
    }

    fn file_name(&self) -> String {
        strip_path(&self.path.to_string_lossy()).to_string()
    }
}

/// Permissions for the file that replaces `path`: those of the current file,
/// or a world-readable default for a new one. Temp files start out owner-only.
fn replacement_permissions(path: &Path) -> Option<Permissions> {
    match fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SeekPoint;

    fn entry(frame_count: u64) -> CacheEntry {
        CacheEntry {
            seek_table: vec![SeekPoint::new(0, 0), SeekPoint::new(7, 8064)],
            frame_count,
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> SeekTableStore {
        SeekTableStore::new(dir.path().join("seek-tables.bin"), &SeekTableConfig::default())
    }

    #[test]
    fn test_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(
            store.load(Fingerprint(1)),
            CacheLookup::Miss {
                reason: MissReason::FileMissing,
                existing: SeekTableFile::new(),
            }
        );
    }

    #[test]
    fn test_save_then_load_hits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut file = SeekTableFile::new();
        file.insert(Fingerprint(42), entry(20_000));
        store.save(&file).unwrap();

        assert_eq!(store.load(Fingerprint(42)), CacheLookup::Hit(entry(20_000)));
    }

    #[test]
    fn test_unknown_fingerprint_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut file = SeekTableFile::new();
        file.insert(Fingerprint(42), entry(20_000));
        store.save(&file).unwrap();

        match store.load(Fingerprint(43)) {
            CacheLookup::Miss { reason, existing } => {
                assert_eq!(reason, MissReason::NoSeekTable);
                assert!(!reason.invalidates_file());
                assert_eq!(existing, file);
            }
            hit => panic!("expected miss, got {hit:?}"),
        }
    }

    #[test]
    fn test_too_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), [5u8, 0, 0]).unwrap();

        assert_eq!(
            store.load(Fingerprint(1)),
            CacheLookup::Miss {
                reason: MissReason::TooSmall,
                existing: SeekTableFile::new(),
            }
        );
    }

    #[test]
    fn test_directory_path_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeekTableStore::new(dir.path(), &SeekTableConfig::default());

        assert!(matches!(
            store.load(Fingerprint(1)),
            CacheLookup::Miss {
                reason: MissReason::Unreadable,
                ..
            }
        ));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache").join("seek-tables.bin");
        let store = SeekTableStore::new(&path, &SeekTableConfig::default());

        store.save(&SeekTableFile::new()).unwrap();
        assert!(path.is_file());
        assert_eq!(store.read_file(), Ok(SeekTableFile::new()));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_sets_cache_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mode = || fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;

        store.save(&SeekTableFile::new()).unwrap();
        assert_eq!(mode(), 0o644);

        fs::set_permissions(store.path(), Permissions::from_mode(0o640)).unwrap();
        store.save(&SeekTableFile::new()).unwrap();
        assert_eq!(mode(), 0o640);
    }

    #[test]
    fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.stats().is_none());

        let mut file = SeekTableFile::new();
        file.insert(Fingerprint(1), entry(100));
        file.insert(Fingerprint(2), entry(200));
        store.save(&file).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.seek_points, 4);
        assert_eq!(stats.file_bytes, fs::metadata(store.path()).unwrap().len());
    }
}
