//! # Stream Fingerprinting
//!
//! Derives the 64-bit cache key for an audio stream.
//!
//! The hash is seeded with the stream length and fed a window of at most
//! `fingerprint_window_bytes` taken from just before the middle of the stream.
//! Leading tag padding and trailing silence are poor discriminators between
//! tracks, so both ends are skipped.
//!
//! ```text
//! 0            start          length/2                     length
//! |--------------[== window ==]|-------------------------------|
//! ```
//!
//! The caller's read position is restored before returning, on success and on
//! failure alike.

use crate::config::SeekTableConfig;
use crate::error::{Result, SeekTableError};
use crate::traits::Fingerprint;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use tracing::{trace, warn};
use xxhash_rust::xxh64::Xxh64;

/// Computes content fingerprints for seekable streams.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    window_bytes: u64,
    chunk_bytes: usize,
}

impl Fingerprinter {
    pub fn new(config: &SeekTableConfig) -> Self {
        Self {
            window_bytes: config.fingerprint_window_bytes.max(1),
            chunk_bytes: config.fingerprint_chunk_bytes.max(1),
        }
    }

    /// Fingerprint a stream, measuring its length by seeking to the end.
    ///
    /// Returns `None` if the stream is empty or its length cannot be
    /// determined. The read position is left where it was found.
    pub fn compute<S>(&self, stream: &mut S) -> Option<Fingerprint>
    where
        S: Read + Seek + ?Sized,
    {
        let length = match measure_length(stream) {
            Ok(length) => length,
            Err(e) => {
                warn!(error = %e, "Could not determine stream length for fingerprint");
                return None;
            }
        };

        self.compute_with_length(stream, length)
    }

    /// Fingerprint a stream whose total byte length is already known.
    ///
    /// Returns `None` for a zero or negative length, or if the stream cannot
    /// be read.
    pub fn compute_with_length<S>(&self, stream: &mut S, length: i64) -> Option<Fingerprint>
    where
        S: Read + Seek + ?Sized,
    {
        if length <= 0 {
            warn!(length, "Stream length should be positive, cannot fingerprint");
            return None;
        }

        let original_pos = match stream.stream_position() {
            Ok(pos) => pos,
            Err(e) => {
                warn!(error = %e, "Could not read stream position");
                return None;
            }
        };

        let hashed = self.hash_window(stream, length as u64);

        if let Err(e) = stream.seek(SeekFrom::Start(original_pos)) {
            warn!(error = %e, original_pos, "Could not restore stream position after fingerprint");
            return None;
        }

        match hashed {
            Ok(fingerprint) => {
                trace!(%fingerprint, length, "Computed stream fingerprint");
                Some(fingerprint)
            }
            Err(e) => {
                warn!(error = %e, "Could not compute stream fingerprint");
                None
            }
        }
    }

    fn hash_window<S>(&self, stream: &mut S, length: u64) -> Result<Fingerprint>
    where
        S: Read + Seek + ?Sized,
    {
        let window = length.min(self.window_bytes);
        let start = (length / 2).saturating_sub(window);
        stream.seek(SeekFrom::Start(start))?;

        // Seeding with the length separates streams of different sizes that
        // happen to share the sampled bytes.
        let mut hasher = Xxh64::new(length);
        let mut buffer = vec![0u8; self.chunk_bytes];
        let mut total: u64 = 0;

        while total < window {
            let want = (window - total).min(buffer.len() as u64) as usize;
            let read = match stream.read(&mut buffer[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buffer[..read]);
            total += read as u64;
        }

        Ok(Fingerprint(hasher.digest()))
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(&SeekTableConfig::default())
    }
}

/// Measure a stream's byte length without moving its read position.
fn measure_length<S>(stream: &mut S) -> Result<i64>
where
    S: Seek + ?Sized,
{
    let original_pos = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0));
    stream.seek(SeekFrom::Start(original_pos))?;

    i64::try_from(end?).map_err(|_| SeekTableError::InvalidStreamLength(i64::MAX))
}
