//! # Seek-Table Cache
//!
//! Content-addressed, on-disk cache of seek tables for variable-bitrate audio.
//!
//! ## Overview
//!
//! Seeking in VBR streams needs a map from compressed-stream positions to
//! decoded positions. Building it means a full pass over the stream, so the
//! result is stored once per distinct content and reused on every later open:
//!
//! - [`Fingerprinter`] derives a 64-bit key from the stream length and a
//!   bounded sample of its bytes
//! - [`SeekTableStore`] loads and saves the versioned cache file
//! - [`IndexGenerator`] asks the decoder for a fresh table on a cache miss
//! - [`SeekTableCache`] runs the whole get-or-build flow and binds the table
//!   to the decoder
//!
//! The decoder is reached only through the [`SeekIndexer`] trait, so the
//! caching logic runs against fakes in tests. With the `symphonia` feature,
//! [`SymphoniaIndexer`] provides a real implementation.

pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod store;
pub mod traits;

pub use cache::{IndexSource, PopulatedIndex, SeekTableCache};
pub use config::SeekTableConfig;
#[cfg(feature = "symphonia")]
pub use decoder::SymphoniaIndexer;
pub use error::{Result, SeekTableError};
pub use fingerprint::Fingerprinter;
pub use generator::IndexGenerator;
pub use store::{CacheLookup, MissReason, SeekTableFile, SeekTableStore, StoreStats};
pub use traits::{
    CacheEntry, Fingerprint, FrameCount, FrameCounts, SeekIndexer, SeekPoint, SeekTable,
};
