//! # Decoder Capabilities
//!
//! Concrete [`SeekIndexer`](crate::traits::SeekIndexer) implementations.
//!
//! | Indexer | Feature | Compressed frame |
//! |---------|---------|------------------|
//! | `SymphoniaIndexer` | `symphonia` | container packet |
//!
//! ```rust,no_run
//! use core_seektable::{SeekTableCache, SymphoniaIndexer};
//! use std::fs::File;
//!
//! # fn example() -> core_seektable::Result<()> {
//! let cache = SeekTableCache::with_defaults("/tmp/seek-tables.bin");
//! let mut stream = File::open("/path/to/song.mp3")?;
//! let mut indexer = SymphoniaIndexer::open("/path/to/song.mp3")?;
//!
//! if let Some(index) = cache.populate(&mut stream, &mut indexer) {
//!     println!("{} frames, {} seek points", index.frame_count, index.seek_table.len());
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "symphonia")]
mod symphonia;

#[cfg(feature = "symphonia")]
pub use self::symphonia::SymphoniaIndexer;
