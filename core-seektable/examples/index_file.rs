//! Seek-table cache demonstration
//!
//! Indexes an audio file through the cache, then runs it again to show the
//! cached path.
//!
//! Run with:
//! ```bash
//! cargo run -p core-seektable --example index_file -- song.mp3
//!
//! # Custom cache location and seek target (in PCM frames)
//! cargo run -p core-seektable --example index_file -- song.mp3 /tmp/seek-tables.bin 441000
//!
//! # More detail
//! RUST_LOG=core_seektable=debug cargo run -p core-seektable --example index_file -- song.mp3
//! ```

use anyhow::{bail, Context};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_seektable::{SeekTableCache, SymphoniaIndexer};
use std::env;
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(audio_path) = args.get(1).map(PathBuf::from) else {
        bail!("usage: index_file <audio file> [cache file] [seek frame]");
    };
    let cache_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("seek-tables.bin"));
    let target: Option<u64> = args
        .get(3)
        .map(|s| s.parse())
        .transpose()
        .context("seek frame must be an integer")?;

    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    let cache = SeekTableCache::with_defaults(&cache_path);
    info!(cache = %cache_path.display(), "Using seek table cache");

    for pass in 1..=2 {
        let mut stream = File::open(&audio_path)
            .with_context(|| format!("opening {}", audio_path.display()))?;
        let mut indexer = SymphoniaIndexer::open(&audio_path)?;

        let Some(index) = cache.populate(&mut stream, &mut indexer) else {
            bail!("no seek index could be built for {}", audio_path.display());
        };

        println!(
            "pass {pass}: {:?} index, fingerprint {}, {} seek points, {} frames",
            index.source,
            index.fingerprint,
            index.seek_table.len(),
            index.frame_count
        );

        if let Some(frame) = target {
            let resumed = indexer.seek_to_frame(frame)?;
            println!(
                "  seek to {frame}: resumed at {resumed}, discard {} frames",
                frame.saturating_sub(resumed)
            );
        }
    }

    if let Some(stats) = cache.store().stats() {
        println!(
            "cache holds {} entries, {} seek points, {} bytes",
            stats.entries, stats.seek_points, stats.file_bytes
        );
    }

    Ok(())
}
