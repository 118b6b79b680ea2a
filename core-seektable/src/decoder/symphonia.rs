//! # Symphonia Seek Indexer
//!
//! [`SeekIndexer`] implementation over a Symphonia format reader.
//!
//! Compressed frames are container packets of the selected track; a seek
//! point's `compressed_position` is the packet index and its `decoded_frame`
//! the packet timestamp in PCM frames.

use crate::error::{Result, SeekTableError};
use crate::traits::{FrameCounts, SeekIndexer, SeekPoint, SeekTable};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, info, warn};

/// Timestamp and duration of one packet, in PCM frames.
#[derive(Debug, Clone, Copy)]
struct PacketSpan {
    ts: u64,
    dur: u64,
}

/// Demuxer-level seek indexer backed by Symphonia.
///
/// Frame counting needs a full pass over the stream; the result is kept so
/// that seek-point calculation does not rescan.
pub struct SymphoniaIndexer {
    format_reader: Box<dyn FormatReader>,
    track_id: u32,
    packets: Option<Vec<PacketSpan>>,
    seek_table: SeekTable,
    source_info: String,
}

impl SymphoniaIndexer {
    /// Open a local audio file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            error!("Failed to open file {:?}: {}", path, e);
            SeekTableError::Io(e)
        })?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        Self::from_media_source(Box::new(file), hint, path.display().to_string())
    }

    /// Probe an arbitrary media source.
    pub fn from_media_source(
        source: Box<dyn MediaSource>,
        hint: Hint,
        source_info: impl Into<String>,
    ) -> Result<Self> {
        let source_info = source_info.into();
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed for {}: {}", source_info, e);
                SeekTableError::Decoder(format!("Failed to probe format: {}", e))
            })?;

        let format_reader = probed.format;
        let track_id = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .map(|t| t.id)
            .ok_or_else(|| {
                SeekTableError::Decoder("No supported audio tracks".to_string())
            })?;

        debug!(track_id, source = %source_info, "Selected track for indexing");

        Ok(Self {
            format_reader,
            track_id,
            packets: None,
            seek_table: Vec::new(),
            source_info,
        })
    }

    /// Table installed by the last successful [`bind_seek_points`](SeekIndexer::bind_seek_points).
    pub fn seek_table(&self) -> &[SeekPoint] {
        &self.seek_table
    }

    /// Reposition the reader at the bound seek point covering `frame`.
    ///
    /// The table picks the resume point: the reader is moved to the packet
    /// starting at that point's timestamp without any decode-ahead. Returns the
    /// decoded frame the reader resumes at; the caller drops
    /// `frame - returned` decoded frames to land exactly on `frame`.
    pub fn seek_to_frame(&mut self, frame: u64) -> Result<u64> {
        if self.seek_table.is_empty() {
            return Err(SeekTableError::Decoder("No seek table bound".to_string()));
        }

        let idx = self
            .seek_table
            .partition_point(|p| p.decoded_frame <= frame)
            .saturating_sub(1);
        let point = self.seek_table[idx];

        let seeked = self
            .format_reader
            .seek(
                SeekMode::Coarse,
                SeekTo::TimeStamp {
                    ts: point.decoded_frame,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| SeekTableError::Decoder(format!("Seek failed: {}", e)))?;

        debug!(
            frame,
            packet = point.compressed_position,
            resumed_at = seeked.actual_ts,
            "Seeked via bound table"
        );
        Ok(seeked.actual_ts)
    }

    fn scan(&mut self) -> Result<&[PacketSpan]> {
        if self.packets.is_none() {
            let mut spans = Vec::new();
            loop {
                match self.format_reader.next_packet() {
                    Ok(packet) => {
                        if packet.track_id() == self.track_id {
                            spans.push(PacketSpan {
                                ts: packet.ts(),
                                dur: packet.dur(),
                            });
                        }
                    }
                    Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                        break
                    }
                    Err(SymphoniaError::ResetRequired) => {
                        warn!("Track list changed while indexing, stopping scan");
                        break;
                    }
                    Err(e) => {
                        return Err(SeekTableError::Decoder(format!(
                            "Failed to read packet: {}",
                            e
                        )))
                    }
                }
            }

            self.rewind()?;
            info!(packets = spans.len(), source = %self.source_info, "Scanned stream");
            self.packets = Some(spans);
        }

        Ok(self.packets.as_deref().unwrap_or_default())
    }

    fn rewind(&mut self) -> Result<()> {
        self.format_reader
            .seek(
                SeekMode::Coarse,
                SeekTo::TimeStamp {
                    ts: 0,
                    track_id: self.track_id,
                },
            )
            .map(|_| ())
            .map_err(|e| SeekTableError::Decoder(format!("Failed to rewind after scan: {}", e)))
    }
}

impl SeekIndexer for SymphoniaIndexer {
    fn frame_counts(&mut self) -> Result<FrameCounts> {
        let packets = self.scan()?;
        Ok(FrameCounts {
            compressed: packets.len() as u64,
            decoded: packets.iter().map(|p| p.dur).sum(),
        })
    }

    fn calculate_seek_points(&mut self, max_points: usize) -> Result<Vec<SeekPoint>> {
        if max_points == 0 {
            return Ok(Vec::new());
        }

        let packets = self.scan()?;
        let stride = packets.len().div_ceil(max_points).max(1);

        Ok(packets
            .iter()
            .enumerate()
            .step_by(stride)
            .take(max_points)
            .map(|(index, span)| SeekPoint::new(index as u64, span.ts))
            .collect())
    }

    fn bind_seek_points(&mut self, points: &[SeekPoint]) -> Result<()> {
        if points.is_empty() {
            return Err(SeekTableError::BindRejected("empty seek table".to_string()));
        }

        if !points
            .windows(2)
            .all(|w| w[0].decoded_frame <= w[1].decoded_frame)
        {
            return Err(SeekTableError::BindRejected(
                "seek points are not ordered by decoded frame".to_string(),
            ));
        }

        self.seek_table = points.to_vec();
        Ok(())
    }
}
