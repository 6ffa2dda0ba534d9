use super::ctts::{build_composition_offsets, parse_ctts, CttsEntry};
use super::mdhd::parse_mdhd;
use super::r#box::{find_box, parse_box_header};
use super::stco::parse_stco_or_co64;
use super::stsc::{parse_stsc, SampleToChunkEntry};
use super::stsd::{extract_codec_config, CodecConfig};
use super::stss::parse_stss;
use super::stts::{build_sample_dts, parse_stts, SttsEntry};
use super::stsz::parse_stsz;
use crate::errors::{ClipError, ClipResult, Mp4Error};
use crate::index::Sample;
use log::debug;

/// Media kind of a track, from its hdlr handler type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

/// Sample tables of one track, kept only long enough to expand them into
/// per-sample index entries.
#[derive(Debug)]
pub struct SampleTables {
    pub stts: Vec<SttsEntry>,
    pub ctts: Option<Vec<CttsEntry>>,
    pub sync_samples: Option<Vec<u32>>,
    pub sample_sizes: Vec<u32>,
    pub sample_to_chunk: Vec<SampleToChunkEntry>,
    pub chunk_offsets: Vec<u64>,
}

/// Track-level metadata parsed from one trak box.
#[derive(Debug)]
pub struct TrackInfo {
    pub id: u32,
    pub kind: TrackKind,
    pub timescale: u32,
    /// Duration in timescale ticks.
    pub duration: u64,
    /// Present for video tracks with a recognized codec configuration box.
    pub codec_config: Option<CodecConfig>,
    pub tables: SampleTables,
}

impl TrackInfo {
    pub fn duration_micros(&self) -> u64 {
        if self.timescale == 0 {
            return 0;
        }
        self.duration * 1_000_000 / self.timescale as u64
    }

    /// Expand the sample tables into index entries, in increasing dts order.
    /// Offsets are derived by walking the sample-to-chunk groups forward.
    pub fn build_samples(&self) -> ClipResult<Vec<Sample>> {
        let tables = &self.tables;
        let sample_count = tables.sample_sizes.len();
        let timing = build_sample_dts(&tables.stts);
        if timing.len() != sample_count {
            return Err(ClipError::Mp4(Mp4Error::new(format!(
                "stts describes {} samples but stsz has {}",
                timing.len(),
                sample_count
            ))));
        }

        let composition_offsets = tables
            .ctts
            .as_ref()
            .map(|entries| build_composition_offsets(entries, sample_count));

        let mut samples = Vec::with_capacity(sample_count);
        let mut sample_number = 0usize;

        for (group, entry) in tables.sample_to_chunk.iter().enumerate() {
            let next_first_chunk = tables
                .sample_to_chunk
                .get(group + 1)
                .map(|e| e.first_chunk)
                .unwrap_or(tables.chunk_offsets.len() as u32 + 1);

            for chunk in entry.first_chunk..next_first_chunk {
                let chunk_offset =
                    *tables.chunk_offsets.get(chunk as usize - 1).ok_or_else(|| {
                        ClipError::Mp4(Mp4Error::new(format!(
                            "stsc references chunk {} but stco has {} entries",
                            chunk,
                            tables.chunk_offsets.len()
                        )))
                    })?;

                let mut offset_in_chunk = 0u64;
                for _ in 0..entry.samples_per_chunk {
                    if sample_number >= sample_count {
                        break;
                    }
                    let size = tables.sample_sizes[sample_number];
                    let (dts, duration) = timing[sample_number];
                    let cts_offset = composition_offsets
                        .as_ref()
                        .map(|offsets| offsets[sample_number])
                        .unwrap_or(0);
                    let is_sync = match &tables.sync_samples {
                        // stss sample numbers are 1-based
                        Some(sync) => sync.contains(&(sample_number as u32 + 1)),
                        None => true,
                    };

                    samples.push(Sample {
                        track_id: self.id,
                        offset: chunk_offset + offset_in_chunk,
                        size,
                        duration,
                        dts,
                        cts: dts as i64 + cts_offset,
                        is_sync,
                        timescale: self.timescale,
                        data: None,
                    });

                    offset_in_chunk += size as u64;
                    sample_number += 1;
                }
            }
        }

        if sample_number != sample_count {
            return Err(ClipError::Mp4(Mp4Error::new(format!(
                "chunk layout covers {} of {} samples",
                sample_number, sample_count
            ))));
        }

        Ok(samples)
    }
}

/// Movie-level metadata: all tracks of the container.
#[derive(Debug)]
pub struct MovieInfo {
    pub tracks: Vec<TrackInfo>,
}

impl MovieInfo {
    /// The first video track, which drives thumbnail extraction.
    pub fn primary_video_track(&self) -> Option<&TrackInfo> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }
}

/// Parse the moov payload into per-track metadata and sample tables.
pub fn parse_movie(moov_payload: &[u8]) -> ClipResult<MovieInfo> {
    let mut tracks = Vec::new();
    let mut pos = 0usize;

    while pos + 8 <= moov_payload.len() {
        let start = pos;
        let Some((name, size)) = parse_box_header(moov_payload, &mut pos) else {
            break;
        };
        if size < 8 || size as usize > moov_payload.len() - start {
            break;
        }
        let payload = &moov_payload[pos..start + size as usize];

        if name == "trak" {
            match parse_trak(payload) {
                Ok(track) => tracks.push(track),
                Err(e) => debug!("Skipping unparseable trak box: {}", e),
            }
        }

        pos = start + size as usize;
    }

    if tracks.is_empty() {
        return Err(ClipError::Mp4(Mp4Error::new("moov contains no usable trak box")));
    }

    Ok(MovieInfo { tracks })
}

fn parse_trak(trak: &[u8]) -> ClipResult<TrackInfo> {
    let tkhd = find_box(trak, "tkhd")
        .ok_or_else(|| ClipError::Mp4(Mp4Error::new("No tkhd box in trak")))?;
    let id = parse_track_id(tkhd)?;

    let mdia = find_box(trak, "mdia")
        .ok_or_else(|| ClipError::Mp4(Mp4Error::new("No mdia box in trak")))?;
    let mdhd = find_box(mdia, "mdhd")
        .ok_or_else(|| ClipError::Mp4(Mp4Error::new("No mdhd box in mdia")))?;
    let (timescale, duration) = parse_mdhd(mdhd)?;

    let kind = match find_box(mdia, "hdlr") {
        Some(hdlr) if hdlr.len() >= 12 && &hdlr[8..12] == b"vide" => TrackKind::Video,
        Some(hdlr) if hdlr.len() >= 12 && &hdlr[8..12] == b"soun" => TrackKind::Audio,
        _ => TrackKind::Other,
    };

    let minf = find_box(mdia, "minf")
        .ok_or_else(|| ClipError::Mp4(Mp4Error::new("No minf box in mdia")))?;
    let stbl = find_box(minf, "stbl")
        .ok_or_else(|| ClipError::Mp4(Mp4Error::new("No stbl box in minf")))?;

    let tables = SampleTables {
        stts: parse_stts(stbl)?,
        ctts: parse_ctts(stbl)?,
        sync_samples: parse_stss(stbl),
        sample_sizes: parse_stsz(stbl)?,
        sample_to_chunk: parse_stsc(stbl)?,
        chunk_offsets: parse_stco_or_co64(stbl)?,
    };

    let codec_config = if kind == TrackKind::Video {
        match find_box(stbl, "stsd").map(extract_codec_config) {
            Some(Ok(config)) => Some(config),
            Some(Err(e)) => {
                debug!("Video track {} has no usable codec configuration: {}", id, e);
                None
            }
            None => None,
        }
    } else {
        None
    };

    Ok(TrackInfo {
        id,
        kind,
        timescale,
        duration,
        codec_config,
        tables,
    })
}

/// Read the track id from a tkhd payload.
fn parse_track_id(tkhd: &[u8]) -> ClipResult<u32> {
    let pos = if tkhd.first() == Some(&1) { 20 } else { 12 };
    if pos + 4 > tkhd.len() {
        return Err(ClipError::Mp4(Mp4Error::new("tkhd box too small")));
    }
    Ok(u32::from_be_bytes([
        tkhd[pos],
        tkhd[pos + 1],
        tkhd[pos + 2],
        tkhd[pos + 3],
    ]))
}
