use super::decode::DecodePipeline;
use super::transcode::TranscodePipeline;
use super::types::{normalize_request, NormalizedRequest, Thumbnail, ThumbnailRequest};
use crate::errors::{ClipResult, ConfigurationError, NotFoundError};
use crate::index::{Sample, SampleIndex};
use crate::mp4::{CodecConfig, Mp4Demuxer, TrackKind};
use crate::streams::{LocalSeekableStream, SeekableStream};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Common surface of the extraction backends.
#[async_trait]
pub trait ThumbnailExtractor: Send {
    /// Extract the frames selected by the request, ordered by presentation
    /// time.
    async fn thumbnails(&mut self, request: &ThumbnailRequest) -> ClipResult<Vec<Thumbnail>>;

    /// Extract the single frame displayed at `time_micros`.
    async fn seek(&mut self, time_micros: u64) -> ClipResult<Thumbnail>;
}

/// Open the backend appropriate for the source: in-process decoding when
/// the primary video track is H.264, otherwise the external transcoder
/// when an ffmpeg binary is available. A source without a usable video
/// track fails here, before either backend starts work.
pub fn new_extractor(path: impl AsRef<Path>) -> ClipResult<Box<dyn ThumbnailExtractor + Send>> {
    let path = path.as_ref();
    let parsed = parse_source(path)?;

    if parsed.codec_config.codec.starts_with("avc") {
        return Ok(Box::new(NativeDecodeExtractor::from_parsed(parsed, path)?));
    }

    match which::which("ffmpeg") {
        Ok(ffmpeg) => {
            info!(
                "No in-process decoder for codec {}, using the external transcoder",
                parsed.codec_config.codec
            );
            Ok(Box::new(ExternalTranscodeExtractor::open(ffmpeg, path)?))
        }
        Err(_) => Err(ConfigurationError::new(format!(
            "No in-process decoder for codec {} and no ffmpeg binary on the search path",
            parsed.codec_config.codec
        ))
        .into()),
    }
}

/// Everything the parse pass yields that a backend needs.
struct ParsedSource {
    index: SampleIndex,
    track_id: u32,
    codec_config: CodecConfig,
}

/// Demux the container once: index the video samples and pull the primary
/// video track's codec description.
fn parse_source(path: &Path) -> ClipResult<ParsedSource> {
    let stream = LocalSeekableStream::open(path)?;

    let mut index = SampleIndex::new();
    let mut demuxer = Mp4Demuxer::new(stream);
    demuxer.on_samples(|_, kind, samples| {
        if kind == TrackKind::Video {
            for sample in samples {
                index.index(sample.clone());
            }
        }
    });
    let movie = demuxer.parse()?;

    let track = movie
        .primary_video_track()
        .ok_or_else(|| ConfigurationError::new("No video track found"))?;
    let codec_config = track
        .codec_config
        .clone()
        .ok_or_else(|| ConfigurationError::new("Video track carries no codec description"))?;
    debug!(
        "Parsed source: track {} {} {}x{}, {} sample(s)",
        track.id,
        codec_config.codec,
        codec_config.coded_width,
        codec_config.coded_height,
        index.sample_count(track.id)
    );

    Ok(ParsedSource {
        index,
        track_id: track.id,
        codec_config,
    })
}

/// In-process backend: demuxes the container once, indexes the sample
/// tables, and decodes individual keyframe samples on demand.
pub struct NativeDecodeExtractor {
    stream: LocalSeekableStream,
    index: SampleIndex,
    track_id: u32,
    codec_config: CodecConfig,
}

impl NativeDecodeExtractor {
    pub fn open(path: impl AsRef<Path>) -> ClipResult<Self> {
        let path = path.as_ref();
        let parsed = parse_source(path)?;
        if !parsed.codec_config.codec.starts_with("avc") {
            return Err(ConfigurationError::new(format!(
                "No in-process decoder for codec {}",
                parsed.codec_config.codec
            ))
            .into());
        }
        Self::from_parsed(parsed, path)
    }

    fn from_parsed(parsed: ParsedSource, path: &Path) -> ClipResult<Self> {
        // Reopen for the decode phase; the parse pass consumed the first
        // handle's cursor.
        let stream = LocalSeekableStream::open(path)?;
        Ok(Self {
            stream,
            index: parsed.index,
            track_id: parsed.track_id,
            codec_config: parsed.codec_config,
        })
    }

    /// The keyframes a normalized request selects, in presentation order.
    /// With a sampling interval, the range is divided into step-sized slots
    /// and only the first keyframe of each occupied slot is kept.
    fn select_samples(&self, request: &NormalizedRequest) -> Vec<&Sample> {
        let keyframes =
            self.index
                .select_keyframes_in_range(self.track_id, request.start, request.end);
        let step = match request.step {
            Some(step) if step > 0 => step,
            _ => return keyframes,
        };

        let mut selected = Vec::new();
        let mut last_slot = None;
        for sample in keyframes {
            let slot = (sample.cts_micros() as u64).saturating_sub(request.start) / step;
            if last_slot != Some(slot) {
                selected.push(sample);
                last_slot = Some(slot);
            }
        }
        selected
    }

    fn decode_samples(
        &mut self,
        samples: &[&Sample],
        request: &NormalizedRequest,
    ) -> ClipResult<Vec<Thumbnail>> {
        let mut pipeline = DecodePipeline::new(
            &self.codec_config,
            request.width,
            &request.mime,
            request.quality,
        )?;
        for sample in samples {
            let payload = self.stream.read_range(sample.offset, sample.size as usize)?;
            pipeline.submit(sample, &payload)?;
        }
        pipeline.finish()
    }
}

#[async_trait]
impl ThumbnailExtractor for NativeDecodeExtractor {
    async fn thumbnails(&mut self, request: &ThumbnailRequest) -> ClipResult<Vec<Thumbnail>> {
        let request = normalize_request(request);
        let samples: Vec<&Sample> = self.select_samples(&request);
        debug!("Selected {} keyframe(s)", samples.len());
        let samples: Vec<Sample> = samples.into_iter().cloned().collect();
        let refs: Vec<&Sample> = samples.iter().collect();
        self.decode_samples(&refs, &request)
    }

    async fn seek(&mut self, time_micros: u64) -> ClipResult<Thumbnail> {
        let start = self
            .index
            .nearest_preceding_keyframe(self.track_id, time_micros)
            .ok_or_else(|| {
                NotFoundError::new(format!("No frame at or before {}us", time_micros))
            })?;

        // Decode forward from the keyframe through every sample presented at
        // or before the target; the last decoded frame is the one displayed
        // at the requested time.
        let samples: Vec<Sample> = self.index.samples(self.track_id)[start..]
            .iter()
            .filter(|sample| sample.cts_micros() <= time_micros as i64)
            .cloned()
            .collect();
        if samples.is_empty() {
            return Err(
                NotFoundError::new(format!("No frame at or before {}us", time_micros)).into(),
            );
        }

        let request = normalize_request(&ThumbnailRequest::default());
        let refs: Vec<&Sample> = samples.iter().collect();
        let mut frames = self.decode_samples(&refs, &request)?;
        frames
            .pop()
            .ok_or_else(|| NotFoundError::new(format!("No frame at {}us", time_micros)).into())
    }
}

/// External backend: copies nothing, shells out to ffmpeg against the
/// source path through a per-instance workspace.
pub struct ExternalTranscodeExtractor {
    pipeline: TranscodePipeline,
}

impl ExternalTranscodeExtractor {
    pub fn open(ffmpeg: PathBuf, input: impl AsRef<Path>) -> ClipResult<Self> {
        Ok(Self {
            pipeline: TranscodePipeline::new(ffmpeg, input.as_ref().to_path_buf())?,
        })
    }
}

#[async_trait]
impl ThumbnailExtractor for ExternalTranscodeExtractor {
    async fn thumbnails(&mut self, request: &ThumbnailRequest) -> ClipResult<Vec<Thumbnail>> {
        let request = normalize_request(request);
        self.pipeline.extract(&request).await
    }

    async fn seek(&mut self, time_micros: u64) -> ClipResult<Thumbnail> {
        let request = normalize_request(&ThumbnailRequest::default());
        self.pipeline.seek(time_micros, &request).await
    }
}
