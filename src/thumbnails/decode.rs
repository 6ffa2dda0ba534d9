use super::types::Thumbnail;
use super::utils::{encode_image, output_dimensions, resize_image};
use crate::errors::{ClipResult, ConfigurationError, DecodeError};
use crate::index::Sample;
use crate::mp4::{AvccConfig, CodecConfig};
use log::debug;
use openh264::decoder::{DecodedYUV, Decoder};
use openh264::formats::YUVSource;

/// Lifecycle of a [`DecodePipeline`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Configured,
    Decoding,
    Draining,
    Complete,
}

/// In-process H.264 decode pipeline: accepts encoded keyframe samples one at
/// a time and produces encoded thumbnail images in submission order. Every
/// submitted sample must yield exactly one output frame; the counts are
/// verified when the pipeline finishes.
pub struct DecodePipeline {
    decoder: Decoder,
    nalu_length_size: usize,
    state: PipelineState,
    submitted: usize,
    results: Vec<Thumbnail>,
    target_width: u32,
    target_height: u32,
    mime: String,
    quality: f32,
}

impl DecodePipeline {
    /// Configure a pipeline from a track's codec description. Only H.264
    /// tracks are supported by the in-process path; anything else is a
    /// configuration error and the caller should fall back to the external
    /// transcoder.
    pub fn new(
        config: &CodecConfig,
        width: Option<u32>,
        mime: &str,
        quality: f32,
    ) -> ClipResult<Self> {
        if !config.codec.starts_with("avc") {
            return Err(ConfigurationError::new(format!(
                "In-process decoding supports H.264 only, track is {}",
                config.codec
            ))
            .into());
        }

        let avcc = AvccConfig::parse(&config.description)?;
        if !avcc.is_valid() {
            return Err(
                ConfigurationError::new("Codec description has no SPS or PPS").into(),
            );
        }

        let mut decoder = Decoder::new()
            .map_err(|e| DecodeError::new(format!("Failed to create decoder: {}", e)))?;

        // Parameter sets go in first, as standalone Annex B units, so the
        // decoder is configured before the first slice arrives.
        for sps in &avcc.sps {
            let mut unit = vec![0, 0, 0, 1];
            unit.extend_from_slice(sps);
            decoder.decode(&unit).map_err(|e| {
                DecodeError::new(format!("Failed to initialize decoder with SPS: {}", e))
            })?;
        }
        for pps in &avcc.pps {
            let mut unit = vec![0, 0, 0, 1];
            unit.extend_from_slice(pps);
            decoder.decode(&unit).map_err(|e| {
                DecodeError::new(format!("Failed to initialize decoder with PPS: {}", e))
            })?;
        }

        let (target_width, target_height) =
            output_dimensions(config.coded_width, config.coded_height, width);
        debug!(
            "Decode pipeline configured: {} {}x{} -> {}x{} as {}",
            config.codec, config.coded_width, config.coded_height, target_width, target_height, mime
        );

        Ok(Self {
            decoder,
            nalu_length_size: avcc.nalu_length_size(),
            state: PipelineState::Configured,
            submitted: 0,
            results: Vec::new(),
            target_width,
            target_height,
            mime: mime.to_string(),
            quality,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Decode one sample payload. The pipeline is synchronous, so the output
    /// frame for this sample is appended before the call returns. A decode
    /// failure poisons the pipeline.
    pub fn submit(&mut self, sample: &Sample, payload: &[u8]) -> ClipResult<()> {
        match self.state {
            PipelineState::Configured | PipelineState::Decoding => {}
            state => {
                return Err(DecodeError::new(format!(
                    "Cannot submit a sample in state {:?}",
                    state
                ))
                .into())
            }
        }
        self.state = PipelineState::Decoding;
        self.submitted += 1;

        let annexb = sample_to_annexb(payload, self.nalu_length_size)?;
        let yuv = match self.decoder.decode(&annexb) {
            Ok(Some(yuv)) => yuv,
            Ok(None) => {
                return Err(DecodeError::new(format!(
                    "Decoder produced no frame for the sample at {}us",
                    sample.cts_micros()
                ))
                .into())
            }
            Err(e) => {
                return Err(
                    DecodeError::new(format!("H.264 decoding failed: {}", e)).into(),
                )
            }
        };

        let image = yuv_to_rgb_image(&yuv)?;
        let image = resize_image(image, self.target_width, self.target_height);
        let encoded = encode_image(&image, &self.mime, self.quality)?;
        self.results.push(Thumbnail {
            image: encoded,
            timestamp_micros: sample.cts_micros(),
        });
        Ok(())
    }

    /// Drain and close the pipeline, returning the frames in submission
    /// order. Verifies that every submitted sample produced a frame.
    pub fn finish(mut self) -> ClipResult<Vec<Thumbnail>> {
        self.state = PipelineState::Draining;

        if self.results.len() != self.submitted {
            return Err(DecodeError::new(format!(
                "Submitted {} sample(s) but decoded {} frame(s)",
                self.submitted,
                self.results.len()
            ))
            .into());
        }

        self.state = PipelineState::Complete;
        debug!("Decode pipeline complete: {} frame(s)", self.results.len());
        Ok(self.results)
    }
}

/// Convert a length-prefixed MP4 sample payload to an Annex B bytestream
/// with 4-byte start codes, dropping in-band parameter sets since the
/// decoder is initialized separately.
pub(crate) fn sample_to_annexb(payload: &[u8], nalu_length_size: usize) -> ClipResult<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    let mut pos = 0;

    while pos + nalu_length_size <= payload.len() {
        let mut length = 0usize;
        for &byte in &payload[pos..pos + nalu_length_size] {
            length = (length << 8) | byte as usize;
        }
        pos += nalu_length_size;

        if pos + length > payload.len() {
            return Err(DecodeError::new(format!(
                "NALU length {} extends past the end of the sample",
                length
            ))
            .into());
        }
        let nalu = &payload[pos..pos + length];
        pos += length;

        if nalu.is_empty() {
            continue;
        }
        let nalu_type = nalu[0] & 0x1f;
        if nalu_type == 7 || nalu_type == 8 {
            continue;
        }
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(nalu);
    }

    if out.is_empty() {
        return Err(DecodeError::new("No video frame NALUs found in sample").into());
    }
    Ok(out)
}

/// Convert a decoded YUV frame to an RGB image buffer.
pub(crate) fn yuv_to_rgb_image(yuv: &DecodedYUV<'_>) -> ClipResult<image::RgbImage> {
    let (width, height) = yuv.dimensions();
    let mut rgb = vec![0u8; yuv.rgb8_len()];
    yuv.write_rgb8(&mut rgb);
    image::RgbImage::from_raw(width as u32, height as u32, rgb)
        .ok_or_else(|| DecodeError::new("Decoded frame has inconsistent dimensions").into())
}
