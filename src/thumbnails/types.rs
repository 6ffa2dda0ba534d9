/// A time-range/sampling query against one source. All times are
/// source-relative microseconds.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ThumbnailRequest {
    /// Range start, inclusive. Defaults to 0.
    pub start: Option<u64>,
    /// Range end, inclusive. Defaults to unbounded.
    pub end: Option<u64>,
    /// Fixed sampling interval. When absent, every keyframe in range is
    /// extracted.
    pub step: Option<u64>,
    /// Output image quality in [0, 1]. Defaults to 1.
    pub quality: Option<f32>,
    /// Output image MIME type. Defaults to "image/png".
    pub mime: Option<String>,
    /// Output width in pixels; height is derived preserving the source
    /// aspect ratio. Defaults to the coded dimensions.
    pub width: Option<u32>,
}

/// One extracted frame: an encoded image plus its presentation timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Thumbnail {
    pub image: Vec<u8>,
    pub timestamp_micros: i64,
}

/// A [`ThumbnailRequest`] with all defaults applied.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub start: u64,
    pub end: Option<u64>,
    pub step: Option<u64>,
    pub quality: f32,
    pub mime: String,
    pub width: Option<u32>,
}

/// Apply the documented defaults: start=0, end=unbounded, quality=1,
/// mime=image/png. Quality is clamped into [0, 1].
pub fn normalize_request(request: &ThumbnailRequest) -> NormalizedRequest {
    NormalizedRequest {
        start: request.start.unwrap_or(0),
        end: request.end,
        step: request.step,
        quality: request.quality.unwrap_or(1.0).clamp(0.0, 1.0),
        mime: request
            .mime
            .clone()
            .unwrap_or_else(|| "image/png".to_string()),
        width: request.width,
    }
}
