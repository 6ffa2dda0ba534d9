pub mod bits;

pub mod mp4;
pub use mp4::{AvccConfig, CodecConfig, Mp4Demuxer, MovieInfo, TrackInfo, TrackKind};

pub mod index;
pub use index::{Sample, SampleIndex};

pub mod streams;
pub use streams::{LocalSeekableStream, SeekableStream};

pub mod thumbnails;
pub use thumbnails::{new_extractor, Thumbnail, ThumbnailExtractor, ThumbnailRequest};

pub mod worker;
pub use worker::{ExtractionWorker, WorkerAction, WorkerReply};

pub mod errors;
pub use errors::{
    ClipError, ClipResult, ConfigurationError, DecodeError, ExtractionError, Mp4Error,
    NotFoundError,
};

#[doc(hidden)]
pub mod test_support;

/// Extract thumbnails from a local MP4 file in one call.
pub async fn extract_thumbnails(
    source: impl AsRef<std::path::Path>,
    request: &ThumbnailRequest,
) -> ClipResult<Vec<Thumbnail>> {
    let mut extractor = new_extractor(source)?;
    extractor.thumbnails(request).await
}

/// Extract the single frame displayed at `time_micros` from a local MP4
/// file.
pub async fn seek_thumbnail(
    source: impl AsRef<std::path::Path>,
    time_micros: u64,
) -> ClipResult<Thumbnail> {
    let mut extractor = new_extractor(source)?;
    extractor.seek(time_micros).await
}
