pub mod decode;
pub mod extractor;
pub mod transcode;
mod types;
mod utils;

pub use extractor::{
    new_extractor, ExternalTranscodeExtractor, NativeDecodeExtractor, ThumbnailExtractor,
};
pub use types::{normalize_request, NormalizedRequest, Thumbnail, ThumbnailRequest};

#[cfg(test)]
mod unit_test;
