pub mod r#box;
pub use r#box::{find_box, find_box_range, parse_box_header, write_box_header};
pub mod mdhd;
pub use mdhd::parse_mdhd;
pub mod stts;
pub use stts::{build_sample_dts, parse_stts, SttsEntry};
pub mod ctts;
pub use ctts::{build_composition_offsets, parse_ctts, CttsEntry};
pub mod stss;
pub use stss::parse_stss;
pub mod stsz;
pub use stsz::parse_stsz;
pub mod stsc;
pub use stsc::{parse_stsc, SampleToChunkEntry};
pub mod stco;
pub use stco::parse_stco_or_co64;
pub mod stsd;
pub use stsd::{extract_codec_config, CodecConfig};
pub mod avcc;
pub use avcc::AvccConfig;
pub mod trak;
pub use trak::{parse_movie, MovieInfo, TrackInfo, TrackKind};
pub mod demuxer;
pub use demuxer::Mp4Demuxer;
