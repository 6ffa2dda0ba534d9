use super::r#box::{find_box_range, parse_box_header};
use crate::errors::{ClipResult, ConfigurationError};

/// Decoder configuration derived from a video track's sample description.
/// Built once per source during the parse pass and immutable afterwards.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Normalized codec identifier (e.g. "avc1", "vp8", "av01")
    pub codec: String,
    pub coded_width: u32,
    pub coded_height: u32,
    /// Codec-specific configuration record (description box payload with the
    /// 8-byte box header stripped), e.g. an AVCDecoderConfigurationRecord.
    pub description: Vec<u8>,
}

/// Recognized codec-specific configuration boxes inside a sample entry.
const DESCRIPTION_BOXES: [&str; 4] = ["avcC", "hvcC", "vpcC", "av1C"];

/// Codec fourccs that decoders know under a different short name.
fn normalize_codec_tag(fourcc: &str) -> String {
    if fourcc.starts_with("vp08") {
        "vp8".to_string()
    } else {
        fourcc.to_string()
    }
}

/// Extract the codec configuration from an stsd payload of a video track.
pub fn extract_codec_config(stsd: &[u8]) -> ClipResult<CodecConfig> {
    if stsd.len() < 8 {
        return Err(ConfigurationError::new("stsd box too small").into());
    }

    let entry_count = u32::from_be_bytes([stsd[4], stsd[5], stsd[6], stsd[7]]);
    let mut pos = 8; // version/flags + entry count

    for _ in 0..entry_count {
        if pos + 8 > stsd.len() {
            break;
        }

        let entry_size =
            u32::from_be_bytes([stsd[pos], stsd[pos + 1], stsd[pos + 2], stsd[pos + 3]]) as usize;
        if entry_size < 8 || pos + entry_size > stsd.len() {
            break;
        }

        let entry = &stsd[pos..pos + entry_size];
        let fourcc = std::str::from_utf8(&entry[4..8]).unwrap_or("unknown");

        let (width, height) = parse_entry_dimensions(entry);

        if let Some(description) = find_description_box(entry) {
            return Ok(CodecConfig {
                codec: normalize_codec_tag(fourcc),
                coded_width: width,
                coded_height: height,
                description: description.to_vec(),
            });
        }

        pos += entry_size;
    }

    Err(ConfigurationError::new("No recognized codec configuration box in sample description")
        .into())
}

/// Read coded width/height from a visual sample entry.
fn parse_entry_dimensions(entry: &[u8]) -> (u32, u32) {
    // 8 header + 6 reserved + 2 data ref index + 16 pre-defined/reserved,
    // then width and height as 16-bit values.
    let pos = 8 + 6 + 2 + 16;
    if pos + 4 > entry.len() {
        return (0, 0);
    }
    let width = u16::from_be_bytes([entry[pos], entry[pos + 1]]) as u32;
    let height = u16::from_be_bytes([entry[pos + 2], entry[pos + 3]]) as u32;
    (width, height)
}

/// Scan the child boxes of a visual sample entry for one of the recognized
/// configuration boxes and return its payload.
fn find_description_box(entry: &[u8]) -> Option<&[u8]> {
    // size+type + reserved + data_ref + fixed video fields
    let mut pos = 8 + 6 + 2 + 70;

    while pos + 8 <= entry.len() {
        let start = pos;
        let (name, size) = parse_box_header(entry, &mut pos)?;
        if size < 8 || size as usize > entry.len() - start {
            break;
        }

        if DESCRIPTION_BOXES.contains(&name.as_str()) {
            let (_, payload_start, payload_end) = find_box_range(&entry[start..], &name)?;
            return Some(&entry[start + payload_start..start + payload_end]);
        }

        pos = start + size as usize;
    }

    None
}
