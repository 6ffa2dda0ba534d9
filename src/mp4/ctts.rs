use super::r#box::find_box;
use crate::errors::{ClipError, ClipResult, Mp4Error};

#[derive(Debug, PartialEq)]
pub struct CttsEntry {
    pub sample_count: u32,
    /// Composition offset in timescale ticks. Signed in version 1 boxes.
    pub sample_offset: i64,
}

/// Parse ctts (composition time to sample) box. The box is optional; tracks
/// without B-frames omit it and cts equals dts for every sample.
pub fn parse_ctts(stbl: &[u8]) -> ClipResult<Option<Vec<CttsEntry>>> {
    let ctts = match find_box(stbl, "ctts") {
        Some(ctts) => ctts,
        None => return Ok(None),
    };

    if ctts.len() < 8 {
        return Err(ClipError::Mp4(Mp4Error::new(
            "ctts box too small: expected at least 8 bytes",
        )));
    }

    let version = ctts[0];
    let entry_count = u32::from_be_bytes([ctts[4], ctts[5], ctts[6], ctts[7]]);

    let required_size = 8 + (entry_count as usize * 8);
    if required_size > ctts.len() {
        return Err(ClipError::Mp4(Mp4Error::new(format!(
            "ctts box too small for {} entries: expected {} bytes, got {}",
            entry_count,
            required_size,
            ctts.len()
        ))));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);

    for i in 0..entry_count {
        let entry_pos = 8 + (i * 8) as usize;
        let sample_count = u32::from_be_bytes([
            ctts[entry_pos],
            ctts[entry_pos + 1],
            ctts[entry_pos + 2],
            ctts[entry_pos + 3],
        ]);
        let raw = [
            ctts[entry_pos + 4],
            ctts[entry_pos + 5],
            ctts[entry_pos + 6],
            ctts[entry_pos + 7],
        ];
        let sample_offset = if version == 1 {
            i32::from_be_bytes(raw) as i64
        } else {
            u32::from_be_bytes(raw) as i64
        };

        entries.push(CttsEntry {
            sample_count,
            sample_offset,
        });
    }

    Ok(Some(entries))
}

/// Expand CTTS entries into one composition offset per sample. Samples past
/// the end of the table get offset zero.
pub fn build_composition_offsets(entries: &[CttsEntry], sample_count: usize) -> Vec<i64> {
    let mut offsets = Vec::with_capacity(sample_count);
    for entry in entries {
        for _ in 0..entry.sample_count {
            if offsets.len() == sample_count {
                return offsets;
            }
            offsets.push(entry.sample_offset);
        }
    }
    offsets.resize(sample_count, 0);
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::r#box::write_box_header;

    fn ctts_box(version: u8, entries: &[(u32, i32)]) -> Vec<u8> {
        let mut payload = vec![version, 0, 0, 0];
        payload.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for (count, offset) in entries {
            payload.extend_from_slice(&count.to_be_bytes());
            payload.extend_from_slice(&offset.to_be_bytes());
        }
        let mut out = Vec::new();
        write_box_header(&mut out, "ctts", (payload.len() + 8) as u32);
        out.extend(payload);
        out
    }

    #[test]
    fn test_parse_ctts_absent() {
        assert_eq!(parse_ctts(&[]).unwrap(), None);
    }

    #[test]
    fn test_parse_ctts_v1_signed_offsets() {
        let stbl = ctts_box(1, &[(1, 2000), (2, -1000)]);
        let entries = parse_ctts(&stbl).unwrap().unwrap();
        assert_eq!(entries[0].sample_offset, 2000);
        assert_eq!(entries[1].sample_offset, -1000);
    }

    #[test]
    fn test_build_composition_offsets_pads_with_zero() {
        let entries = vec![CttsEntry {
            sample_count: 2,
            sample_offset: 500,
        }];
        assert_eq!(build_composition_offsets(&entries, 4), vec![500, 500, 0, 0]);
    }
}
