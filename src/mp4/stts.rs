use super::r#box::find_box;
use crate::errors::{ClipError, ClipResult, Mp4Error};

#[derive(Debug, PartialEq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Parse stts (decoding time to sample) box
pub fn parse_stts(stbl: &[u8]) -> ClipResult<Vec<SttsEntry>> {
    let stts = find_box(stbl, "stts")
        .ok_or_else(|| ClipError::Mp4(Mp4Error::new("stts box not found in stbl box")))?;

    if stts.len() < 8 {
        return Err(ClipError::Mp4(Mp4Error::new(
            "stts box too small: expected at least 8 bytes",
        )));
    }

    let entry_count = u32::from_be_bytes([stts[4], stts[5], stts[6], stts[7]]);

    let required_size = 8 + (entry_count as usize * 8);
    if required_size > stts.len() {
        return Err(ClipError::Mp4(Mp4Error::new(format!(
            "stts box too small for {} entries: expected {} bytes, got {}",
            entry_count,
            required_size,
            stts.len()
        ))));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);

    for i in 0..entry_count {
        let entry_pos = 8 + (i * 8) as usize;
        let sample_count = u32::from_be_bytes([
            stts[entry_pos],
            stts[entry_pos + 1],
            stts[entry_pos + 2],
            stts[entry_pos + 3],
        ]);
        let sample_delta = u32::from_be_bytes([
            stts[entry_pos + 4],
            stts[entry_pos + 5],
            stts[entry_pos + 6],
            stts[entry_pos + 7],
        ]);

        entries.push(SttsEntry {
            sample_count,
            sample_delta,
        });
    }

    Ok(entries)
}

/// Build per-sample decode timestamps (in timescale ticks) and durations from
/// STTS entries. Returns `(dts, duration)` pairs in sample order.
pub fn build_sample_dts(entries: &[SttsEntry]) -> Vec<(u64, u32)> {
    let mut timestamps = Vec::new();
    let mut time_offset = 0u64;

    for entry in entries {
        for _ in 0..entry.sample_count {
            timestamps.push((time_offset, entry.sample_delta));
            time_offset += entry.sample_delta as u64;
        }
    }

    timestamps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::r#box::write_box_header;

    fn stts_box(entries: &[(u32, u32)]) -> Vec<u8> {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for (count, delta) in entries {
            payload.extend_from_slice(&count.to_be_bytes());
            payload.extend_from_slice(&delta.to_be_bytes());
        }
        let mut out = Vec::new();
        write_box_header(&mut out, "stts", (payload.len() + 8) as u32);
        out.extend(payload);
        out
    }

    #[test]
    fn test_parse_stts() {
        let stbl = stts_box(&[(2, 3000), (1, 1500)]);
        let entries = parse_stts(&stbl).unwrap();
        assert_eq!(
            entries,
            vec![
                SttsEntry {
                    sample_count: 2,
                    sample_delta: 3000
                },
                SttsEntry {
                    sample_count: 1,
                    sample_delta: 1500
                },
            ]
        );
    }

    #[test]
    fn test_build_sample_dts() {
        let entries = vec![
            SttsEntry {
                sample_count: 2,
                sample_delta: 3000,
            },
            SttsEntry {
                sample_count: 1,
                sample_delta: 1500,
            },
        ];
        let dts = build_sample_dts(&entries);
        assert_eq!(dts, vec![(0, 3000), (3000, 3000), (6000, 1500)]);
    }

    #[test]
    fn test_parse_stts_truncated_entries() {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&5u32.to_be_bytes()); // claims 5 entries
        let mut stbl = Vec::new();
        write_box_header(&mut stbl, "stts", (payload.len() + 8) as u32);
        stbl.extend(payload);
        assert!(parse_stts(&stbl).is_err());
    }
}
