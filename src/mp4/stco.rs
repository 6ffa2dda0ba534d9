use super::r#box::find_box;
use crate::errors::{ClipError, ClipResult, Mp4Error};

/// Parse stco (chunk offset) or co64 box
pub fn parse_stco_or_co64(stbl: &[u8]) -> ClipResult<Vec<u64>> {
    // Try stco first (32-bit offsets)
    if let Some(stco) = find_box(stbl, "stco") {
        if stco.len() < 8 {
            return Err(ClipError::Mp4(Mp4Error::new(
                "stco box too small: expected at least 8 bytes",
            )));
        }
        let entry_count = u32::from_be_bytes([stco[4], stco[5], stco[6], stco[7]]);
        let mut offsets = Vec::new();

        for i in 0..entry_count {
            let offset_pos = 8 + (i * 4) as usize;
            if offset_pos + 4 <= stco.len() {
                let offset = u32::from_be_bytes([
                    stco[offset_pos],
                    stco[offset_pos + 1],
                    stco[offset_pos + 2],
                    stco[offset_pos + 3],
                ]) as u64;
                offsets.push(offset);
            }
        }
        return Ok(offsets);
    }

    // Try co64 (64-bit offsets)
    if let Some(co64) = find_box(stbl, "co64") {
        if co64.len() < 8 {
            return Err(ClipError::Mp4(Mp4Error::new(
                "co64 box too small: expected at least 8 bytes",
            )));
        }
        let entry_count = u32::from_be_bytes([co64[4], co64[5], co64[6], co64[7]]);
        let mut offsets = Vec::new();

        for i in 0..entry_count {
            let offset_pos = 8 + (i * 8) as usize;
            if offset_pos + 8 <= co64.len() {
                let offset = u64::from_be_bytes([
                    co64[offset_pos],
                    co64[offset_pos + 1],
                    co64[offset_pos + 2],
                    co64[offset_pos + 3],
                    co64[offset_pos + 4],
                    co64[offset_pos + 5],
                    co64[offset_pos + 6],
                    co64[offset_pos + 7],
                ]);
                offsets.push(offset);
            }
        }
        return Ok(offsets);
    }

    Err(ClipError::Mp4(Mp4Error::new(
        "No chunk offset box found: missing both stco and co64",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::r#box::write_box_header;

    #[test]
    fn test_parse_stco() {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&2u32.to_be_bytes());
        payload.extend_from_slice(&48u32.to_be_bytes());
        payload.extend_from_slice(&4096u32.to_be_bytes());
        let mut stbl = Vec::new();
        write_box_header(&mut stbl, "stco", (payload.len() + 8) as u32);
        stbl.extend(payload);

        assert_eq!(parse_stco_or_co64(&stbl).unwrap(), vec![48, 4096]);
    }

    #[test]
    fn test_parse_co64() {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.extend_from_slice(&(8_000_000_000u64).to_be_bytes());
        let mut stbl = Vec::new();
        write_box_header(&mut stbl, "co64", (payload.len() + 8) as u32);
        stbl.extend(payload);

        assert_eq!(parse_stco_or_co64(&stbl).unwrap(), vec![8_000_000_000]);
    }

    #[test]
    fn test_parse_stco_missing() {
        assert!(parse_stco_or_co64(&[]).is_err());
    }
}
