use super::r#box::find_box;
use crate::errors::{ClipError, ClipResult, Mp4Error};

/// Parse stsz (sample size) box
pub fn parse_stsz(stbl: &[u8]) -> ClipResult<Vec<u32>> {
    let stsz = find_box(stbl, "stsz")
        .ok_or_else(|| ClipError::Mp4(Mp4Error::new("stsz box not found in stbl box")))?;

    if stsz.len() < 12 {
        return Err(ClipError::Mp4(Mp4Error::new(
            "stsz box too small: expected at least 12 bytes",
        )));
    }

    let sample_size = u32::from_be_bytes([stsz[4], stsz[5], stsz[6], stsz[7]]);
    let sample_count = u32::from_be_bytes([stsz[8], stsz[9], stsz[10], stsz[11]]);

    if sample_size != 0 {
        // All samples have the same size
        Ok(vec![sample_size; sample_count as usize])
    } else {
        // Individual sample sizes
        let required_size = 12 + (sample_count as usize * 4);
        if required_size > stsz.len() {
            return Err(ClipError::Mp4(Mp4Error::new(format!(
                "stsz box too small for {} samples: expected {} bytes, got {}",
                sample_count,
                required_size,
                stsz.len()
            ))));
        }

        let mut sizes = Vec::with_capacity(sample_count as usize);
        for i in 0..sample_count {
            let size_pos = 12 + (i * 4) as usize;
            let size = u32::from_be_bytes([
                stsz[size_pos],
                stsz[size_pos + 1],
                stsz[size_pos + 2],
                stsz[size_pos + 3],
            ]);
            sizes.push(size);
        }
        Ok(sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::r#box::write_box_header;

    fn stsz_box(default_size: u32, sizes: &[u32]) -> Vec<u8> {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&default_size.to_be_bytes());
        payload.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
        if default_size == 0 {
            for size in sizes {
                payload.extend_from_slice(&size.to_be_bytes());
            }
        }
        let mut out = Vec::new();
        write_box_header(&mut out, "stsz", (payload.len() + 8) as u32);
        out.extend(payload);
        out
    }

    #[test]
    fn test_parse_stsz_individual_sizes() {
        let stbl = stsz_box(0, &[100, 50, 75]);
        assert_eq!(parse_stsz(&stbl).unwrap(), vec![100, 50, 75]);
    }

    #[test]
    fn test_parse_stsz_constant_size() {
        let stbl = stsz_box(512, &[0, 0, 0, 0]);
        assert_eq!(parse_stsz(&stbl).unwrap(), vec![512; 4]);
    }
}
