use crate::errors::{ClipError, ClipResult, Mp4Error};

/// Parse mdhd box to get timescale and duration
pub fn parse_mdhd(mdhd: &[u8]) -> ClipResult<(u32, u64)> {
    if mdhd.len() < 20 {
        return Err(ClipError::Mp4(Mp4Error::new("mdhd box too small")));
    }

    let version = mdhd[0];
    if version == 1 {
        // Version 1: 64-bit creation/modification times and duration
        if mdhd.len() < 32 {
            return Err(ClipError::Mp4(Mp4Error::new("mdhd v1 box too small")));
        }
        let timescale = u32::from_be_bytes([mdhd[20], mdhd[21], mdhd[22], mdhd[23]]);
        let duration = u64::from_be_bytes([
            mdhd[24], mdhd[25], mdhd[26], mdhd[27], mdhd[28], mdhd[29], mdhd[30], mdhd[31],
        ]);
        Ok((timescale, duration))
    } else {
        // Version 0: 32-bit values
        let timescale = u32::from_be_bytes([mdhd[12], mdhd[13], mdhd[14], mdhd[15]]);
        let duration = u32::from_be_bytes([mdhd[16], mdhd[17], mdhd[18], mdhd[19]]) as u64;
        Ok((timescale, duration))
    }
}
