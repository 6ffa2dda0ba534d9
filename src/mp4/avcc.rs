//! A module for parsing AVCDecoderConfigurationRecord (avcC) data.
//! Provides the SPS and PPS NAL units needed to initialize an H.264 decoder.

use crate::errors::{ClipError, ClipResult, Mp4Error};

/// Represents the parsed AVCDecoderConfigurationRecord (avcC) configuration.
#[derive(Debug, Clone)]
pub struct AvccConfig {
    /// configurationVersion
    pub configuration_version: u8,
    /// AVCProfileIndication
    pub profile: u8,
    /// profileCompatibility
    pub compatibility: u8,
    /// AVCLevelIndication
    pub level: u8,
    /// lengthSizeMinusOne
    pub length_size_minus_one: u8,
    /// Sequence Parameter Sets
    pub sps: Vec<Vec<u8>>,
    /// Picture Parameter Sets
    pub pps: Vec<Vec<u8>>,
}

impl AvccConfig {
    /// Parse AVCDecoderConfigurationRecord as defined in ISO/IEC 14496-15.
    ///
    /// data: full contents of the avcC box (excluding header).
    pub fn parse(data: &[u8]) -> ClipResult<Self> {
        let mut pos = 0;
        if data.len() < 7 {
            return Err(ClipError::Mp4(Mp4Error::new("avcC data too short")));
        }
        let configuration_version = data[pos];
        pos += 1;
        let profile = data[pos];
        pos += 1;
        let compatibility = data[pos];
        pos += 1;
        let level = data[pos];
        pos += 1;
        // 6 bits reserved + 2 bits lengthSizeMinusOne
        let length_size_minus_one = data[pos] & 0x03;
        pos += 1;
        // 3 bits reserved + 5 bits SPS count
        let num_sps = data[pos] & 0x1F;
        pos += 1;
        let mut sps = Vec::with_capacity(num_sps as usize);
        for _ in 0..num_sps {
            if pos + 2 > data.len() {
                return Err(ClipError::Mp4(Mp4Error::new(
                    "Unexpected EOF while reading SPS length",
                )));
            }
            let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
            pos += 2;
            if pos + len > data.len() {
                return Err(ClipError::Mp4(Mp4Error::new(
                    "Unexpected EOF while reading SPS data",
                )));
            }
            sps.push(data[pos..pos + len].to_vec());
            pos += len;
        }
        if pos >= data.len() {
            return Err(ClipError::Mp4(Mp4Error::new(
                "Unexpected EOF while reading PPS count",
            )));
        }
        let num_pps = data[pos];
        pos += 1;
        let mut pps = Vec::with_capacity(num_pps as usize);
        for _ in 0..num_pps {
            if pos + 2 > data.len() {
                return Err(ClipError::Mp4(Mp4Error::new(
                    "Unexpected EOF while reading PPS length",
                )));
            }
            let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
            pos += 2;
            if pos + len > data.len() {
                return Err(ClipError::Mp4(Mp4Error::new(
                    "Unexpected EOF while reading PPS data",
                )));
            }
            pps.push(data[pos..pos + len].to_vec());
            pos += len;
        }
        Ok(AvccConfig {
            configuration_version,
            profile,
            compatibility,
            level,
            length_size_minus_one,
            sps,
            pps,
        })
    }

    /// Size in bytes of the NALU length prefix used by samples of this track.
    pub fn nalu_length_size(&self) -> usize {
        self.length_size_minus_one as usize + 1
    }

    /// Check if configuration is valid
    pub fn is_valid(&self) -> bool {
        !self.sps.is_empty() && !self.pps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_avcc;

    #[test]
    fn test_parse_avcc_round() {
        let sps = [0x67, 0x4d, 0x40, 0x1e, 0xec];
        let pps = [0x68, 0xe9, 0x79, 0xcb, 0x20];
        let data = build_avcc(&sps, &pps);

        let config = AvccConfig::parse(&data).unwrap();
        assert_eq!(config.configuration_version, 1);
        assert_eq!(config.profile, 0x4d);
        assert_eq!(config.nalu_length_size(), 4);
        assert_eq!(config.sps, vec![sps.to_vec()]);
        assert_eq!(config.pps, vec![pps.to_vec()]);
        assert!(config.is_valid());
    }

    #[test]
    fn test_parse_avcc_too_short() {
        assert!(AvccConfig::parse(&[1, 0, 0]).is_err());
    }
}
