//! Shared fixtures for unit and integration tests: real H.264 parameter sets
//! plus builders for synthetic MP4 structures, so no test needs an on-disk
//! media file.

use crate::mp4::write_box_header;

/// SPS from `testdata/video.h264` (Main profile, level 3.0).
pub const SPS_BYTES: [u8; 28] = [
    0x67, 0x4d, 0x40, 0x1e, 0xec, 0xc0, 0x50, 0x17, 0xfc, 0xb8, 0x0b, 0x50, 0x10, 0x10, 0x14,
    0x00, 0x00, 0x03, 0x01, 0xf4, 0x00, 0x00, 0x5d, 0xa8, 0x3c, 0x58, 0xb6, 0x68,
];

/// PPS paired with [`SPS_BYTES`].
pub const PPS_BYTES: [u8; 5] = [0x68, 0xe9, 0x79, 0xcb, 0x20];

/// A complete IDR slice NALU decodable with the parameter sets above.
pub const IDR_NALU: [u8; 89] = [
    0x65, 0x88, 0x84, 0x00, 0x2b, 0xff, 0xfe, 0xf5, 0x27, 0xf8, 0x14, 0xd5, 0x08, 0x44, 0x4b,
    0xe1, 0x6b, 0x61, 0xed, 0xd4, 0xb7, 0x49, 0x30, 0xd1, 0x70, 0xb1, 0x2d, 0xb3, 0xd0, 0x00,
    0x00, 0x03, 0x00, 0x00, 0x03, 0x00, 0x00, 0x18, 0xee, 0xec, 0x61, 0x1a, 0x66, 0xb1, 0x3e,
    0x51, 0xb0, 0xa0, 0x00, 0x00, 0x03, 0x00, 0x5e, 0x40, 0x17, 0xe0, 0x9a, 0x85, 0xa4, 0x3e,
    0x43, 0xb0, 0x35, 0x43, 0xc0, 0x50, 0xc7, 0x58, 0xa7, 0x10, 0x02, 0x04, 0x00, 0x00, 0x03,
    0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x02, 0xdf,
];

/// Serialize an AVCDecoderConfigurationRecord from one SPS and one PPS,
/// mirroring what muxers write into the avcC box payload.
pub fn build_avcc(sps: &[u8], pps: &[u8]) -> Vec<u8> {
    let mut out = vec![1, sps[1], sps[2], sps[3], 0xFF, 0xE1];
    out.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    out.extend_from_slice(sps);
    out.push(1);
    out.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    out.extend_from_slice(pps);
    out
}

/// The IDR slice wrapped as a length-prefixed MP4 sample payload.
pub fn idr_sample() -> Vec<u8> {
    let mut out = (IDR_NALU.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(&IDR_NALU);
    out
}

/// Declarative sample for the synthetic builders.
#[derive(Debug, Clone, Copy)]
pub struct TestSample {
    pub size: u32,
    pub dts: u64,
    pub sync: bool,
}

impl TestSample {
    /// A sync sample (keyframe).
    pub fn sync(size: u32, dts: u64) -> Self {
        Self {
            size,
            dts,
            sync: true,
        }
    }

    /// A dependent (non-sync) sample.
    pub fn delta(size: u32, dts: u64) -> Self {
        Self {
            size,
            dts,
            sync: false,
        }
    }
}

fn boxed(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    write_box_header(&mut out, name, (payload.len() + 8) as u32);
    out.extend_from_slice(payload);
    out
}

fn full_box(name: &str, version: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![version, 0, 0, 0];
    body.extend_from_slice(payload);
    boxed(name, &body)
}

fn visual_sample_entry(width: u16, height: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&[0u8; 6]); // reserved
    body.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    body.extend_from_slice(&[0u8; 16]); // pre-defined + reserved
    body.extend_from_slice(&width.to_be_bytes());
    body.extend_from_slice(&height.to_be_bytes());
    body.extend_from_slice(&[0u8; 50]); // resolution, frame count, compressor, depth
    body.extend_from_slice(&boxed("avcC", &build_avcc(&SPS_BYTES, &PPS_BYTES)));

    let mut out = Vec::new();
    write_box_header(&mut out, "avc1", (body.len() + 8) as u32);
    out.extend(body);
    out
}

/// Build a moov payload with a single H.264 video track whose samples live
/// in one contiguous chunk starting at `chunk_offset`.
pub fn build_test_movie(timescale: u32, samples: &[TestSample], chunk_offset: u64) -> Vec<u8> {
    let sample_count = samples.len() as u32;

    // tkhd: creation/modification, track id 1
    let mut tkhd = vec![0u8; 8];
    tkhd.extend_from_slice(&1u32.to_be_bytes());
    tkhd.extend_from_slice(&[0u8; 8]);
    let tkhd = full_box("tkhd", 0, &tkhd);

    // mdhd v0: creation/modification, timescale, duration
    let duration = samples
        .last()
        .map(|s| s.dts + frame_delta(samples))
        .unwrap_or(0) as u32;
    let mut mdhd = vec![0u8; 8];
    mdhd.extend_from_slice(&timescale.to_be_bytes());
    mdhd.extend_from_slice(&duration.to_be_bytes());
    mdhd.extend_from_slice(&[0u8; 4]); // language + pre-defined
    let mdhd = full_box("mdhd", 0, &mdhd);

    let mut hdlr = vec![0u8; 4];
    hdlr.extend_from_slice(b"vide");
    hdlr.extend_from_slice(&[0u8; 13]);
    let hdlr = full_box("hdlr", 0, &hdlr);

    // stts: one entry per sample keeps arbitrary dts spacings simple
    let mut stts = (sample_count).to_be_bytes().to_vec();
    for (i, sample) in samples.iter().enumerate() {
        let delta = samples
            .get(i + 1)
            .map(|next| (next.dts - sample.dts) as u32)
            .unwrap_or_else(|| frame_delta(samples) as u32);
        stts.extend_from_slice(&1u32.to_be_bytes());
        stts.extend_from_slice(&delta.to_be_bytes());
    }
    let stts = full_box("stts", 0, &stts);

    let sync_numbers: Vec<u32> = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.sync)
        .map(|(i, _)| i as u32 + 1)
        .collect();
    let mut stss = (sync_numbers.len() as u32).to_be_bytes().to_vec();
    for number in &sync_numbers {
        stss.extend_from_slice(&number.to_be_bytes());
    }
    let stss = full_box("stss", 0, &stss);

    // stts only records deltas, so decoding always starts at zero. When the
    // declared samples start later, a constant ctts offset shifts every
    // presentation time back to the declared position.
    let first_dts = samples.first().map(|s| s.dts).unwrap_or(0);
    let ctts = if first_dts > 0 {
        let mut body = 1u32.to_be_bytes().to_vec();
        body.extend_from_slice(&sample_count.to_be_bytes());
        body.extend_from_slice(&(first_dts as u32).to_be_bytes());
        Some(full_box("ctts", 0, &body))
    } else {
        None
    };

    let mut stsz = 0u32.to_be_bytes().to_vec();
    stsz.extend_from_slice(&sample_count.to_be_bytes());
    for sample in samples {
        stsz.extend_from_slice(&sample.size.to_be_bytes());
    }
    let stsz = full_box("stsz", 0, &stsz);

    let mut stsc = 1u32.to_be_bytes().to_vec();
    stsc.extend_from_slice(&1u32.to_be_bytes());
    stsc.extend_from_slice(&sample_count.to_be_bytes());
    stsc.extend_from_slice(&1u32.to_be_bytes());
    let stsc = full_box("stsc", 0, &stsc);

    let mut stco = 1u32.to_be_bytes().to_vec();
    stco.extend_from_slice(&(chunk_offset as u32).to_be_bytes());
    let stco = full_box("stco", 0, &stco);

    let stsd = {
        let entry = visual_sample_entry(1280, 720);
        let mut body = 1u32.to_be_bytes().to_vec();
        body.extend_from_slice(&entry);
        full_box("stsd", 0, &body)
    };

    let mut stbl_children = vec![stsd, stts];
    if let Some(ctts) = ctts {
        stbl_children.push(ctts);
    }
    stbl_children.extend([stss, stsz, stsc, stco]);
    let stbl = boxed("stbl", &stbl_children.concat());
    let minf = boxed("minf", &stbl);
    let mdia = boxed("mdia", &[mdhd, hdlr, minf].concat());
    let trak = boxed("trak", &[tkhd, mdia].concat());
    trak
}

fn frame_delta(samples: &[TestSample]) -> u64 {
    if samples.len() >= 2 {
        samples[1].dts - samples[0].dts
    } else {
        40_000
    }
}

/// Build a complete MP4 file: ftyp, mdat holding the given payloads
/// contiguously, then moov describing them.
pub fn build_test_mp4(timescale: u32, frames: &[(Vec<u8>, TestSample)]) -> Vec<u8> {
    let mut ftyp = Vec::new();
    ftyp.extend_from_slice(b"isom");
    ftyp.extend_from_slice(&512u32.to_be_bytes());
    ftyp.extend_from_slice(b"isomavc1");
    let ftyp = boxed("ftyp", &ftyp);

    let mdat_payload: Vec<u8> = frames.iter().flat_map(|(data, _)| data.clone()).collect();
    let mdat = boxed("mdat", &mdat_payload);

    let chunk_offset = (ftyp.len() + 8) as u64;
    let samples: Vec<TestSample> = frames
        .iter()
        .map(|(data, sample)| TestSample {
            size: data.len() as u32,
            ..*sample
        })
        .collect();
    let moov_payload = build_test_movie(timescale, &samples, chunk_offset);
    let moov = boxed("moov", &moov_payload);

    let mut file = ftyp;
    file.extend(mdat);
    file.extend(moov);
    file
}
