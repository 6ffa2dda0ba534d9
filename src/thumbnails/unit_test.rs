use super::decode::{sample_to_annexb, DecodePipeline, PipelineState};
use super::transcode::{
    build_extract_args, collect_frames, micros_to_clock, parse_frame_index,
    parse_showinfo_timestamps,
};
use super::types::{normalize_request, Thumbnail, ThumbnailRequest};
use super::utils::output_dimensions;
use crate::errors::ClipError;
use crate::index::Sample;
use crate::mp4::CodecConfig;
use crate::test_support::{build_avcc, idr_sample, PPS_BYTES, SPS_BYTES};
use std::path::Path;

fn test_codec_config() -> CodecConfig {
    CodecConfig {
        codec: "avc1".to_string(),
        coded_width: 1280,
        coded_height: 720,
        description: build_avcc(&SPS_BYTES, &PPS_BYTES),
    }
}

fn keyframe_at(cts_micros: i64) -> Sample {
    Sample {
        track_id: 1,
        offset: 0,
        size: 0,
        duration: 500_000,
        dts: cts_micros.max(0) as u64,
        cts: cts_micros,
        is_sync: true,
        timescale: 1_000_000,
        data: None,
    }
}

#[test]
fn test_normalize_request_defaults() {
    let normalized = normalize_request(&ThumbnailRequest::default());
    assert_eq!(normalized.start, 0);
    assert_eq!(normalized.end, None);
    assert_eq!(normalized.step, None);
    assert_eq!(normalized.quality, 1.0);
    assert_eq!(normalized.mime, "image/png");
    assert_eq!(normalized.width, None);
}

#[test]
fn test_normalize_request_clamps_quality() {
    let request = ThumbnailRequest {
        quality: Some(3.5),
        ..Default::default()
    };
    assert_eq!(normalize_request(&request).quality, 1.0);
}

#[test]
fn test_request_and_thumbnail_are_serde_roundtrippable() {
    // The message types use Option, String, and Vec fields, all of which
    // need serde's std impls.
    fn assert_serde<T: serde::Serialize + serde::de::DeserializeOwned>() {}
    assert_serde::<ThumbnailRequest>();
    assert_serde::<Thumbnail>();
}

#[test]
fn test_output_dimensions_preserve_aspect_ratio() {
    assert_eq!(output_dimensions(1280, 720, Some(320)), (320, 180));
    assert_eq!(output_dimensions(1280, 720, None), (1280, 720));
    assert_eq!(output_dimensions(640, 480, Some(100)), (100, 75));
}

#[test]
fn test_micros_to_clock() {
    assert_eq!(micros_to_clock(0), "00:00:00.000");
    assert_eq!(micros_to_clock(1_500_000), "00:00:01.500");
    assert_eq!(micros_to_clock(3_723_456_789), "01:02:03.456");
}

#[test]
fn test_parse_frame_index() {
    assert_eq!(parse_frame_index("frame_000000001.png").unwrap(), 1);
    assert_eq!(parse_frame_index("frame_000000042.png").unwrap(), 42);
}

#[test]
fn test_parse_frame_index_rejects_malformed_names() {
    for name in ["thumb.png", "frame_.png", "frame_oops.png", "frame_1.jpg"] {
        let err = parse_frame_index(name).unwrap_err();
        assert!(matches!(err, ClipError::Extraction(_)), "{}", name);
    }
}

#[test]
fn test_parse_showinfo_timestamps() {
    let stderr = "\
[Parsed_showinfo_0 @ 0x5644] n:   0 pts:      0 pts_time:0       duration_time:0.04\n\
frame=    1 fps=0.0 q=-0.0 size=N/A\n\
[Parsed_showinfo_0 @ 0x5644] n:   1 pts:  45000 pts_time:0.5     duration_time:0.04\n\
[Parsed_showinfo_0 @ 0x5644] n:   2 pts: 112500 pts_time:1.25    duration_time:0.04\n";
    assert_eq!(
        parse_showinfo_timestamps(stderr),
        vec![0, 500_000, 1_250_000]
    );
}

#[test]
fn test_parse_showinfo_timestamps_ignores_unrelated_lines() {
    let stderr = "Output #0, image2, to '/tmp/frames/frame_%09d.png':\n  Stream #0:0: Video: png\n";
    assert!(parse_showinfo_timestamps(stderr).is_empty());
}

#[tokio::test]
async fn test_collect_frames_pairs_files_with_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("frame_000000002.png"), b"second").unwrap();
    std::fs::write(dir.path().join("frame_000000001.png"), b"first").unwrap();

    let frames = collect_frames(dir.path(), &[100, 200]).await.unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].image, b"first");
    assert_eq!(frames[0].timestamp_micros, 100);
    assert_eq!(frames[1].image, b"second");
    assert_eq!(frames[1].timestamp_micros, 200);
    // Frames are consumed as they are collected.
    assert!(!dir.path().join("frame_000000001.png").exists());
}

#[tokio::test]
async fn test_collect_frames_fails_on_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("frame_000000001.png"), b"only").unwrap();

    let err = collect_frames(dir.path(), &[100, 200]).await.unwrap_err();
    assert!(matches!(err, ClipError::Extraction(_)));
}

#[test]
fn test_extract_args_keyframes_only_without_step() {
    let request = normalize_request(&ThumbnailRequest {
        start: Some(200_000),
        end: Some(1_200_000),
        ..Default::default()
    });
    let args = build_extract_args(Path::new("/tmp/in.mp4"), &request, Path::new("/tmp/frames"));

    assert_eq!(&args[0..2], &["-skip_frame".to_string(), "nokey".to_string()]);
    let ss = args.iter().position(|a| a == "-ss").unwrap();
    assert_eq!(args[ss + 1], "00:00:00.200");
    let to = args.iter().position(|a| a == "-to").unwrap();
    assert_eq!(args[to + 1], "00:00:01.200");
    let q = args.iter().position(|a| a == "-q:v").unwrap();
    assert_eq!(args[q + 1], "32");
    let threads = args.iter().position(|a| a == "-threads").unwrap();
    assert_eq!(args[threads + 1], "4");
    let vf = args.iter().position(|a| a == "-vf").unwrap();
    assert_eq!(args[vf + 1], "showinfo");
    assert!(args.last().unwrap().ends_with("frame_%09d.png"));
}

#[test]
fn test_extract_args_unbounded_end_omits_to() {
    let request = normalize_request(&ThumbnailRequest::default());
    let args = build_extract_args(Path::new("/tmp/in.mp4"), &request, Path::new("/tmp/frames"));
    assert!(!args.iter().any(|a| a == "-to"));
}

#[test]
fn test_extract_args_step_uses_fps_filter() {
    let request = normalize_request(&ThumbnailRequest {
        step: Some(250_000),
        ..Default::default()
    });
    let args = build_extract_args(Path::new("/tmp/in.mp4"), &request, Path::new("/tmp/frames"));

    assert!(!args.iter().any(|a| a == "-skip_frame"));
    let vf = args.iter().position(|a| a == "-vf").unwrap();
    assert_eq!(args[vf + 1], "fps=1000000/250000,showinfo");
}

#[test]
fn test_sample_to_annexb_skips_parameter_sets() {
    // SPS + PPS + IDR, all length-prefixed; only the IDR should survive.
    let mut payload = Vec::new();
    for nalu in [&SPS_BYTES[..], &PPS_BYTES[..]] {
        payload.extend_from_slice(&(nalu.len() as u32).to_be_bytes());
        payload.extend_from_slice(nalu);
    }
    payload.extend_from_slice(&idr_sample());

    let annexb = sample_to_annexb(&payload, 4).unwrap();
    assert_eq!(&annexb[0..4], &[0, 0, 0, 1]);
    assert_eq!(annexb[4] & 0x1f, 5);
    assert_eq!(annexb.len(), 4 + idr_sample().len() - 4);
}

#[test]
fn test_sample_to_annexb_rejects_overlong_nalu() {
    let payload = [0, 0, 0, 200, 0x65, 0x88];
    assert!(sample_to_annexb(&payload, 4).is_err());
}

#[test]
fn test_decode_pipeline_produces_one_frame_per_sample() {
    let mut pipeline = DecodePipeline::new(&test_codec_config(), None, "image/png", 1.0).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Configured);

    for cts in [0, 500_000, 1_000_000] {
        pipeline.submit(&keyframe_at(cts), &idr_sample()).unwrap();
    }
    assert_eq!(pipeline.state(), PipelineState::Decoding);

    let frames = pipeline.finish().unwrap();
    assert_eq!(frames.len(), 3);
    let timestamps: Vec<i64> = frames.iter().map(|f| f.timestamp_micros).collect();
    assert_eq!(timestamps, vec![0, 500_000, 1_000_000]);
    // PNG signature
    assert_eq!(&frames[0].image[0..4], &[0x89, b'P', b'N', b'G']);
}

#[test]
fn test_decode_pipeline_converts_ticks_to_micros() {
    let mut pipeline = DecodePipeline::new(&test_codec_config(), None, "image/png", 1.0).unwrap();

    // One keyframe at 90000 ticks in a 90 kHz track, exactly one second.
    let sample = Sample {
        timescale: 90_000,
        cts: 90_000,
        dts: 90_000,
        ..keyframe_at(0)
    };
    pipeline.submit(&sample, &idr_sample()).unwrap();

    let frames = pipeline.finish().unwrap();
    assert_eq!(frames[0].timestamp_micros, 1_000_000);
}

#[test]
fn test_decode_pipeline_scales_output() {
    let mut pipeline =
        DecodePipeline::new(&test_codec_config(), Some(320), "image/png", 1.0).unwrap();
    pipeline.submit(&keyframe_at(0), &idr_sample()).unwrap();

    let frames = pipeline.finish().unwrap();
    let decoded = image::load_from_memory(&frames[0].image).unwrap();
    assert_eq!(decoded.width(), 320);
    assert_eq!(decoded.height(), 180);
}

#[test]
fn test_decode_pipeline_fails_on_invalid_sample() {
    let mut pipeline = DecodePipeline::new(&test_codec_config(), None, "image/png", 1.0).unwrap();

    // A length-prefixed blob that is not a valid slice.
    let mut payload = 8u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&[0x65, 0, 0, 0, 0, 0, 0, 0]);
    let result = pipeline.submit(&keyframe_at(0), &payload);
    assert!(matches!(result, Err(ClipError::Decode(_))));
}

#[test]
fn test_decode_pipeline_rejects_non_h264_tracks() {
    let config = CodecConfig {
        codec: "vp8".to_string(),
        coded_width: 640,
        coded_height: 360,
        description: vec![1, 0, 0],
    };
    let result = DecodePipeline::new(&config, None, "image/png", 1.0);
    assert!(matches!(result, Err(ClipError::Configuration(_))));
}

#[test]
fn test_decode_pipeline_rejects_unknown_mime() {
    let mut pipeline =
        DecodePipeline::new(&test_codec_config(), None, "image/webp", 1.0).unwrap();
    assert!(pipeline.submit(&keyframe_at(0), &idr_sample()).is_err());
}
