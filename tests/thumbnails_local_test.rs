use clipstill::test_support::{build_test_mp4, idr_sample, TestSample};
use clipstill::thumbnails::NativeDecodeExtractor;
use clipstill::{extract_thumbnails, seek_thumbnail, ClipError, ThumbnailExtractor, ThumbnailRequest};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_test_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(bytes).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// A four-keyframe file at 0s, 0.5s, 1s, and 1.5s.
fn keyframe_test_file() -> NamedTempFile {
    let bytes = build_test_mp4(
        1_000_000,
        &[
            (idr_sample(), TestSample::sync(0, 0)),
            (idr_sample(), TestSample::sync(0, 500_000)),
            (idr_sample(), TestSample::sync(0, 1_000_000)),
            (idr_sample(), TestSample::sync(0, 1_500_000)),
        ],
    );
    write_test_file(&bytes)
}

#[tokio::test]
async fn test_extract_all_keyframes() {
    let file = keyframe_test_file();
    let frames = extract_thumbnails(file.path(), &ThumbnailRequest::default())
        .await
        .expect("Extraction failed");

    assert_eq!(frames.len(), 4);
    let timestamps: Vec<i64> = frames.iter().map(|f| f.timestamp_micros).collect();
    assert_eq!(timestamps, vec![0, 500_000, 1_000_000, 1_500_000]);
    for frame in &frames {
        assert_eq!(&frame.image[0..4], &[0x89, b'P', b'N', b'G']);
    }
}

#[tokio::test]
async fn test_extract_range_is_inclusive() {
    let file = keyframe_test_file();
    let request = ThumbnailRequest {
        start: Some(500_000),
        end: Some(1_000_000),
        ..Default::default()
    };
    let frames = extract_thumbnails(file.path(), &request)
        .await
        .expect("Extraction failed");

    let timestamps: Vec<i64> = frames.iter().map(|f| f.timestamp_micros).collect();
    assert_eq!(timestamps, vec![500_000, 1_000_000]);
}

#[tokio::test]
async fn test_extract_scaled_width() {
    let file = keyframe_test_file();
    let request = ThumbnailRequest {
        end: Some(0),
        width: Some(320),
        ..Default::default()
    };
    let frames = extract_thumbnails(file.path(), &request)
        .await
        .expect("Extraction failed");

    assert_eq!(frames.len(), 1);
    let decoded = image::load_from_memory(&frames[0].image).expect("Invalid image output");
    assert_eq!(decoded.width(), 320);
    // 1280x720 source, aspect ratio preserved
    assert_eq!(decoded.height(), 180);
}

#[tokio::test]
async fn test_extract_step_thins_keyframes() {
    let file = keyframe_test_file();
    let request = ThumbnailRequest {
        step: Some(1_000_000),
        ..Default::default()
    };
    let frames = extract_thumbnails(file.path(), &request)
        .await
        .expect("Extraction failed");

    // One frame per 1s slot: the keyframes at 0s and 1s.
    let timestamps: Vec<i64> = frames.iter().map(|f| f.timestamp_micros).collect();
    assert_eq!(timestamps, vec![0, 1_000_000]);
}

#[tokio::test]
async fn test_seek_returns_preceding_keyframe_output() {
    let file = keyframe_test_file();

    let frame = seek_thumbnail(file.path(), 700_000)
        .await
        .expect("Seek failed");
    assert_eq!(frame.timestamp_micros, 500_000);

    let frame = seek_thumbnail(file.path(), 1_500_000)
        .await
        .expect("Seek failed");
    assert_eq!(frame.timestamp_micros, 1_500_000);
}

#[tokio::test]
async fn test_seek_before_first_frame_is_not_found() {
    let bytes = build_test_mp4(
        1_000_000,
        &[(idr_sample(), TestSample::sync(0, 1_000_000))],
    );
    let file = write_test_file(&bytes);

    let mut extractor = NativeDecodeExtractor::open(file.path()).expect("Open failed");
    let result = extractor.seek(500_000).await;
    assert!(matches!(result, Err(ClipError::NotFound(_))));
}

#[tokio::test]
async fn test_open_without_video_track_is_configuration_error() {
    let mut bytes = build_test_mp4(1_000_000, &[(idr_sample(), TestSample::sync(0, 0))]);

    // Rewrite the handler type so the only track reads as audio.
    let position = bytes
        .windows(4)
        .position(|window| window == b"vide")
        .expect("No handler in fixture");
    bytes[position..position + 4].copy_from_slice(b"soun");
    let file = write_test_file(&bytes);

    let result = NativeDecodeExtractor::open(file.path());
    assert!(matches!(result, Err(ClipError::Configuration(_))));

    // Backend selection must fail the same way; a track-less source is not
    // a case for the external transcoder, whether or not one is installed.
    let result = clipstill::new_extractor(file.path());
    assert!(matches!(result, Err(ClipError::Configuration(_))));
}

#[tokio::test]
async fn test_empty_range_yields_no_frames() {
    let file = keyframe_test_file();
    let request = ThumbnailRequest {
        start: Some(100_000),
        end: Some(400_000),
        ..Default::default()
    };
    let frames = extract_thumbnails(file.path(), &request)
        .await
        .expect("Extraction failed");
    assert!(frames.is_empty());
}
