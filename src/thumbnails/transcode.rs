use super::types::{NormalizedRequest, Thumbnail};
use crate::errors::{ClipResult, ExtractionError, NotFoundError};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;

/// Decoder thread count handed to ffmpeg.
const DECODE_THREADS: u32 = 4;

/// External transcode pipeline. Shells out to ffmpeg to dump frames as
/// sequentially numbered image files into a private workspace, recovers
/// each frame's presentation time from the showinfo filter's stderr
/// report, and returns the collected frames in timestamp order. Used when
/// the track's codec has no in-process decoder.
pub struct TranscodePipeline {
    ffmpeg: PathBuf,
    input: PathBuf,
    workspace: TempDir,
}

impl TranscodePipeline {
    pub fn new(ffmpeg: PathBuf, input: PathBuf) -> ClipResult<Self> {
        let workspace = TempDir::new()
            .map_err(|e| ExtractionError::new(format!("Failed to create workspace: {}", e)))?;
        Ok(Self {
            ffmpeg,
            input,
            workspace,
        })
    }

    /// Extract every selected frame in the request's range. Keyframes only
    /// unless a sampling interval is set.
    pub async fn extract(&self, request: &NormalizedRequest) -> ClipResult<Vec<Thumbnail>> {
        let frames_dir = self.workspace.path().join("frames");
        tokio::fs::create_dir_all(&frames_dir).await.map_err(|e| {
            ExtractionError::new(format!("Failed to create frames directory: {}", e))
        })?;

        let args = build_extract_args(&self.input, request, &frames_dir);
        let stderr = self.run_ffmpeg(&args).await?;

        // Input seeking resets the output timeline to the range start, so
        // showinfo reports offsets from there.
        let timestamps: Vec<i64> = parse_showinfo_timestamps(&stderr)
            .into_iter()
            .map(|offset| request.start as i64 + offset)
            .collect();
        let mut frames = collect_frames(&frames_dir, &timestamps).await?;
        frames.sort_by_key(|frame| frame.timestamp_micros);
        debug!("External extraction produced {} frame(s)", frames.len());
        Ok(frames)
    }

    /// Extract the single frame displayed at `time_micros`.
    pub async fn seek(&self, time_micros: u64, request: &NormalizedRequest) -> ClipResult<Thumbnail> {
        let output = self.workspace.path().join("seek.png");
        let args = build_seek_args(&self.input, time_micros, request, &output);
        let stderr = self.run_ffmpeg(&args).await?;

        let image = tokio::fs::read(&output).await.map_err(|_| {
            NotFoundError::new(format!("No frame available at {}us", time_micros))
        })?;
        tokio::fs::remove_file(&output).await.ok();

        // The frame ffmpeg delivers is the first at or after the seek
        // point; its reported offset gives the real presentation time.
        let offset = parse_showinfo_timestamps(&stderr).into_iter().next().unwrap_or(0);
        Ok(Thumbnail {
            image,
            timestamp_micros: time_micros as i64 + offset,
        })
    }

    /// Run ffmpeg to completion, returning its stderr on success.
    async fn run_ffmpeg(&self, args: &[String]) -> ClipResult<String> {
        debug!("Running {} {}", self.ffmpeg.display(), args.join(" "));
        let output = Command::new(&self.ffmpeg)
            .args(args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .output()
            .await
            .map_err(|e| ExtractionError::new(format!("Failed to run ffmpeg: {}", e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(ExtractionError::new(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }
        Ok(stderr)
    }
}

/// Arguments for a ranged frame dump. The range is applied on the input
/// side, the showinfo filter reports each delivered frame's presentation
/// offset on stderr, and frames land in `frames_dir` as
/// `frame_<sequence>.png`.
pub(crate) fn build_extract_args(
    input: &Path,
    request: &NormalizedRequest,
    frames_dir: &Path,
) -> Vec<String> {
    let mut args = Vec::new();

    match request.step {
        // No sampling interval: decode keyframes only.
        None => {
            args.push("-skip_frame".to_string());
            args.push("nokey".to_string());
        }
        Some(_) => {}
    }

    args.push("-ss".to_string());
    args.push(micros_to_clock(request.start));
    if let Some(end) = request.end {
        args.push("-to".to_string());
        args.push(micros_to_clock(end));
    }

    args.push("-i".to_string());
    args.push(input.display().to_string());

    args.push("-vf".to_string());
    args.push(match request.step {
        Some(step) => format!("fps=1000000/{},showinfo", step),
        None => "showinfo".to_string(),
    });

    args.push("-vsync".to_string());
    args.push("vfr".to_string());

    args.push("-q:v".to_string());
    args.push(format!("{}", quality_to_qscale(request.quality)));

    args.push("-threads".to_string());
    args.push(DECODE_THREADS.to_string());

    args.push(frames_dir.join("frame_%09d.png").display().to_string());
    args
}

/// Arguments for a single-frame grab at an absolute time.
pub(crate) fn build_seek_args(
    input: &Path,
    time_micros: u64,
    request: &NormalizedRequest,
    output: &Path,
) -> Vec<String> {
    vec![
        "-ss".to_string(),
        micros_to_clock(time_micros),
        "-i".to_string(),
        input.display().to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        "showinfo".to_string(),
        "-q:v".to_string(),
        format!("{}", quality_to_qscale(request.quality)),
        output.display().to_string(),
    ]
}

/// Map the [0, 1] quality knob onto ffmpeg's 0..32 qscale range.
fn quality_to_qscale(quality: f32) -> u32 {
    (quality * 32.0).round() as u32
}

/// Format a microsecond offset as ffmpeg clock time, `HH:MM:SS.mmm`.
pub(crate) fn micros_to_clock(micros: u64) -> String {
    let millis = micros / 1_000;
    let seconds = millis / 1_000;
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        hours,
        minutes,
        seconds % 60,
        millis % 1_000
    )
}

/// Recover the sequence number embedded in a dumped frame's filename,
/// e.g. `frame_000000042.png` is frame 42.
pub(crate) fn parse_frame_index(file_name: &str) -> ClipResult<u64> {
    let malformed = || {
        ExtractionError::new(format!(
            "Unrecognized frame filename from transcoder: {}",
            file_name
        ))
    };

    let stem = file_name
        .strip_prefix("frame_")
        .and_then(|rest| rest.strip_suffix(".png"))
        .ok_or_else(malformed)?;
    stem.parse().map_err(|_| malformed().into())
}

/// Presentation offsets reported by the showinfo filter, one per delivered
/// frame, in stderr order. Lines look like
/// `[Parsed_showinfo_0 @ 0x...] n: 0 pts: 45000 pts_time:0.5 ...`.
pub(crate) fn parse_showinfo_timestamps(stderr: &str) -> Vec<i64> {
    let mut timestamps = Vec::new();
    for line in stderr.lines() {
        let Some(pos) = line.find("pts_time:") else {
            continue;
        };
        let token: String = line[pos + "pts_time:".len()..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        if let Ok(seconds) = token.parse::<f64>() {
            timestamps.push((seconds * 1_000_000.0).round() as i64);
        }
    }
    timestamps
}

/// Read the dumped frames in sequence order, pairing each with its
/// reported timestamp. A count mismatch means frames and timestamps can
/// no longer be correlated, which fails the request.
pub(crate) async fn collect_frames(
    frames_dir: &Path,
    timestamps: &[i64],
) -> ClipResult<Vec<Thumbnail>> {
    let mut indexed: Vec<(u64, PathBuf)> = Vec::new();
    let mut entries = tokio::fs::read_dir(frames_dir).await.map_err(|e| {
        ExtractionError::new(format!("Failed to list extracted frames: {}", e))
    })?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ExtractionError::new(format!("Failed to list extracted frames: {}", e)))?
    {
        let file_name = entry.file_name();
        let index = parse_frame_index(&file_name.to_string_lossy())?;
        indexed.push((index, entry.path()));
    }
    indexed.sort_by_key(|(index, _)| *index);

    if indexed.len() != timestamps.len() {
        return Err(ExtractionError::new(format!(
            "Transcoder produced {} frame(s) but reported {} timestamp(s)",
            indexed.len(),
            timestamps.len()
        ))
        .into());
    }

    let mut frames = Vec::with_capacity(indexed.len());
    for ((_, path), &timestamp_micros) in indexed.iter().zip(timestamps) {
        let image = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::new(format!("Failed to read frame: {}", e)))?;
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
        frames.push(Thumbnail {
            image,
            timestamp_micros,
        });
    }
    Ok(frames)
}
