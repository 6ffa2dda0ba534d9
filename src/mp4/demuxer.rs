use super::trak::{parse_movie, MovieInfo, TrackKind};
use crate::errors::{ClipError, ClipResult, Mp4Error};
use crate::index::Sample;
use crate::streams::SeekableStream;
use log::{debug, warn};

/// Chunk size for the forward read pass.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Samples are delivered to the subscriber in batches of at most this many.
const SAMPLE_BATCH: usize = 100;

type ReadyHandler<'a> = Box<dyn FnMut(&MovieInfo) + 'a>;
type SamplesHandler<'a> = Box<dyn FnMut(u32, TrackKind, &[Sample]) + 'a>;

/// Streaming MP4 demuxer. Performs a single forward pass over the source,
/// retaining only the moov payload, then reports track metadata and
/// metadata-only sample index entries through subscription callbacks:
/// `on_ready` fires exactly once when all tracks are known, `on_samples`
/// fires zero or more times afterwards, and `parse` returning is the
/// terminal signal.
pub struct Mp4Demuxer<'a, S: SeekableStream> {
    stream: S,
    on_ready: Option<ReadyHandler<'a>>,
    on_samples: Option<SamplesHandler<'a>>,
}

impl<'a, S: SeekableStream> Mp4Demuxer<'a, S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            on_ready: None,
            on_samples: None,
        }
    }

    /// Subscribe to the ready event. The handler is invoked exactly once,
    /// after the parse pass has seen the complete moov box.
    pub fn on_ready(&mut self, handler: impl FnMut(&MovieInfo) + 'a) -> &mut Self {
        self.on_ready = Some(Box::new(handler));
        self
    }

    /// Subscribe to sample batches, tagged with track id and media kind.
    pub fn on_samples(&mut self, handler: impl FnMut(u32, TrackKind, &[Sample]) + 'a) -> &mut Self {
        self.on_samples = Some(Box::new(handler));
        self
    }

    /// Run the forward parse pass to exhaustion and deliver the subscribed
    /// events. Consumes the demuxer; the parse is single-shot.
    pub fn parse(mut self) -> ClipResult<MovieInfo> {
        let mut scanner = BoxScanner::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];

        loop {
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            scanner.push(&chunk[..n])?;
        }

        let moov = scanner.finish()?;
        let movie = parse_movie(&moov)?;
        debug!("Parsed moov: {} track(s)", movie.tracks.len());

        if let Some(mut on_ready) = self.on_ready.take() {
            on_ready(&movie);
        }

        if let Some(mut on_samples) = self.on_samples.take() {
            for track in &movie.tracks {
                let kind = track.kind;
                if kind == TrackKind::Other {
                    continue;
                }
                let samples = track.build_samples()?;
                for batch in samples.chunks(SAMPLE_BATCH) {
                    on_samples(track.id, kind, batch);
                }
            }
        }

        Ok(movie)
    }
}

enum ScanState {
    /// Accumulating a box header.
    Header,
    /// Discarding payload bytes of a box we do not retain.
    Skip(u64),
    /// Accumulating the moov payload.
    Moov(usize),
}

/// Incremental top-level box scanner. Consumes chunks in file order and
/// retains only the moov payload; everything else is counted past.
struct BoxScanner {
    state: ScanState,
    header: Vec<u8>,
    moov: Option<Vec<u8>>,
}

impl BoxScanner {
    fn new() -> Self {
        Self {
            state: ScanState::Header,
            header: Vec::with_capacity(16),
            moov: None,
        }
    }

    fn push(&mut self, mut data: &[u8]) -> ClipResult<()> {
        while !data.is_empty() {
            match &mut self.state {
                ScanState::Skip(remaining) => {
                    let take = (*remaining).min(data.len() as u64) as usize;
                    data = &data[take..];
                    *remaining -= take as u64;
                    if *remaining == 0 {
                        self.state = ScanState::Header;
                    }
                }
                ScanState::Moov(remaining) => {
                    let take = (*remaining).min(data.len());
                    self.moov
                        .as_mut()
                        .expect("moov buffer exists while in Moov state")
                        .extend_from_slice(&data[..take]);
                    data = &data[take..];
                    *remaining -= take;
                    if *remaining == 0 {
                        self.state = ScanState::Header;
                    }
                }
                ScanState::Header => {
                    let wanted = self.header_bytes_wanted();
                    let take = (wanted - self.header.len()).min(data.len());
                    self.header.extend_from_slice(&data[..take]);
                    data = &data[take..];
                    if self.header.len() == self.header_bytes_wanted() {
                        self.begin_box()?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Header length for the box currently being accumulated: 8 bytes, or 16
    /// once the size field announces a 64-bit largesize.
    fn header_bytes_wanted(&self) -> usize {
        if self.header.len() >= 4 && self.header[0..4] == [0, 0, 0, 1] {
            16
        } else {
            8
        }
    }

    fn begin_box(&mut self) -> ClipResult<()> {
        let size32 = u32::from_be_bytes([self.header[0], self.header[1], self.header[2], self.header[3]]);
        let name: [u8; 4] = [self.header[4], self.header[5], self.header[6], self.header[7]];
        let header_len = if size32 == 1 { 16u64 } else { 8u64 };
        let size = if size32 == 1 {
            u64::from_be_bytes([
                self.header[8],
                self.header[9],
                self.header[10],
                self.header[11],
                self.header[12],
                self.header[13],
                self.header[14],
                self.header[15],
            ])
        } else {
            size32 as u64
        };
        self.header.clear();

        if size == 0 {
            // Box extends to end of file. Legal for a trailing mdat.
            if &name == b"moov" {
                return Err(ClipError::Mp4(Mp4Error::new(
                    "moov box with unbounded size is not supported",
                )));
            }
            self.state = ScanState::Skip(u64::MAX);
            return Ok(());
        }

        if size < header_len {
            return Err(ClipError::Mp4(Mp4Error::new(format!(
                "Invalid top-level box size {} for {}",
                size,
                String::from_utf8_lossy(&name)
            ))));
        }

        let payload = size - header_len;
        if &name == b"moov" {
            if self.moov.is_some() {
                return Err(ClipError::Mp4(Mp4Error::new("Duplicate moov box")));
            }
            self.moov = Some(Vec::with_capacity(payload as usize));
            self.state = if payload == 0 {
                ScanState::Header
            } else {
                ScanState::Moov(payload as usize)
            };
        } else {
            self.state = if payload == 0 {
                ScanState::Header
            } else {
                ScanState::Skip(payload)
            };
        }
        Ok(())
    }

    fn finish(self) -> ClipResult<Vec<u8>> {
        if let ScanState::Moov(remaining) = self.state {
            if remaining > 0 {
                return Err(ClipError::Mp4(Mp4Error::new(
                    "Source ended inside the moov box",
                )));
            }
        }
        if !self.header.is_empty() {
            warn!("{} trailing bytes after the last complete box", self.header.len());
        }
        self.moov
            .ok_or_else(|| ClipError::Mp4(Mp4Error::new("No moov box found in source")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_test_mp4, idr_sample, TestSample};
    use std::io::Cursor;

    #[test]
    fn test_parse_reports_ready_once_then_sample_batches() {
        let file = build_test_mp4(
            1_000_000,
            &[
                (idr_sample(), TestSample::sync(0, 0)),
                (idr_sample(), TestSample::sync(0, 500_000)),
                (idr_sample(), TestSample::sync(0, 1_000_000)),
            ],
        );

        let mut ready_calls = 0;
        let mut collected = Vec::new();
        {
            let mut demuxer = Mp4Demuxer::new(Cursor::new(file));
            demuxer.on_ready(|movie| {
                ready_calls += 1;
                assert!(movie.primary_video_track().is_some());
            });
            demuxer.on_samples(|track_id, kind, samples| {
                assert_eq!(track_id, 1);
                assert_eq!(kind, TrackKind::Video);
                collected.extend_from_slice(samples);
            });
            demuxer.parse().unwrap();
        }

        assert_eq!(ready_calls, 1);
        assert_eq!(collected.len(), 3);
        // Samples are metadata-only until a pipeline materializes them.
        assert!(collected.iter().all(|s| s.data.is_none()));
        assert_eq!(collected[1].cts_micros(), 500_000);
    }

    #[test]
    fn test_parse_without_moov_fails() {
        let mut file = Vec::new();
        crate::mp4::write_box_header(&mut file, "mdat", 16);
        file.extend_from_slice(&[0u8; 8]);

        let demuxer = Mp4Demuxer::new(Cursor::new(file));
        assert!(demuxer.parse().is_err());
    }

    #[test]
    fn test_scanner_handles_split_headers() {
        let file = build_test_mp4(1_000_000, &[(idr_sample(), TestSample::sync(0, 0))]);

        // Feed the scanner in 3-byte slivers to exercise partial headers.
        let mut scanner = BoxScanner::new();
        for piece in file.chunks(3) {
            scanner.push(piece).unwrap();
        }
        let moov = scanner.finish().unwrap();
        assert!(crate::mp4::parse_movie(&moov).is_ok());
    }

    #[test]
    fn test_truncated_moov_fails() {
        let mut file = build_test_mp4(1_000_000, &[(idr_sample(), TestSample::sync(0, 0))]);
        file.truncate(file.len() - 4);

        let demuxer = Mp4Demuxer::new(Cursor::new(file));
        assert!(demuxer.parse().is_err());
    }
}
