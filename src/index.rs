use std::collections::BTreeMap;

/// One encoded access unit of a track, as recorded in the container's sample
/// tables. The raw payload is not attached; the pipelines fetch it by
/// offset/size when a sample is actually decoded.
#[derive(Debug, Clone)]
pub struct Sample {
    pub track_id: u32,
    /// Absolute byte offset within the source.
    pub offset: u64,
    pub size: u32,
    /// Duration in the track's timescale ticks.
    pub duration: u32,
    /// Decode timestamp in timescale ticks.
    pub dts: u64,
    /// Composition timestamp in timescale ticks. Can go negative with
    /// version 1 ctts offsets.
    pub cts: i64,
    pub is_sync: bool,
    pub timescale: u32,
    /// Raw payload, present only when explicitly materialized.
    pub data: Option<Vec<u8>>,
}

impl Sample {
    /// Composition timestamp converted to microseconds.
    pub fn cts_micros(&self) -> i64 {
        if self.timescale == 0 {
            return 0;
        }
        self.cts * 1_000_000 / self.timescale as i64
    }

    /// Duration converted to microseconds.
    pub fn duration_micros(&self) -> u64 {
        if self.timescale == 0 {
            return 0;
        }
        self.duration as u64 * 1_000_000 / self.timescale as u64
    }
}

/// Per-track ordered sample lists. Append-only while the parse pass runs,
/// immutable once it completes.
#[derive(Debug, Default)]
pub struct SampleIndex {
    tracks: BTreeMap<u32, Vec<Sample>>,
}

impl SampleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to its track's list. Samples arrive in increasing dts
    /// order per track.
    pub fn index(&mut self, sample: Sample) {
        self.tracks.entry(sample.track_id).or_default().push(sample);
    }

    /// All samples of a track, in dts order.
    pub fn samples(&self, track_id: u32) -> &[Sample] {
        self.tracks
            .get(&track_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn sample_count(&self, track_id: u32) -> usize {
        self.samples(track_id).len()
    }

    /// Every sync sample of the track whose composition timestamp (in
    /// microseconds) lies in `[start, end]`, both ends inclusive, in
    /// non-decreasing cts order. `None` for `end` means unbounded.
    pub fn select_keyframes_in_range(
        &self,
        track_id: u32,
        start_micros: u64,
        end_micros: Option<u64>,
    ) -> Vec<&Sample> {
        let mut selected: Vec<&Sample> = self
            .samples(track_id)
            .iter()
            .filter(|sample| {
                if !sample.is_sync {
                    return false;
                }
                let cts = sample.cts_micros();
                if cts < start_micros as i64 {
                    return false;
                }
                match end_micros {
                    Some(end) => cts <= end as i64,
                    None => true,
                }
            })
            .collect();
        selected.sort_by_key(|sample| sample.cts_micros());
        selected
    }

    /// Index of the sync sample nearest to but not past `time_micros`,
    /// within the track's dts-ordered list.
    pub fn nearest_preceding_keyframe(&self, track_id: u32, time_micros: u64) -> Option<usize> {
        self.samples(track_id)
            .iter()
            .enumerate()
            .filter(|(_, sample)| sample.is_sync && sample.cts_micros() <= time_micros as i64)
            .max_by_key(|(_, sample)| sample.cts_micros())
            .map(|(i, _)| i)
    }
}
