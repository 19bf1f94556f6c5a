use std::ops::{Range, RangeInclusive};

use serde::{Deserialize, Serialize};

use super::interval::{slice_by_start, Interval};
use crate::error::PipelineError;
use crate::util::{search_leftmost, search_rightmost};

/// Length of the pitch and timbre vectors of a segment.
pub const SEGMENT_VECTOR_LEN: usize = 12;

// ── Tempo ─────────────────────────────────────────────────────────

/// Tempo of a track or section. A bpm of zero means the provider found no
/// usable rhythm; beat-derived durations are then undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TempoRaw")]
pub struct Tempo {
    bpm: f64,
    time_signature: u32,
}

#[derive(Deserialize)]
struct TempoRaw {
    bpm: f64,
    time_signature: u32,
}

impl TryFrom<TempoRaw> for Tempo {
    type Error = PipelineError;
    fn try_from(raw: TempoRaw) -> Result<Self, Self::Error> {
        Tempo::new(raw.bpm, raw.time_signature)
    }
}

/// Time signatures the analysis provider reports, in beats per bar.
pub const BEATS_PER_BAR: RangeInclusive<u32> = 3..=7;

impl Tempo {
    pub fn new(bpm: f64, time_signature: u32) -> Result<Self, PipelineError> {
        if !bpm.is_finite() || bpm < 0.0 {
            return Err(PipelineError::invalid(format!("Invalid tempo: {bpm} bpm")));
        }
        if !BEATS_PER_BAR.contains(&time_signature) {
            return Err(PipelineError::invalid(format!(
                "Invalid time signature: {time_signature}"
            )));
        }
        Ok(Self {
            bpm,
            time_signature,
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Beats per bar.
    pub fn time_signature(&self) -> u32 {
        self.time_signature
    }

    /// False for the zero-bpm sentinel and tempos too slow to sync to.
    pub fn has_rhythm(&self) -> bool {
        self.bpm >= 1.0
    }

    pub fn seconds_per_beat(&self) -> Option<f64> {
        (self.bpm > 0.0).then(|| 60.0 / self.bpm)
    }

    pub fn seconds_per_bar(&self) -> Option<f64> {
        self.seconds_per_beat()
            .map(|spb| spb * f64::from(self.time_signature))
    }
}

// ── Track-level data ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub duration: f64,
    /// Overall loudness in dB, typically -60..0.
    pub loudness: f64,
    pub tempo: Tempo,
    /// Always starts at zero.
    pub fade_in: Option<Interval>,
    /// Always ends at the track duration.
    pub fade_out: Option<Interval>,
}

/// Track-wide audio features. Only `energy` and `loudness` drive the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFeatures {
    pub acousticness: f64,
    pub danceability: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub valence: f64,
}

/// Bars, beats and tatums. Each list is start-ordered and non-overlapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timings {
    pub bars: Vec<Interval>,
    pub beats: Vec<Interval>,
    pub tatums: Vec<Interval>,
}

impl Timings {
    /// The grid restricted to intervals starting inside `range`.
    pub fn slice(&self, range: &Interval) -> Timings {
        Timings {
            bars: slice_by_start(&self.bars, range, Interval::start).to_vec(),
            beats: slice_by_start(&self.beats, range, Interval::start).to_vec(),
            tatums: slice_by_start(&self.tatums, range, Interval::start).to_vec(),
        }
    }
}

// ── Segments ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timbre(pub [f64; SEGMENT_VECTOR_LEN]);

impl Timbre {
    pub fn euclidean_distance(&self, other: &Timbre) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Fine-grained acoustic unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub interval: Interval,
    pub confidence: f64,
    pub loudness_start: f64,
    pub loudness_max: f64,
    /// Offset of the loudness peak from the segment start, in seconds.
    pub loudness_max_time: f64,
    pub loudness_end: f64,
    pub pitches: [f64; SEGMENT_VECTOR_LEN],
    pub timbre: Timbre,
}

// ── Sections ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Minor,
    Major,
    Unknown,
}

impl From<i32> for Mode {
    fn from(value: i32) -> Self {
        match value {
            0 => Mode::Minor,
            1 => Mode::Major,
            _ => Mode::Unknown,
        }
    }
}

/// A contiguous part of the track with its own loudness and tempo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub interval: Interval,
    pub loudness: f64,
    pub tempo: Tempo,
    /// Pitch class 0..=11, None when undetected.
    pub key: Option<u8>,
    pub mode: Mode,
    /// Grid intervals whose start lies inside this section.
    pub timings: Timings,
    /// Indexes into [`AudioAnalysis::segments`] of segments starting inside this section.
    pub segments: Range<usize>,
}

// ── Provider input ────────────────────────────────────────────────

/// Track record as delivered by the analysis provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrack {
    pub duration: f64,
    pub loudness: f64,
    pub tempo: f64,
    pub time_signature: u32,
    #[serde(default)]
    pub end_of_fade_in: f64,
    #[serde(default)]
    pub start_of_fade_out: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSection {
    pub start: f64,
    pub duration: f64,
    pub loudness: f64,
    pub tempo: f64,
    #[serde(default = "RawSection::default_key")]
    pub key: i32,
    #[serde(default = "RawSection::default_key")]
    pub mode: i32,
    pub time_signature: u32,
}

impl RawSection {
    fn default_key() -> i32 {
        -1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub duration: f64,
    pub confidence: f64,
    pub loudness_start: f64,
    pub loudness_max: f64,
    pub loudness_max_time: f64,
    #[serde(default)]
    pub loudness_end: f64,
    pub pitches: Vec<f64>,
    pub timbre: Vec<f64>,
}

/// Full analysis document as delivered by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAnalysis {
    pub track: RawTrack,
    #[serde(default)]
    pub bars: Vec<Interval>,
    #[serde(default)]
    pub beats: Vec<Interval>,
    #[serde(default)]
    pub tatums: Vec<Interval>,
    #[serde(default)]
    pub sections: Vec<RawSection>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

// ── Typed analysis ────────────────────────────────────────────────

/// Immutable, validated view of one track's analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioAnalysis {
    pub track: TrackInfo,
    pub features: AudioFeatures,
    pub timings: Timings,
    pub sections: Vec<Section>,
    pub segments: Vec<Segment>,
}

fn interval(what: &str, start: f64, duration: f64) -> Result<Interval, PipelineError> {
    Interval::new(start, duration).ok_or_else(|| {
        PipelineError::invalid(format!(
            "Invalid {what} interval: start={start}, duration={duration}"
        ))
    })
}

fn vector(what: &str, values: &[f64]) -> Result<[f64; SEGMENT_VECTOR_LEN], PipelineError> {
    values.try_into().map_err(|_| {
        PipelineError::invalid(format!(
            "Segment {what} must have {SEGMENT_VECTOR_LEN} values, got {}",
            values.len()
        ))
    })
}

fn ensure_ordered(what: &str, starts: impl Iterator<Item = f64>) -> Result<(), PipelineError> {
    let mut previous = f64::NEG_INFINITY;
    for start in starts {
        if start < previous {
            return Err(PipelineError::invalid(format!(
                "{what} must be ordered by start ({start} follows {previous})"
            )));
        }
        previous = start;
    }
    Ok(())
}

impl AudioAnalysis {
    /// Validate provider data and attribute grid intervals and segments to sections.
    pub fn from_raw(raw: RawAnalysis, features: AudioFeatures) -> Result<Self, PipelineError> {
        let RawAnalysis {
            track,
            bars,
            beats,
            tatums,
            sections,
            segments,
        } = raw;

        if !track.duration.is_finite() || track.duration < 0.0 {
            return Err(PipelineError::invalid(format!(
                "Invalid track duration: {}",
                track.duration
            )));
        }
        let fade_in = (track.end_of_fade_in > 0.0)
            .then(|| interval("fade-in", 0.0, track.end_of_fade_in))
            .transpose()?;
        let fade_out = track
            .start_of_fade_out
            .filter(|&start| start < track.duration)
            .map(|start| interval("fade-out", start, track.duration - start))
            .transpose()?;
        let track = TrackInfo {
            duration: track.duration,
            loudness: track.loudness,
            tempo: Tempo::new(track.tempo, track.time_signature)?,
            fade_in,
            fade_out,
        };

        ensure_ordered("bars", bars.iter().map(Interval::start))?;
        ensure_ordered("beats", beats.iter().map(Interval::start))?;
        ensure_ordered("tatums", tatums.iter().map(Interval::start))?;
        ensure_ordered("sections", sections.iter().map(|s| s.start))?;
        ensure_ordered("segments", segments.iter().map(|s| s.start))?;
        let timings = Timings {
            bars,
            beats,
            tatums,
        };

        let segments = segments
            .into_iter()
            .map(|s| {
                Ok(Segment {
                    interval: interval("segment", s.start, s.duration)?,
                    confidence: s.confidence,
                    loudness_start: s.loudness_start,
                    loudness_max: s.loudness_max,
                    loudness_max_time: s.loudness_max_time,
                    loudness_end: s.loudness_end,
                    pitches: vector("pitches", &s.pitches)?,
                    timbre: Timbre(vector("timbre", &s.timbre)?),
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        let sections = sections
            .into_iter()
            .map(|s| {
                let range = interval("section", s.start, s.duration)?;
                let first = search_leftmost(&segments, &range.start(), |seg| seg.interval.start());
                let last = search_leftmost(&segments, &range.end(), |seg| seg.interval.start());
                Ok(Section {
                    interval: range,
                    loudness: s.loudness,
                    tempo: Tempo::new(s.tempo, s.time_signature)?,
                    key: u8::try_from(s.key).ok().filter(|k| *k < 12),
                    mode: Mode::from(s.mode),
                    timings: timings.slice(&range),
                    segments: first..last.max(first),
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Ok(Self {
            track,
            features,
            timings,
            sections,
            segments,
        })
    }

    /// Segments starting inside `section`.
    pub fn section_segments(&self, section: &Section) -> &[Segment] {
        self.segments.get(section.segments.clone()).unwrap_or(&[])
    }

    /// The segment playing at `t`.
    pub fn segment_at(&self, t: f64) -> Option<&Segment> {
        let after = search_rightmost(&self.segments, &t, |s| s.interval.start());
        after
            .checked_sub(1)
            .and_then(|i| self.segments.get(i))
            .filter(|s| s.interval.contains(t))
    }

    /// Index and section playing at `t`.
    pub fn section_at(&self, t: f64) -> Option<(usize, &Section)> {
        let after = search_rightmost(&self.sections, &t, |s| s.interval.start());
        let index = after.checked_sub(1)?;
        self.sections
            .get(index)
            .filter(|s| s.interval.contains(t))
            .map(|s| (index, s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn raw_segment(start: f64, duration: f64) -> RawSegment {
        RawSegment {
            start,
            duration,
            confidence: 0.5,
            loudness_start: -20.0,
            loudness_max: -10.0,
            loudness_max_time: duration / 2.0,
            loudness_end: -20.0,
            pitches: vec![0.0; 12],
            timbre: vec![0.0; 12],
        }
    }

    fn raw_section(start: f64, duration: f64, loudness: f64) -> RawSection {
        RawSection {
            start,
            duration,
            loudness,
            tempo: 120.0,
            key: 5,
            mode: 1,
            time_signature: 4,
        }
    }

    fn raw() -> RawAnalysis {
        let beats = (0..8).map(|i| Interval::new(f64::from(i) * 0.5, 0.5).unwrap()).collect();
        RawAnalysis {
            track: RawTrack {
                duration: 4.0,
                loudness: -8.0,
                tempo: 120.0,
                time_signature: 4,
                end_of_fade_in: 0.0,
                start_of_fade_out: Some(3.5),
            },
            bars: vec![Interval::new(0.0, 2.0).unwrap(), Interval::new(2.0, 2.0).unwrap()],
            beats,
            tatums: Vec::new(),
            sections: vec![raw_section(0.0, 2.2, -10.0), raw_section(2.2, 1.8, -6.0)],
            segments: vec![raw_segment(0.0, 1.0), raw_segment(1.0, 1.5), raw_segment(2.5, 1.5)],
        }
    }

    #[test]
    fn zero_bpm_has_no_beat_duration() {
        let tempo = Tempo::new(0.0, 4).unwrap();
        assert!(!tempo.has_rhythm());
        assert!(tempo.seconds_per_beat().is_none());
        assert!(tempo.seconds_per_bar().is_none());
    }

    #[test]
    fn tempo_durations() {
        let tempo = Tempo::new(120.0, 3).unwrap();
        assert!((tempo.seconds_per_beat().unwrap() - 0.5).abs() < 1e-12);
        assert!((tempo.seconds_per_bar().unwrap() - 1.5).abs() < 1e-12);
        assert!(Tempo::new(-1.0, 4).is_err());
        assert!(Tempo::new(120.0, 0).is_err());
        assert!(Tempo::new(120.0, 2).is_err());
        assert!(Tempo::new(120.0, 8).is_err());
        assert!(Tempo::new(120.0, 7).is_ok());
    }

    #[test]
    fn fade_windows_follow_track_bounds() {
        let analysis = AudioAnalysis::from_raw(raw(), AudioFeatures::default()).unwrap();
        assert!(analysis.track.fade_in.is_none());
        let fade_out = analysis.track.fade_out.unwrap();
        assert!((fade_out.start() - 3.5).abs() < 1e-12);
        assert!((fade_out.end() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sections_own_items_by_start_point() {
        let analysis = AudioAnalysis::from_raw(raw(), AudioFeatures::default()).unwrap();
        let first = &analysis.sections[0];
        // The segment starting at 1.0 extends past 2.2 but still belongs to the first section.
        assert_eq!(first.segments, 0..2);
        assert_eq!(first.timings.beats.len(), 5);
        assert_eq!(first.timings.bars.len(), 2);
        let second = &analysis.sections[1];
        assert_eq!(analysis.section_segments(second).len(), 1);
        assert_eq!(second.timings.beats.len(), 3);
        assert_eq!(second.key, Some(5));
        assert_eq!(second.mode, Mode::Major);
    }

    #[test]
    fn lookups_by_time() {
        let analysis = AudioAnalysis::from_raw(raw(), AudioFeatures::default()).unwrap();
        let segment = analysis.segment_at(1.2).unwrap();
        assert!((segment.interval.start() - 1.0).abs() < 1e-12);
        assert!(analysis.segment_at(2.6).is_some());
        assert!(analysis.segment_at(-0.5).is_none());
        assert_eq!(analysis.section_at(3.0).map(|(i, _)| i), Some(1));
        assert!(analysis.section_at(4.5).is_none());
    }

    #[test]
    fn rejects_negative_segment_duration() {
        let mut input = raw();
        input.segments[1].duration = -0.1;
        assert!(AudioAnalysis::from_raw(input, AudioFeatures::default()).is_err());
    }

    #[test]
    fn rejects_short_timbre_vector() {
        let mut input = raw();
        input.segments[0].timbre = vec![0.0; 3];
        assert!(AudioAnalysis::from_raw(input, AudioFeatures::default()).is_err());
    }

    #[test]
    fn rejects_unordered_sections() {
        let mut input = raw();
        input.sections.swap(0, 1);
        assert!(AudioAnalysis::from_raw(input, AudioFeatures::default()).is_err());
    }

    #[test]
    fn timbre_distance() {
        let mut a = [0.0; 12];
        a[0] = 3.0;
        let mut b = [0.0; 12];
        b[1] = 4.0;
        assert!((Timbre(a).euclidean_distance(&Timbre(b)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn raw_analysis_parses_provider_json() {
        let json = r#"{
            "track": {"duration": 2.0, "loudness": -7.5, "tempo": 100.0, "time_signature": 4, "end_of_fade_in": 0.3},
            "beats": [{"start": 0.0, "duration": 0.6, "confidence": 0.9}],
            "sections": [{"start": 0.0, "duration": 2.0, "loudness": -7.0, "tempo": 100.0, "time_signature": 4}],
            "segments": []
        }"#;
        let raw: RawAnalysis = serde_json::from_str(json).unwrap();
        let analysis = AudioAnalysis::from_raw(raw, AudioFeatures::default()).unwrap();
        assert!((analysis.track.fade_in.unwrap().end() - 0.3).abs() < 1e-12);
        assert_eq!(analysis.sections[0].key, None);
        assert_eq!(analysis.sections[0].timings.beats.len(), 1);
    }
}
