use crate::error::PipelineError;
use crate::model::{
    AudioAnalysis, AudioFeatures, ColorGamut, Interval, Light, LightId, LightRoster, Position3,
    RawAnalysis, RawSection, RawSegment, RawTrack, SEGMENT_VECTOR_LEN,
};

const DEMO_BPM: f64 = 120.0;
const DEMO_TIME_SIGNATURE: u32 = 4;
const DEMO_SECTION_SECONDS: f64 = 16.0;
/// Loudness (dB) of the four demo sections; the third is the loudest.
const DEMO_SECTION_LOUDNESS: [f64; 4] = [-12.0, -9.0, -5.0, -10.0];
/// A drum roll inside the loudest section: start time, segment count, segment length.
const DEMO_ROLL: (f64, usize, f64) = (36.0, 10, 0.12);

/// Consecutive intervals of `step` seconds covering `[0, duration)`.
fn grid(duration: f64, step: f64) -> Vec<Interval> {
    let count = (duration / step).round() as usize;
    (0..count)
        .map(|i| Interval::new_unchecked(i as f64 * step, step))
        .collect()
}

fn demo_segment(start: f64, duration: f64, loudness: f64) -> RawSegment {
    RawSegment {
        start,
        duration,
        confidence: 0.8,
        loudness_start: loudness - 20.0,
        loudness_max: loudness,
        loudness_max_time: duration / 2.0,
        loudness_end: loudness - 20.0,
        pitches: vec![0.5; SEGMENT_VECTOR_LEN],
        timbre: vec![0.0; SEGMENT_VECTOR_LEN],
    }
}

/// Half-second segments with a drum roll of short ones in the loudest section.
fn demo_segments(duration: f64) -> Vec<RawSegment> {
    let (roll_start, roll_count, roll_step) = DEMO_ROLL;
    let roll_end = roll_start + roll_count as f64 * roll_step;

    let mut segments = Vec::new();
    let mut t = 0.0;
    while t < duration - 1e-9 {
        let section = ((t / DEMO_SECTION_SECONDS) as usize).min(DEMO_SECTION_LOUDNESS.len() - 1);
        let loudness = DEMO_SECTION_LOUDNESS.get(section).copied().unwrap_or(-10.0);
        let step = if (roll_start..roll_end - 1e-9).contains(&t) {
            roll_step
        } else if t < roll_start && t + 0.5 > roll_start {
            roll_start - t
        } else {
            0.5_f64.min(duration - t)
        };
        segments.push(demo_segment(t, step, loudness));
        t += step;
    }
    segments
}

/// A 64-second, four-section track at 120 bpm in 4/4: rising loudness up to
/// the third section, a drum roll in it, and a quieter closing section.
pub fn create_demo_analysis() -> Result<AudioAnalysis, PipelineError> {
    let duration = DEMO_SECTION_SECONDS * DEMO_SECTION_LOUDNESS.len() as f64;
    let beat = 60.0 / DEMO_BPM;

    let sections = DEMO_SECTION_LOUDNESS
        .iter()
        .enumerate()
        .map(|(i, &loudness)| RawSection {
            start: i as f64 * DEMO_SECTION_SECONDS,
            duration: DEMO_SECTION_SECONDS,
            loudness,
            tempo: DEMO_BPM,
            key: 9,
            mode: 0,
            time_signature: DEMO_TIME_SIGNATURE,
        })
        .collect();

    let raw = RawAnalysis {
        track: RawTrack {
            duration,
            loudness: -8.0,
            tempo: DEMO_BPM,
            time_signature: DEMO_TIME_SIGNATURE,
            end_of_fade_in: 0.0,
            start_of_fade_out: None,
        },
        bars: grid(duration, beat * f64::from(DEMO_TIME_SIGNATURE)),
        beats: grid(duration, beat),
        tatums: grid(duration, beat / 2.0),
        sections,
        segments: demo_segments(duration),
    };
    let features = AudioFeatures {
        energy: 0.55,
        loudness: -8.0,
        danceability: 0.7,
        valence: 0.5,
        ..AudioFeatures::default()
    };
    AudioAnalysis::from_raw(raw, features)
}

/// Six Hue lights in two rows of three and two screen zones.
pub fn create_demo_roster() -> Result<LightRoster, PipelineError> {
    let mut lights: Vec<Light> = (0u8..6)
        .map(|i| {
            let column = f64::from(i % 3) - 1.0;
            let row = if i < 3 { -0.5 } else { 0.5 };
            Light::new(
                LightId::Hue { channel: i + 1 },
                Position3::new(column, 1.0, row),
                ColorGamut::HUE_C,
            )
        })
        .collect();
    lights.extend((0u32..2).map(|index| {
        Light::new(
            LightId::Screen { index },
            Position3::new(if index == 0 { -0.3 } else { 0.3 }, 0.0, 0.0),
            ColorGamut::SRGB,
        )
    }));
    LightRoster::new(lights)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn demo_analysis_is_consistent() {
        let analysis = create_demo_analysis().unwrap();
        assert_eq!(analysis.sections.len(), 4);
        assert_eq!(analysis.timings.beats.len(), 128);
        assert!((analysis.track.duration - 64.0).abs() < 1e-9);

        // Segments chain without gaps and cover the track.
        for pair in analysis.segments.windows(2) {
            assert!((pair[0].interval.end() - pair[1].interval.start()).abs() < 1e-9);
        }
        let last = analysis.segments.last().unwrap();
        assert!((last.interval.end() - 64.0).abs() < 1e-9);

        let loudest = &analysis.sections[2];
        assert_eq!(loudest.timings.beats.len(), 32);
        assert!(analysis
            .section_segments(loudest)
            .iter()
            .any(|s| (s.interval.duration() - 0.12).abs() < 1e-9));
    }

    #[test]
    fn demo_roster_has_eight_lights() {
        let roster = create_demo_roster().unwrap();
        assert_eq!(roster.len(), 8);
        assert!(roster.contains(LightId::Screen { index: 1 }));
        assert!(roster.contains(LightId::Hue { channel: 6 }));
    }
}
