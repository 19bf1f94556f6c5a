use serde::{Deserialize, Serialize};

use crate::util::search_rightmost;

/// A span of time in seconds. Duration is never negative.
/// Constructed via `Interval::new` which enforces this invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntervalRaw")]
pub struct Interval {
    start: f64,
    duration: f64,
}

#[derive(Deserialize)]
struct IntervalRaw {
    start: f64,
    duration: f64,
}

impl TryFrom<IntervalRaw> for Interval {
    type Error = String;
    fn try_from(raw: IntervalRaw) -> Result<Self, String> {
        Interval::new(raw.start, raw.duration).ok_or_else(|| {
            format!(
                "Invalid Interval: start={}, duration={}",
                raw.start, raw.duration
            )
        })
    }
}

impl Interval {
    /// Create an interval. Returns None if the duration is negative or
    /// either value is not finite.
    pub fn new(start: f64, duration: f64) -> Option<Self> {
        if start.is_finite() && duration.is_finite() && duration >= 0.0 {
            Some(Self { start, duration })
        } else {
            None
        }
    }

    /// Create an interval from its bounds. Returns None if `end < start`.
    pub fn from_bounds(start: f64, end: f64) -> Option<Self> {
        Self::new(start, end - start)
    }

    /// For lengths the caller has already proven non-negative.
    pub(crate) fn new_unchecked(start: f64, duration: f64) -> Self {
        debug_assert!(duration >= 0.0, "negative interval duration {duration}");
        Self {
            start,
            duration: duration.max(0.0),
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Inclusive start, exclusive end.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }

    /// True if `other` lies entirely within this interval.
    pub fn contains_interval(&self, other: &Interval) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        overlap(self, other)
    }

    /// Cut at `offset` seconds from the start. The offset is clamped into the interval.
    pub fn split_at(&self, offset: f64) -> (Interval, Interval) {
        let offset = offset.clamp(0.0, self.duration);
        (
            Interval::new_unchecked(self.start, offset),
            Interval::new_unchecked(self.start + offset, self.duration - offset),
        )
    }

    /// Divide into `count` equal consecutive parts. The last part absorbs any
    /// floating point remainder so the parts exactly tile the interval.
    /// A count of zero is treated as one.
    pub fn subdivide(&self, count: usize) -> Vec<Interval> {
        let count = count.max(1);
        let step = self.duration / count as f64;
        let end = self.end();
        (0..count)
            .map(|i| {
                let start = self.start + step * i as f64;
                let duration = if i + 1 == count { end - start } else { step };
                Interval::new_unchecked(start, duration.max(0.0))
            })
            .collect()
    }
}

/// `a.start < b.end && b.start < a.end`.
pub fn overlap(a: &Interval, b: &Interval) -> bool {
    a.start < b.end() && b.start < a.end()
}

/// Intervals of a start-ordered list whose start lies in `range`.
///
/// Items are attributed by start point only, so an interval that begins
/// inside `range` is included even if it extends past its end.
pub fn slice_by_start<'a, T, F>(items: &'a [T], range: &Interval, start_of: F) -> &'a [T]
where
    F: Fn(&T) -> f64,
{
    let first = crate::util::search_leftmost(items, &range.start(), &start_of);
    let last = crate::util::search_leftmost(items, &range.end(), &start_of).max(first);
    items.get(first..last).unwrap_or(&[])
}

/// Tracks the current position in a start-ordered interval list during
/// playback. Sequential lookups are O(1); seeks fall back to binary search.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingCursor {
    index: Option<usize>,
}

impl TimingCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index last returned by [`TimingCursor::find`].
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Index of the interval containing `t`, or None when `t` falls in a gap,
    /// before the first interval or after the last.
    pub fn find(&mut self, intervals: &[Interval], t: f64) -> Option<usize> {
        if let Some(current) = self.index {
            for candidate in [current, current + 1] {
                if intervals.get(candidate).is_some_and(|i| i.contains(t)) {
                    self.index = Some(candidate);
                    return self.index;
                }
            }
        }

        let after = search_rightmost(intervals, &t, Interval::start);
        self.index = after
            .checked_sub(1)
            .filter(|&i| intervals.get(i).is_some_and(|iv| iv.contains(t)));
        self.index
    }

    pub fn reset(&mut self) {
        self.index = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn iv(start: f64, duration: f64) -> Interval {
        Interval::new(start, duration).unwrap()
    }

    #[test]
    fn new_rejects_negative_duration() {
        assert!(Interval::new(1.0, -0.1).is_none());
        assert!(Interval::new(f64::NAN, 1.0).is_none());
        assert!(Interval::new(0.0, 0.0).is_some());
    }

    #[test]
    fn contains_is_half_open() {
        let i = iv(1.0, 2.0);
        assert!(i.contains(1.0));
        assert!(i.contains(2.999));
        assert!(!i.contains(3.0));
        assert!(!i.contains(0.999));
    }

    #[test]
    fn zero_length_interval_contains_nothing() {
        assert!(!iv(1.0, 0.0).contains(1.0));
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!overlap(&iv(0.0, 1.0), &iv(1.0, 1.0)));
        assert!(overlap(&iv(0.0, 1.0), &iv(0.5, 1.0)));
        assert!(iv(0.0, 4.0).contains_interval(&iv(1.0, 3.0)));
        assert!(!iv(0.0, 4.0).contains_interval(&iv(1.0, 3.5)));
    }

    #[test]
    fn subdivide_tiles_the_interval() {
        let parts = iv(0.3, 1.0).subdivide(3);
        assert_eq!(parts.len(), 3);
        assert!((parts[0].start() - 0.3).abs() < 1e-12);
        assert!((parts[2].end() - 1.3).abs() < 1e-12);
        for pair in parts.windows(2) {
            assert!((pair[0].end() - pair[1].start()).abs() < 1e-12);
        }
    }

    #[test]
    fn split_at_clamps_offset() {
        let (a, b) = iv(2.0, 1.0).split_at(5.0);
        assert!((a.duration() - 1.0).abs() < 1e-12);
        assert!(b.duration().abs() < 1e-12);
    }

    #[test]
    fn deserialize_rejects_negative_duration() {
        let ok: Result<Interval, _> = serde_json::from_str(r#"{"start":1.0,"duration":0.5}"#);
        assert!(ok.is_ok());
        let bad: Result<Interval, _> = serde_json::from_str(r#"{"start":1.0,"duration":-0.5}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn slice_by_start_attributes_by_start_point() {
        let beats: Vec<Interval> = (0..10).map(|i| iv(f64::from(i) * 0.5, 0.5)).collect();
        let section = iv(1.2, 1.5);
        let slice = slice_by_start(&beats, &section, Interval::start);
        let starts: Vec<f64> = slice.iter().map(Interval::start).collect();
        assert_eq!(starts, vec![1.5, 2.0, 2.5]);
    }

    #[test]
    fn cursor_follows_playback_and_seeks() {
        let beats: Vec<Interval> = (0..8).map(|i| iv(f64::from(i), 1.0)).collect();
        let mut cursor = TimingCursor::new();
        assert_eq!(cursor.find(&beats, 0.5), Some(0));
        assert_eq!(cursor.find(&beats, 1.2), Some(1));
        assert_eq!(cursor.find(&beats, 6.5), Some(6));
        assert_eq!(cursor.find(&beats, 2.0), Some(2));
        assert_eq!(cursor.find(&beats, 9.0), None);
        assert_eq!(cursor.find(&beats, -1.0), None);
    }

    proptest! {
        #[test]
        fn end_is_start_plus_duration(start in -1e4f64..1e4, duration in 0f64..1e3) {
            let i = Interval::new(start, duration).unwrap();
            prop_assert!(i.duration() >= 0.0);
            prop_assert_eq!(i.end(), i.start() + i.duration());
        }

        #[test]
        fn subdivided_parts_are_valid(start in 0f64..1e3, duration in 0f64..10.0, count in 1usize..16) {
            let parts = Interval::new(start, duration).unwrap().subdivide(count);
            prop_assert_eq!(parts.len(), count);
            for part in &parts {
                prop_assert!(part.duration() >= 0.0);
                prop_assert_eq!(part.end(), part.start() + part.duration());
            }
        }
    }
}
