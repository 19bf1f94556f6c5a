//! Burst detection: runs of short acoustic segments with near-equal
//! durations, the kind of passage (drum rolls, stabs, fast arpeggios) that
//! suits rapid strobes.
//!
//! Detection is heuristic. Some real bursts are missed and some spurious
//! ones pass, so every threshold lives in [`BurstConfig`].

use crate::model::{Interval, Segment};
use crate::settings::BurstConfig;
use crate::util::remap_clamped;

/// An ordered run of intervals that passed validation.
pub type Burst = Vec<Interval>;

/// A single segment never splits into more parts than this when merged.
const MAX_SPLIT_PARTS: usize = 64;

#[derive(Debug, Clone, Copy)]
struct Node {
    interval: Interval,
    confidence: f64,
    /// Offset of the loudness peak from the interval start.
    peak_offset: f64,
}

impl Node {
    fn from_segment(segment: &Segment) -> Self {
        Self {
            interval: segment.interval,
            confidence: segment.confidence,
            peak_offset: segment.loudness_max_time,
        }
    }

    fn duration(&self) -> f64 {
        self.interval.duration()
    }
}

type Run = Vec<Node>;

/// Durations within `tolerance` of each other, measured as `current / previous`.
fn compatible(current: f64, previous: f64, tolerance: f64) -> bool {
    (current / previous - 1.0).abs() <= tolerance
}

/// Split segments into maximal runs of compatible consecutive durations.
fn partition(segments: &[Segment], tolerance: f64) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for node in segments.iter().map(Node::from_segment) {
        match runs.last_mut() {
            Some(run)
                if run
                    .last()
                    .is_some_and(|last| compatible(node.duration(), last.duration(), tolerance)) =>
            {
                run.push(node);
            }
            _ => runs.push(vec![node]),
        }
    }
    runs
}

fn should_merge(left: &Run, mid: &Run, right: &Run, tolerance: f64) -> bool {
    let [m] = mid.as_slice() else {
        return false;
    };
    if left.len() > 1 && right.len() > 1 {
        return true;
    }
    let (Some(l), Some(r)) = (left.last(), right.first()) else {
        return false;
    };
    let (before_peak, after_peak) = m.interval.split_at(m.peak_offset);
    compatible(l.duration(), r.duration(), tolerance)
        && compatible(before_peak.duration(), l.duration(), tolerance)
        && compatible(after_peak.duration(), r.duration(), tolerance)
}

/// `left + mid split into neighbour-sized parts + right`.
fn merged(left: &Run, mid: &Node, right: &Run) -> Run {
    let neighbour = match (left.last(), right.first()) {
        (Some(l), Some(r)) => (l.duration() + r.duration()) / 2.0,
        _ => mid.duration(),
    };
    let parts = if neighbour > 0.0 {
        ((mid.duration() / neighbour).round() as usize).clamp(1, MAX_SPLIT_PARTS)
    } else {
        1
    };

    let mut run = Vec::with_capacity(left.len() + parts + right.len());
    run.extend_from_slice(left);
    run.extend(mid.interval.subdivide(parts).into_iter().map(|interval| Node {
        interval,
        confidence: mid.confidence,
        peak_offset: 0.0,
    }));
    run.extend_from_slice(right);
    run
}

/// Fold single-segment runs sandwiched between two runs into one run.
///
/// Candidates are chosen on the unmerged list; a candidate whose left
/// neighbour is the previous candidate's middle is skipped. Merges are applied
/// from the highest index down so lower indices stay valid, and two merges
/// sharing a neighbour chain into one run.
fn merge_runs(mut runs: Vec<Run>, tolerance: f64) -> Vec<Run> {
    let mut candidates: Vec<usize> = Vec::new();
    for i in 1..runs.len().saturating_sub(1) {
        if candidates.last().is_some_and(|&prev| prev + 1 == i) {
            continue;
        }
        let (Some(left), Some(mid), Some(right)) = (runs.get(i - 1), runs.get(i), runs.get(i + 1))
        else {
            continue;
        };
        if should_merge(left, mid, right, tolerance) {
            candidates.push(i);
        }
    }

    for &i in candidates.iter().rev() {
        let (Some(left), Some(mid), Some(right)) = (runs.get(i - 1), runs.get(i), runs.get(i + 1))
        else {
            continue;
        };
        let Some(mid) = mid.first() else {
            continue;
        };
        let run = merged(left, mid, right);
        runs.splice(i - 1..=i + 1, [run]);
    }
    runs
}

/// Reason a run was rejected, for logging.
fn rejection(run: &Run, config: &BurstConfig) -> Option<String> {
    let len = run.len();
    if len < config.min_length {
        return Some(format!("only {len} segments"));
    }

    let ceiling = remap_clamped(
        len as f64,
        config.min_length as f64,
        config.long_length as f64,
        config.max_duration_short,
        config.max_duration_long,
    );
    if let Some(node) = run.iter().find(|n| n.duration() > ceiling) {
        return Some(format!(
            "segment of {:.3}s exceeds {ceiling:.3}s ceiling",
            node.duration()
        ));
    }

    let confident = run
        .iter()
        .filter(|n| {
            let threshold = remap_clamped(
                n.duration(),
                config.confidence_short_duration,
                config.confidence_long_duration,
                config.min_confidence_low,
                config.min_confidence_high,
            );
            n.confidence > threshold
        })
        .count();
    if (confident as f64) < config.confident_share * len as f64 - 1e-9 {
        return Some(format!("only {confident}/{len} confident segments"));
    }
    None
}

/// Validated bursts of a track, produced lazily in time order.
///
/// Runs are grouped and merged up front; validation happens as the iterator
/// advances. The iterator is finite and single-pass: call [`detect_bursts`]
/// again to start over.
#[derive(Debug)]
pub struct Bursts {
    runs: std::vec::IntoIter<Run>,
    config: BurstConfig,
}

impl Iterator for Bursts {
    type Item = Burst;

    fn next(&mut self) -> Option<Burst> {
        for run in self.runs.by_ref() {
            match rejection(&run, &self.config) {
                None => return Some(run.iter().map(|n| n.interval).collect()),
                Some(reason) if run.len() >= self.config.min_length => {
                    log::debug!(
                        "burst at {:.2}s rejected: {reason}",
                        run.first().map_or(0.0, |n| n.interval.start())
                    );
                }
                Some(_) => {}
            }
        }
        None
    }
}

/// Detect bursts in a track's start-ordered segments.
pub fn detect_bursts(segments: &[Segment], config: &BurstConfig) -> Bursts {
    let runs = merge_runs(partition(segments, config.duration_tolerance), config.duration_tolerance);
    Bursts {
        runs: runs.into_iter(),
        config: *config,
    }
}
