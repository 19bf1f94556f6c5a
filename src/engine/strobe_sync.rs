use serde::Serialize;

use crate::error::PipelineError;
use crate::model::{Interval, Section};

/// Which timing grid a strobe subdivides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncGrid {
    Tatums,
    Beats,
    Bars,
}

/// One flash slot of the strobe grid and the light group it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrobeSlot {
    pub interval: Interval,
    pub group: usize,
}

/// Strobe subdivision of one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrobeSync {
    pub grid: SyncGrid,
    pub effects_per_sync: usize,
    pub group_count: usize,
    pub slots: Vec<StrobeSlot>,
}

/// Largest subdivision of every interval in `grid` that keeps each part at
/// least `min_effect` seconds long, starting from `time_signature` and halving
/// (rounding up). Returns 0 if even a single part per interval is too short or
/// the grid is empty.
pub fn effects_per_sync(grid: &[Interval], time_signature: u32, min_effect: f64) -> usize {
    if grid.is_empty() {
        return 0;
    }
    let too_short = |n: usize| grid.iter().any(|i| i.duration() / (n as f64) < min_effect);

    let mut n = time_signature.max(1) as usize;
    while too_short(n) {
        if n == 1 {
            return 0;
        }
        n = n.div_ceil(2);
    }
    n
}

/// Number of light groups for a grid. Follows the time signature when the
/// subdivision divides evenly into it, otherwise one group per sub-interval.
pub fn group_count(effects_per_sync: usize, time_signature: u32) -> usize {
    let ts = time_signature as usize;
    if effects_per_sync == 1 || (effects_per_sync % 2 == 0 && ts % 2 == 0) {
        ts
    } else {
        effects_per_sync
    }
}

/// Build the strobe grid of `section`, trying tatums, then beats, then bars.
pub fn compute(section: &Section, min_effect: f64) -> Result<StrobeSync, PipelineError> {
    let ts = section.tempo.time_signature();
    let grids = [
        (SyncGrid::Tatums, &section.timings.tatums),
        (SyncGrid::Beats, &section.timings.beats),
        (SyncGrid::Bars, &section.timings.bars),
    ];

    for (grid, intervals) in grids {
        let n = effects_per_sync(intervals, ts, min_effect);
        if n == 0 {
            log::debug!(
                "strobe sync: {grid:?} unusable for section at {:.2}s",
                section.interval.start()
            );
            continue;
        }
        let groups = group_count(n, ts);
        let slots = intervals
            .iter()
            .flat_map(|i| i.subdivide(n))
            .enumerate()
            .map(|(k, interval)| StrobeSlot {
                interval,
                group: k % groups,
            })
            .collect();
        log::debug!(
            "strobe sync: {grid:?} x{n}, {groups} groups for section at {:.2}s",
            section.interval.start()
        );
        return Ok(StrobeSync {
            grid,
            effects_per_sync: n,
            group_count: groups,
            slots,
        });
    }

    Err(PipelineError::NoStrobeSync {
        time_signature: ts,
        section_start: section.interval.start(),
    })
}
