//! Light grouping policies for strobes. Every policy returns exactly the
//! requested number of groups and no group is empty.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::error::PipelineError;
use crate::model::{Axis, LightId, LightRoster};

/// Split `items` into `count` consecutive non-empty chunks whose sizes differ
/// by at most one (the first chunks take the remainder). With fewer items
/// than groups, items are repeated so every group still gets one.
pub fn split_evenly<T: Clone>(items: &[T], count: usize) -> Vec<Vec<T>> {
    let n = items.len();
    if n == 0 || count == 0 {
        return Vec::new();
    }
    if n < count {
        return (0..count)
            .filter_map(|i| items.get(i * n / count).cloned())
            .map(|item| vec![item])
            .collect();
    }

    let base = n / count;
    let extra = n % count;
    let mut groups = Vec::with_capacity(count);
    let mut rest = items;
    for i in 0..count {
        let size = base + usize::from(i < extra);
        let (chunk, tail) = rest.split_at(size.min(rest.len()));
        groups.push(chunk.to_vec());
        rest = tail;
    }
    groups
}

/// Group lights along `axis` (left to right, back to front or bottom to top).
///
/// Anchors are spread evenly between the outermost lights and every light
/// joins its nearest anchor. If that leaves a group empty (clustered
/// positions), the sorted lights are split into equal runs instead.
pub fn group_by_axis(
    roster: &LightRoster,
    lights: &[LightId],
    axis: Axis,
    count: usize,
) -> Result<Vec<Vec<LightId>>, PipelineError> {
    if lights.is_empty() {
        return Err(PipelineError::NoLights);
    }
    let mut positioned = lights
        .iter()
        .map(|&id| {
            roster
                .get(id)
                .map(|light| (id, axis.of(&light.position)))
                .ok_or_else(|| PipelineError::UnknownLight {
                    light: id.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    positioned.sort_by(|a, b| a.1.total_cmp(&b.1));
    let sorted: Vec<LightId> = positioned.iter().map(|(id, _)| *id).collect();

    let count = count.max(1);
    if count == 1 {
        return Ok(vec![sorted]);
    }

    let min = positioned.first().map_or(0.0, |p| p.1);
    let max = positioned.last().map_or(0.0, |p| p.1);
    let anchors: Vec<f64> = (0..count)
        .map(|i| min + (max - min) * i as f64 / (count - 1) as f64)
        .collect();

    let mut groups: Vec<Vec<LightId>> = vec![Vec::new(); count];
    for (id, pos) in &positioned {
        let nearest = anchors
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - pos).abs().total_cmp(&(b.1 - pos).abs()))
            .map_or(0, |(i, _)| i);
        if let Some(group) = groups.get_mut(nearest) {
            group.push(*id);
        }
    }

    if groups.iter().any(Vec::is_empty) {
        return Ok(split_evenly(&sorted, count));
    }
    Ok(groups)
}

/// Shuffle lights into `count` near-equal groups, returned in random order.
pub fn group_randomly<R: Rng + ?Sized>(
    lights: &[LightId],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Vec<LightId>>, PipelineError> {
    if lights.is_empty() {
        return Err(PipelineError::NoLights);
    }
    let mut shuffled = lights.to_vec();
    shuffled.shuffle(rng);
    let mut groups = split_evenly(&shuffled, count.max(1));
    groups.shuffle(rng);
    Ok(groups)
}

/// Random strobe frames: no light repeats within a frame, and a light lit in
/// one frame is skipped in the next unless there are not enough others.
#[derive(Debug, Clone, Default)]
pub struct RandomFrames {
    previous: Vec<LightId>,
}

impl RandomFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_frame<R: Rng + ?Sized>(
        &mut self,
        lights: &[LightId],
        per_frame: usize,
        rng: &mut R,
    ) -> Vec<LightId> {
        let per_frame = per_frame.clamp(1, lights.len().max(1));
        let (fresh, repeated): (Vec<LightId>, Vec<LightId>) =
            lights.iter().partition(|id| !self.previous.contains(*id));

        let mut frame: Vec<LightId> = fresh.choose_multiple(rng, per_frame).copied().collect();
        if frame.len() < per_frame {
            let missing = per_frame - frame.len();
            frame.extend(repeated.choose_multiple(rng, missing).copied());
        }
        self.previous.clone_from(&frame);
        frame
    }
}
