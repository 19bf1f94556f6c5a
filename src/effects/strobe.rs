use rand::Rng;

use super::{SectionContext, StrobeGrouping};
use crate::engine::grouping::{group_by_axis, group_randomly, RandomFrames};
use crate::engine::strobe_sync::{self, StrobeSync};
use crate::engine::{ChannelKind, ChannelSet, Effect, EffectChannel};
use crate::error::PipelineError;
use crate::model::{Axis, Interval, LightId};

/// Compute the section's strobe grid and cut the strobe channel under it.
/// Strobes of neighbouring sections or bursts keep their parts outside it.
///
/// Every strobe light gets a dark reset effect over the whole grid so the
/// flashes stand out against black.
fn prepare<'c>(
    ctx: &SectionContext<'_>,
    channels: &'c mut ChannelSet,
) -> Result<(StrobeSync, &'c mut EffectChannel), PipelineError> {
    let sync = strobe_sync::compute(ctx.section, ctx.config.strobes.min_effect_seconds)?;
    let start = ctx.section.interval.start();
    let end = sync
        .slots
        .last()
        .map_or(ctx.section.interval.end(), |slot| slot.interval.end());
    let strobe_color = ctx.config.effects.strobe_color()?;

    let channel = channels.get_mut(ChannelKind::Strobe);
    if channel.light_count() == 0 {
        return Err(PipelineError::NoLights);
    }
    channel.cut(start, end)?;
    if let Some(range) = Interval::from_bounds(start, end) {
        let lights: Vec<LightId> = channel.lights().collect();
        for light in lights {
            channel.add(Effect::over(light, range).with_color(strobe_color.with_brightness(0.0)))?;
        }
    }
    Ok((sync, channel))
}

fn flash_all(
    ctx: &SectionContext<'_>,
    channel: &mut EffectChannel,
    frames: impl IntoIterator<Item = (Interval, Vec<LightId>)>,
) -> Result<usize, PipelineError> {
    let config = &ctx.config.effects;
    let strobe_color = config.strobe_color()?;
    let mut count = 0;
    for (interval, lights) in frames {
        for light in lights {
            channel.add(Effect::strobe(config, strobe_color, light, interval))?;
            count += 1;
        }
    }
    Ok(count)
}

/// Strobe fixed light groups in turn, one group per grid slot.
pub fn generate_grouped<R: Rng + ?Sized>(
    grouping: StrobeGrouping,
    ctx: &SectionContext<'_>,
    channels: &mut ChannelSet,
    rng: &mut R,
) -> Result<(), PipelineError> {
    let (sync, channel) = prepare(ctx, channels)?;
    let lights: Vec<LightId> = channel.lights().collect();
    let groups = match grouping {
        StrobeGrouping::Horizontal => group_by_axis(ctx.roster, &lights, Axis::X, sync.group_count)?,
        StrobeGrouping::Vertical => group_by_axis(ctx.roster, &lights, Axis::Z, sync.group_count)?,
        StrobeGrouping::Random => group_randomly(&lights, sync.group_count, rng)?,
    };

    let frames = sync.slots.iter().map(|slot| {
        let group = groups.get(slot.group % groups.len().max(1)).cloned().unwrap_or_default();
        (slot.interval, group)
    });
    let count = flash_all(ctx, channel, frames)?;
    log::debug!(
        "{grouping:?} strobe: {count} flashes in {} groups on {:?}",
        sync.group_count,
        sync.grid
    );
    Ok(())
}

/// Strobe random lights, never repeating a light in consecutive slots when
/// there are enough lights.
pub fn generate_random<R: Rng + ?Sized>(
    ctx: &SectionContext<'_>,
    channels: &mut ChannelSet,
    rng: &mut R,
) -> Result<(), PipelineError> {
    let (sync, channel) = prepare(ctx, channels)?;
    let lights: Vec<LightId> = channel.lights().collect();
    let per_frame = (lights.len() / sync.group_count.max(1)).max(1);

    let mut picker = RandomFrames::new();
    let frames: Vec<(Interval, Vec<LightId>)> = sync
        .slots
        .iter()
        .map(|slot| (slot.interval, picker.next_frame(&lights, per_frame, rng)))
        .collect();
    let count = flash_all(ctx, channel, frames)?;
    log::debug!("random strobe: {count} flashes, {per_frame} per frame");
    Ok(())
}
