use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::{EffectKind, SectionContext};
use crate::engine::{ChannelSet, Effect};
use crate::error::PipelineError;
use crate::model::{Color, Interval, LightId};

/// How many beats each color step lasts and how many lights change per step,
/// so that every light changes about once every two bars.
pub fn step_size(time_signature: u32, light_count: usize) -> (usize, usize) {
    if light_count == 0 {
        return (1, 0);
    }
    let beats_per_step = f64::from(2 * time_signature) / light_count as f64;
    if beats_per_step >= 1.0 {
        (beats_per_step as usize, 1)
    } else {
        (1, (1.0 / beats_per_step) as usize)
    }
}

/// A palette color different from `current`, if the palette has one.
fn other_color<R: Rng + ?Sized>(colors: &[Color], current: Option<Color>, rng: &mut R) -> Option<Color> {
    let candidates: Vec<Color> = colors
        .iter()
        .copied()
        .filter(|c| Some(*c) != current)
        .collect();
    candidates.choose(rng).copied()
}

/// Every light holds a palette color; a few lights switch to a new color on
/// each step. The first step fades in and the last fades out.
pub fn generate<R: Rng + ?Sized>(
    ctx: &SectionContext<'_>,
    channels: &mut ChannelSet,
    rng: &mut R,
) -> Result<(), PipelineError> {
    let channel = channels.get_mut(EffectKind::ColorSwitch.channel());
    let lights: Vec<LightId> = channel.lights().collect();
    if lights.is_empty() {
        return Err(PipelineError::NoLights);
    }
    let colors = ctx.palette.colors();
    let brightness = ctx.config.effects.base_brightness;

    let (beats_per_step, lights_per_step) =
        step_size(ctx.section.tempo.time_signature(), lights.len());
    let mut current: IndexMap<LightId, Color> = lights
        .iter()
        .filter_map(|id| colors.choose(rng).map(|c| (*id, *c)))
        .collect();

    let steps: Vec<&[Interval]> = ctx.section.timings.beats.chunks(beats_per_step).collect();
    let last_step = steps.len().saturating_sub(1);

    for (i, beats) in steps.iter().enumerate() {
        let (Some(first), Some(last)) = (beats.first(), beats.last()) else {
            continue;
        };
        let Some(step) = Interval::from_bounds(first.start(), last.end()) else {
            continue;
        };

        let changed: Vec<LightId> = lights.choose_multiple(rng, lights_per_step).copied().collect();
        for light in changed {
            if let Some(color) = other_color(colors, current.get(&light).copied(), rng) {
                current.insert(light, color);
            }
        }

        let fade_in = i == 0 && i != last_step;
        let fade_out = i == last_step && i != 0;
        for (light, color) in &current {
            let effect = Effect::new(*light, step.start(), step.duration())
                .with_chromaticity(*color)
                .with_brightness(brightness);
            let effect = if fade_in {
                Effect {
                    position: step.end(),
                    duration: 0.0,
                    fade_in: step.duration(),
                    ..effect
                }
            } else if fade_out {
                Effect {
                    duration: 0.0,
                    fade_out: step.duration(),
                    ..effect
                }
            } else {
                effect
            };
            channel.add(effect)?;
        }
    }

    log::debug!(
        "color switch: {} steps of {beats_per_step} beats, {lights_per_step} lights each",
        steps.len()
    );
    Ok(())
}
