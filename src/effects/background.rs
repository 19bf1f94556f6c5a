use rand::seq::IndexedRandom;
use rand::Rng;

use crate::engine::{ChannelKind, ChannelSet, Effect};
use crate::error::PipelineError;
use crate::model::{Color, ColorPalette, LightId};
use crate::settings::EffectConfig;

/// Length of one color transition.
pub const TRANSITION_SECONDS: f64 = 10.0;
const MIN_COOLDOWN_SECONDS: f64 = 2.0;
const MAX_COOLDOWN_SECONDS: f64 = 10.0;

/// Slowly cycle every background light through the palette for the whole track.
///
/// Each light holds a color, waits a random cooldown and then fades to another
/// palette color over [`TRANSITION_SECONDS`]. A held effect lasts until the
/// next one has finished fading in, so transitions start from the held color.
/// Returns the number of effects added.
pub fn generate<R: Rng + ?Sized>(
    duration: f64,
    palette: &ColorPalette,
    config: &EffectConfig,
    channels: &mut ChannelSet,
    rng: &mut R,
) -> Result<usize, PipelineError> {
    let colors = palette.colors();
    let channel = channels.get_mut(ChannelKind::Background);
    let lights: Vec<LightId> = channel.lights().collect();
    let brightness = config.base_brightness;
    let mut added = 0;

    for light in lights {
        let Some(mut color) = colors.choose(rng).copied() else {
            return Ok(0);
        };
        let held_effect = |color: Color, position: f64| {
            Effect::new(light, position, 0.0)
                .with_chromaticity(color)
                .with_brightness(brightness)
        };
        let mut held = held_effect(color, 0.0);
        let mut since = 0.0;

        loop {
            let start = since + rng.random_range(MIN_COOLDOWN_SECONDS..=MAX_COOLDOWN_SECONDS);
            let target = start + TRANSITION_SECONDS;
            if target >= duration {
                break;
            }
            let Some(next) = colors.choose(rng).copied() else {
                break;
            };
            since = start;
            if next == color {
                continue;
            }
            held.duration = target - held.position;
            channel.add(held)?;
            added += 1;
            held = held_effect(next, target).with_fade_in(TRANSITION_SECONDS);
            since = target;
            color = next;
        }

        held.duration = (duration - held.position).max(0.0);
        channel.add(held)?;
        added += 1;
    }

    log::debug!("background: {added} color effects over {duration:.1}s");
    Ok(added)
}
