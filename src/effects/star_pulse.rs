use rand::Rng;

use super::{EffectKind, SectionContext};
use crate::engine::{ChannelSet, Effect};
use crate::error::PipelineError;
use crate::model::{Color, LightId};

/// Warm white, the lowest temperature the daylight formula covers.
const PULSE_KELVIN: f64 = 4000.0;

/// Fade-out length, longer with more lights so the room stays lit.
pub fn fade_out_seconds(light_count: usize) -> f64 {
    match light_count {
        0..=5 => 1.0,
        6..=9 => 3.0,
        _ => 5.0,
    }
}

/// A warm flash on a free light at every segment onset, fading out slowly
/// over darkened lower channels.
pub fn generate<R: Rng + ?Sized>(
    ctx: &SectionContext<'_>,
    channels: &mut ChannelSet,
    rng: &mut R,
) -> Result<(), PipelineError> {
    let pulse = Color::from_cct(PULSE_KELVIN, ctx.config.effects.max_brightness)?;
    let kind = EffectKind::StarPulse.channel();
    let range = ctx.section.interval;

    // Same chromaticity as the pulse so fades only change brightness.
    let reset = pulse.with_brightness(0.0);
    for lower in kind.below() {
        let channel = channels.get_mut(lower);
        channel.clear(range.start(), range.end());
        let lights: Vec<LightId> = channel.lights().collect();
        for light in lights {
            channel.add(Effect::over(light, range).with_color(reset))?;
        }
    }

    let channel = channels.get_mut(kind);
    let fade_out = fade_out_seconds(channel.light_count());
    for segment in ctx.segments() {
        let t = segment.interval.start();
        let light = channel.pick_light(t, rng)?;
        channel.add(Effect::new(light, t, 0.0).with_color(pulse).with_fade_out(fade_out))?;
    }

    log::debug!(
        "{} star pulses for section at {:.2}s",
        ctx.segments().len(),
        range.start()
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::effects::testing::Fixture;
    use crate::engine::ChannelKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fade_grows_with_light_count() {
        assert_eq!(fade_out_seconds(3), 1.0);
        assert_eq!(fade_out_seconds(8), 3.0);
        assert_eq!(fade_out_seconds(12), 5.0);
    }

    #[test]
    fn pulse_per_segment_over_dark_background() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let light = LightId::Hue { channel: 1 };
        let background = channels.get_mut(ChannelKind::Background);
        background
            .add(Effect::new(light, 0.0, 64.0).with_color(Color::from_srgb8(255, 0, 0)))
            .unwrap();
        background
            .add(Effect::new(light, 2.0, 4.0).with_color(Color::from_srgb8(0, 0, 255)))
            .unwrap();

        let mut rng = StdRng::seed_from_u64(8);
        let ctx = fixture.context(0);
        generate(&ctx, &mut channels, &mut rng).unwrap();

        assert_eq!(channels.get(ChannelKind::Default).effect_count(), ctx.segments().len());
        let background = channels.get(ChannelKind::Background);
        // The fully contained blue effect is cleared; the track-long one stays.
        assert_eq!(background.effects(light).unwrap().len(), 2);
        assert_eq!(background.effect_count(), 9);
        let under = background.sample(light, 3.0, Color::BLACK).unwrap();
        assert_eq!(under.brightness(), 0.0);
    }

    #[test]
    fn pulses_use_configured_brightness() {
        let mut fixture = Fixture::demo();
        fixture.config.effects.max_brightness = 0.5;
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(8);
        generate(&fixture.context(0), &mut channels, &mut rng).unwrap();

        let channel = channels.get(ChannelKind::Default);
        let first = channel.busy_effects(0.0)[0];
        let c = channel.sample(first.light, 0.0, Color::BLACK).unwrap();
        assert!((c.brightness() - 0.5).abs() < 1e-12);
    }
}
