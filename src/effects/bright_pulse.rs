use rand::Rng;

use super::{EffectKind, PulseStyle, SectionContext};
use crate::engine::{ChannelSet, Effect};
use crate::error::PipelineError;
use crate::model::{Color, Interval};

/// Seconds from dark to full brightness.
const RISE_SECONDS: f64 = 2.0;
/// Seconds from full brightness back to dark.
const FALL_SECONDS: f64 = 0.5;
/// Slow pulses take this many times longer.
const SLOW_FACTOR: f64 = 2.0;

/// Fade-in and fade-out lengths of one pulse.
pub fn pulse_shape(style: PulseStyle) -> (f64, f64) {
    match style {
        PulseStyle::Slow => (RISE_SECONDS * SLOW_FACTOR, FALL_SECONDS * SLOW_FACTOR),
        PulseStyle::Default | PulseStyle::White => (RISE_SECONDS, FALL_SECONDS),
    }
}

/// One pulse per beat (per bar for [`PulseStyle::Slow`]) on a free light.
pub fn generate<R: Rng + ?Sized>(
    style: PulseStyle,
    ctx: &SectionContext<'_>,
    channels: &mut ChannelSet,
    rng: &mut R,
) -> Result<(), PipelineError> {
    let timings = &ctx.section.timings;
    let syncs: &[Interval] = match style {
        PulseStyle::Slow => &timings.bars,
        PulseStyle::Default | PulseStyle::White => &timings.beats,
    };
    let (rise, fall) = pulse_shape(style);
    let brightness = ctx.config.effects.max_brightness;
    let channel = channels.get_mut(EffectKind::BrightPulse(style).channel());

    for sync in syncs {
        let light = channel.pick_light(sync.start(), rng)?;
        let mut pulse = Effect::new(light, sync.start() + rise, 0.0)
            .with_brightness(brightness)
            .with_fade_in(rise)
            .with_fade_out(fall);
        if style == PulseStyle::White {
            pulse = pulse.with_chromaticity(Color::WHITE);
        }
        channel.add(pulse)?;
    }

    log::debug!(
        "{} pulses ({style:?}) for section at {:.2}s",
        syncs.len(),
        ctx.section.interval.start()
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
    fn one_pulse_per_beat() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(5);
        generate(PulseStyle::Default, &fixture.context(3), &mut channels, &mut rng).unwrap();

        let beats = fixture.analysis.sections[3].timings.beats.len();
        assert_eq!(channels.get(ChannelKind::Default).effect_count(), beats);
        assert_eq!(channels.get(ChannelKind::Flash).effect_count(), 0);
    }

    #[test]
    fn pulses_avoid_busy_lights() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(5);
        generate(PulseStyle::Default, &fixture.context(3), &mut channels, &mut rng).unwrap();

        // Each pulse lasts 2.5s at 0.5s beats: five lights busy at a time, eight available.
        let channel = channels.get(ChannelKind::Default);
        let start = fixture.analysis.sections[3].interval.start();
        for light in channel.lights() {
            let starts: Vec<f64> = channel.effects(light).unwrap().iter().map(Effect::start).collect();
            for pair in starts.windows(2) {
                assert!(pair[1] - pair[0] >= 2.5 - 1e-9, "overlap at {}", pair[1] - start);
            }
        }
    }

    #[test]
    fn slow_pulses_follow_bars() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(5);
        generate(PulseStyle::Slow, &fixture.context(0), &mut channels, &mut rng).unwrap();

        let bars = fixture.analysis.sections[0].timings.bars.len();
        let channel = channels.get(ChannelKind::Default);
        assert_eq!(channel.effect_count(), bars);
        let effect = channel.busy_effects(1.0)[0];
        assert!((effect.fade_in - 4.0).abs() < 1e-12);
        assert!((effect.fade_out - 1.0).abs() < 1e-12);
    }

    #[test]
    fn white_pulses_use_flash_channel() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(5);
        generate(PulseStyle::White, &fixture.context(2), &mut channels, &mut rng).unwrap();

        let flash = channels.get(ChannelKind::Flash);
        assert!(flash.effect_count() > 0);
        let peak = flash.busy_effects(34.0)[0];
        let at_peak = flash
            .sample(peak.light, peak.position, Color::BLACK)
            .unwrap();
        assert!((at_peak.x() - Color::WHITE.x()).abs() < 1e-12);
        assert!((at_peak.brightness() - 1.0).abs() < 1e-12);
    }
}
