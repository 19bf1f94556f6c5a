use rand::Rng;

use crate::analyzer::Intensity;
use crate::engine::grouping::RandomFrames;
use crate::engine::{ChannelKind, ChannelSet, Effect};
use crate::error::PipelineError;
use crate::model::{Interval, LightId};
use crate::settings::PipelineConfig;

/// Bursts only strobe in sections at least this intense.
pub const MIN_BURST_INTENSITY: Intensity = Intensity::Medium;

/// Share of the strobe lights flashing on each burst segment.
const LIGHTS_PER_FRAME_DIVISOR: usize = 3;

/// Flash random strobe lights on every segment of a burst.
///
/// The strobe channel is cut over the burst and darkened, then each
/// segment long enough to be shown gets its own frame of lights. Returns the
/// number of flashes added.
pub fn generate<R: Rng + ?Sized>(
    burst: &[Interval],
    config: &PipelineConfig,
    channels: &mut ChannelSet,
    rng: &mut R,
) -> Result<usize, PipelineError> {
    let (Some(first), Some(last)) = (burst.first(), burst.last()) else {
        return Ok(0);
    };
    let Some(range) = Interval::from_bounds(first.start(), last.end()) else {
        return Ok(0);
    };
    let strobe_color = config.effects.strobe_color()?;
    let channel = channels.get_mut(ChannelKind::Strobe);
    let lights: Vec<LightId> = channel.lights().collect();
    if lights.is_empty() {
        return Err(PipelineError::NoLights);
    }

    channel.cut(range.start(), range.end())?;
    for light in &lights {
        channel.add(Effect::over(*light, range).with_color(strobe_color.with_brightness(0.0)))?;
    }

    let per_frame = (lights.len() / LIGHTS_PER_FRAME_DIVISOR).max(1);
    let mut picker = RandomFrames::new();
    let mut flashes = 0;
    for member in burst
        .iter()
        .filter(|m| m.duration() >= config.strobes.min_effect_seconds)
    {
        for light in picker.next_frame(&lights, per_frame, rng) {
            channel.add(Effect::strobe(&config.effects, strobe_color, light, *member))?;
            flashes += 1;
        }
    }

    log::debug!(
        "burst strobe at {:.2}s: {} segments, {flashes} flashes",
        range.start(),
        burst.len()
    );
    Ok(flashes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::effects::strobe::generate_grouped;
    use crate::effects::testing::Fixture;
    use crate::effects::StrobeGrouping;
    use crate::model::Color;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn burst(start: f64, durations: &[f64]) -> Vec<Interval> {
        let mut t = start;
        durations
            .iter()
            .map(|&d| {
                let i = Interval::new(t, d).unwrap();
                t += d;
                i
            })
            .collect()
    }

    #[test]
    fn flashes_every_member() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(6);
        let members = burst(36.0, &[0.12; 10]);
        let flashes = generate(&members, &fixture.config, &mut channels, &mut rng).unwrap();

        // Eight lights, two per frame.
        assert_eq!(flashes, 20);
        let strobe = channels.get(ChannelKind::Strobe);
        assert_eq!(strobe.effect_count(), 20 + 8);

        let lit = strobe
            .lights()
            .filter(|id| strobe.sample(*id, 36.06, Color::BLACK).unwrap().brightness() > 0.5)
            .count();
        assert_eq!(lit, 2);
    }

    #[test]
    fn members_shorter_than_bridge_rate_are_skipped() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(6);
        let members = burst(10.0, &[0.05, 0.05, 0.1, 0.1]);
        let flashes = generate(&members, &fixture.config, &mut channels, &mut rng).unwrap();
        assert_eq!(flashes, 4);
    }

    #[test]
    fn empty_burst_is_a_no_op() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(6);
        assert_eq!(generate(&[], &fixture.config, &mut channels, &mut rng).unwrap(), 0);
        assert_eq!(channels.effect_count(), 0);
    }

    #[test]
    fn trims_overlapping_strobes_to_the_burst() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let light = LightId::Hue { channel: 1 };
        channels
            .get_mut(ChannelKind::Strobe)
            .add(Effect::new(light, 35.0, 2.0).with_brightness(1.0))
            .unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let members = burst(36.0, &[0.12; 4]);
        let end = members.last().unwrap().end();
        generate(&members, &fixture.config, &mut channels, &mut rng).unwrap();

        let effects = channels.get(ChannelKind::Strobe).effects(light).unwrap();
        let first = effects.first().unwrap();
        let last = effects.last().unwrap();
        assert!((first.start() - 35.0).abs() < 1e-9 && (first.end() - 36.0).abs() < 1e-9);
        assert!((last.start() - end).abs() < 1e-9 && (last.end() - 37.0).abs() < 1e-9);
        for e in &effects[1..effects.len() - 1] {
            assert!(e.start() >= 36.0 - 1e-9 && e.end() <= end + 1e-9);
        }
    }

    #[test]
    fn burst_spilling_into_strobe_section_keeps_its_blackout() {
        let fixture = Fixture::demo();
        let mut channels = fixture.channels();
        let mut rng = StdRng::seed_from_u64(6);
        generate_grouped(StrobeGrouping::Horizontal, &fixture.context(2), &mut channels, &mut rng)
            .unwrap();

        let dark_at = |channels: &ChannelSet, t: f64| {
            let strobe = channels.get(ChannelKind::Strobe);
            strobe
                .lights()
                .filter(|id| strobe.sample(*id, t, Color::WHITE).unwrap().brightness() == 0.0)
                .count()
        };
        let before = dark_at(&channels, 40.05);
        assert_eq!(before, 6);

        // Section 2 starts at 32s; this burst starts half a second earlier.
        generate(&burst(31.5, &[0.125; 8]), &fixture.config, &mut channels, &mut rng).unwrap();
        assert_eq!(dark_at(&channels, 40.05), before);
        assert_eq!(dark_at(&channels, 32.6), 6);
    }
}
