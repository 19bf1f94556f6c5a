use super::channel::ChannelSet;
use super::evaluator::{self, LightColors};
use crate::model::{Color, LightId, LightRoster};

/// A track's finished light show: the roster it addresses and the filled
/// channels. Immutable once built; sampled at every render tick.
#[derive(Debug, Clone)]
pub struct Timeline {
    roster: LightRoster,
    channels: ChannelSet,
    duration: f64,
}

impl Timeline {
    pub fn new(roster: LightRoster, channels: ChannelSet, duration: f64) -> Self {
        Self {
            roster,
            channels,
            duration,
        }
    }

    pub fn roster(&self) -> &LightRoster {
        &self.roster
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Track length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn effect_count(&self) -> usize {
        self.channels.effect_count()
    }

    /// Gamut-clamped color of every light at playback progress `t`.
    pub fn sample(&self, t: f64) -> LightColors {
        evaluator::evaluate(&self.roster, &self.channels, t)
    }

    /// Color of a single light at `t`, or None if the roster lacks it.
    pub fn sample_light(&self, light: LightId, t: f64) -> Option<Color> {
        self.roster
            .get(light)
            .map(|l| evaluator::evaluate_light(&self.channels, l, t))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::{ChannelKind, ChannelLights, Effect};
    use crate::model::{ColorGamut, Light, Position3};

    #[test]
    fn samples_every_roster_light() {
        let a = LightId::Hue { channel: 3 };
        let b = LightId::Hue { channel: 4 };
        let roster = LightRoster::new([
            Light::new(a, Position3::default(), ColorGamut::HUE_C),
            Light::new(b, Position3::default(), ColorGamut::HUE_C),
        ])
        .unwrap();
        let mut channels = ChannelSet::new(&ChannelLights::single_channel(&roster));
        channels
            .get_mut(ChannelKind::Flash)
            .add(Effect::new(a, 1.0, 1.0).with_color(Color::WHITE))
            .unwrap();
        let timeline = Timeline::new(roster, channels, 10.0);

        assert_eq!(timeline.effect_count(), 1);
        let frame = timeline.sample(1.5);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame[&a].brightness(), 1.0);
        assert_eq!(frame[&b].brightness(), 0.0);
        assert_eq!(timeline.sample_light(a, 1.5), Some(frame[&a]));
        assert_eq!(timeline.sample_light(LightId::Screen { index: 0 }, 1.5), None);
    }
}
