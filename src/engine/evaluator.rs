use indexmap::IndexMap;

use super::channel::ChannelSet;
use crate::model::{Color, Light, LightId, LightRoster};

/// Output of one render tick: a gamut-clamped color per light, in roster order.
pub type LightColors = IndexMap<LightId, Color>;

/// Composed color of one light at `t`.
///
/// Pipeline:
/// 1. Start from black
/// 2. Fold every channel addressing the light, Background to Strobe
/// 3. Scale by the light's brightness multiplier
/// 4. Clamp into the light's gamut
pub fn evaluate_light(channels: &ChannelSet, light: &Light, t: f64) -> Color {
    let color = channels.sample(light.id, t, Color::BLACK);
    let color = color.with_brightness((color.brightness() * light.brightness).clamp(0.0, 1.0));
    color.clamp(&light.gamut)
}

/// Colors of every roster light at `t`.
pub fn evaluate(roster: &LightRoster, channels: &ChannelSet, t: f64) -> LightColors {
    roster
        .iter()
        .map(|light| (light.id, evaluate_light(channels, light, t)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::{ChannelKind, ChannelLights, Effect};
    use crate::model::{ColorGamut, GamutPoint, Position3};

    const HUE: LightId = LightId::Hue { channel: 1 };
    const SCREEN: LightId = LightId::Screen { index: 0 };

    fn roster() -> LightRoster {
        let mut dimmed = Light::new(SCREEN, Position3::default(), ColorGamut::SRGB);
        dimmed.brightness = 0.5;
        LightRoster::new([
            Light::new(HUE, Position3::default(), ColorGamut::HUE_A),
            dimmed,
        ])
        .unwrap()
    }

    #[test]
    fn unlit_lights_are_black() {
        let roster = roster();
        let channels = ChannelSet::new(&ChannelLights::single_channel(&roster));
        let colors = evaluate(&roster, &channels, 3.0);
        assert_eq!(colors.len(), 2);
        assert!(colors.values().all(|c| c.brightness() == 0.0));
        assert_eq!(colors.keys().copied().collect::<Vec<_>>(), vec![HUE, SCREEN]);
    }

    #[test]
    fn output_is_clamped_to_light_gamut() {
        let roster = roster();
        let mut channels = ChannelSet::new(&ChannelLights::single_channel(&roster));
        // Display P3 green lies outside sRGB.
        let green = Color::from_display_p3(0.0, 1.0, 0.0).unwrap();
        for light in [HUE, SCREEN] {
            channels
                .get_mut(ChannelKind::Default)
                .add(Effect::new(light, 0.0, 10.0).with_color(green))
                .unwrap();
        }
        let colors = evaluate(&roster, &channels, 5.0);
        let hue = colors[&HUE];
        let screen = colors[&SCREEN];
        assert!(ColorGamut::HUE_A.contains(GamutPoint::new(hue.x(), hue.y())));
        assert!(ColorGamut::SRGB.contains(GamutPoint::new(screen.x(), screen.y())));
        assert!((screen.brightness() - green.brightness() * 0.5).abs() < 1e-12);
    }

    #[test]
    fn lights_missing_from_channels_stay_black() {
        let roster = roster();
        let lights = ChannelLights {
            default: vec![HUE],
            ..ChannelLights::default()
        };
        let mut channels = ChannelSet::new(&lights);
        channels
            .get_mut(ChannelKind::Default)
            .add(Effect::new(HUE, 0.0, 1.0).with_brightness(1.0))
            .unwrap();
        let colors = evaluate(&roster, &channels, 0.5);
        assert_eq!(colors[&HUE].brightness(), 1.0);
        assert_eq!(colors[&SCREEN].brightness(), 0.0);
    }
}
