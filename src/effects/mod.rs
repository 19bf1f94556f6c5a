//! Effect generators. Each generator fills the channels for one section; the
//! intensity of the section decides which generator runs.

pub mod background;
pub mod bright_pulse;
pub mod burst_strobe;
pub mod color_switch;
pub mod star_pulse;
pub mod strobe;

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::analyzer::Intensity;
use crate::engine::{ChannelKind, ChannelSet};
use crate::error::PipelineError;
use crate::model::{AudioAnalysis, ColorPalette, LightRoster, Section, Segment, Tempo};
use crate::settings::PipelineConfig;

/// Everything a generator reads while filling one section.
#[derive(Debug, Clone, Copy)]
pub struct SectionContext<'a> {
    pub analysis: &'a AudioAnalysis,
    pub section: &'a Section,
    pub roster: &'a LightRoster,
    pub palette: &'a ColorPalette,
    pub config: &'a PipelineConfig,
}

impl SectionContext<'_> {
    /// Segments starting inside the section.
    pub fn segments(&self) -> &[Segment] {
        self.analysis.section_segments(self.section)
    }
}

// ── Effect kinds ─────────────────────────────────────────────────

/// Shape and color of a bright pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseStyle {
    /// One brightness pulse per beat over the background color.
    Default,
    /// Half-speed pulses, one per bar.
    Slow,
    /// One white flash per beat on the flash channel.
    White,
}

/// How strobe lights are split into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrobeGrouping {
    /// Left to right.
    Horizontal,
    /// Bottom to top.
    Vertical,
    /// Fixed random groups.
    Random,
}

/// The built-in section generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "variant", rename_all = "snake_case")]
pub enum EffectKind {
    BrightPulse(PulseStyle),
    StarPulse,
    ColorSwitch,
    GroupedStrobe(StrobeGrouping),
    RandomStrobe,
}

impl EffectKind {
    /// Fill `channels` for the section in `ctx`.
    pub fn generate<R: Rng + ?Sized>(
        self,
        ctx: &SectionContext<'_>,
        channels: &mut ChannelSet,
        rng: &mut R,
    ) -> Result<(), PipelineError> {
        match self {
            EffectKind::BrightPulse(style) => bright_pulse::generate(style, ctx, channels, rng),
            EffectKind::StarPulse => star_pulse::generate(ctx, channels, rng),
            EffectKind::ColorSwitch => color_switch::generate(ctx, channels, rng),
            EffectKind::GroupedStrobe(grouping) => {
                strobe::generate_grouped(grouping, ctx, channels, rng)
            }
            EffectKind::RandomStrobe => strobe::generate_random(ctx, channels, rng),
        }
    }

    /// The channel the generator writes its effects to.
    pub fn channel(self) -> ChannelKind {
        match self {
            EffectKind::BrightPulse(PulseStyle::White) => ChannelKind::Flash,
            EffectKind::BrightPulse(_) | EffectKind::StarPulse | EffectKind::ColorSwitch => {
                ChannelKind::Default
            }
            EffectKind::GroupedStrobe(_) | EffectKind::RandomStrobe => ChannelKind::Strobe,
        }
    }

    pub fn is_strobe(self) -> bool {
        self.channel() == ChannelKind::Strobe
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectKind::BrightPulse(PulseStyle::Default) => f.write_str("bright pulse"),
            EffectKind::BrightPulse(PulseStyle::Slow) => f.write_str("slow bright pulse"),
            EffectKind::BrightPulse(PulseStyle::White) => f.write_str("white bright pulse"),
            EffectKind::StarPulse => f.write_str("star pulse"),
            EffectKind::ColorSwitch => f.write_str("color switch"),
            EffectKind::GroupedStrobe(StrobeGrouping::Horizontal) => {
                f.write_str("horizontal strobe")
            }
            EffectKind::GroupedStrobe(StrobeGrouping::Vertical) => f.write_str("vertical strobe"),
            EffectKind::GroupedStrobe(StrobeGrouping::Random) => f.write_str("grouped strobe"),
            EffectKind::RandomStrobe => f.write_str("random strobe"),
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────

/// Generators registered per intensity level.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    entries: IndexMap<Intensity, Vec<EffectKind>>,
}

/// The built-in intensity table.
pub static BUILTIN_EFFECTS: LazyLock<EffectRegistry> = LazyLock::new(|| {
    let mut registry = EffectRegistry::default();
    registry.register(Intensity::VeryLow, EffectKind::BrightPulse(PulseStyle::Slow));
    registry.register(Intensity::Low, EffectKind::StarPulse);
    registry.register(Intensity::Medium, EffectKind::ColorSwitch);
    registry.register(Intensity::High, EffectKind::BrightPulse(PulseStyle::Default));
    for kind in [
        EffectKind::BrightPulse(PulseStyle::White),
        EffectKind::GroupedStrobe(StrobeGrouping::Horizontal),
        EffectKind::GroupedStrobe(StrobeGrouping::Vertical),
        EffectKind::GroupedStrobe(StrobeGrouping::Random),
        EffectKind::RandomStrobe,
    ] {
        registry.register(Intensity::VeryHigh, kind);
    }
    registry
});

impl EffectRegistry {
    pub fn register(&mut self, intensity: Intensity, kind: EffectKind) {
        self.entries.entry(intensity).or_default().push(kind);
    }

    /// Generators registered at exactly `intensity`.
    pub fn at(&self, intensity: Intensity) -> &[EffectKind] {
        self.entries.get(&intensity).map_or(&[], Vec::as_slice)
    }
}

/// One generator per intensity level, drawn once per track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectSelection {
    chosen: IndexMap<Intensity, EffectKind>,
}

impl EffectSelection {
    /// Pick one of the registered generators for every level.
    pub fn pick<R: Rng + ?Sized>(registry: &EffectRegistry, rng: &mut R) -> Self {
        let chosen = Intensity::ALL
            .into_iter()
            .filter_map(|level| registry.at(level).choose(rng).map(|kind| (level, *kind)))
            .collect();
        Self { chosen }
    }

    /// The generator at `intensity`, else the one a level below, else a level above.
    pub fn get(&self, intensity: Intensity) -> Option<EffectKind> {
        [0, -1, 1]
            .into_iter()
            .filter_map(|delta| Intensity::try_from(intensity.level() + delta).ok())
            .find_map(|level| self.chosen.get(&level).copied())
    }

    /// The generator for a section. Sections without a usable beat get none.
    pub fn for_section(&self, intensity: Intensity, tempo: &Tempo) -> Option<EffectKind> {
        if !tempo.has_rhythm() {
            return None;
        }
        self.get(intensity)
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn builtin_table_covers_every_level() {
        for level in Intensity::ALL {
            assert!(!BUILTIN_EFFECTS.at(level).is_empty(), "{level}");
        }
        assert_eq!(BUILTIN_EFFECTS.at(Intensity::VeryHigh).len(), 5);
    }

    #[test]
    fn selection_is_deterministic_per_seed() {
        let a = EffectSelection::pick(&BUILTIN_EFFECTS, &mut StdRng::seed_from_u64(9));
        let b = EffectSelection::pick(&BUILTIN_EFFECTS, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_eq!(a.get(Intensity::Medium), Some(EffectKind::ColorSwitch));
    }

    #[test]
    fn missing_level_falls_back_below_then_above() {
        let mut registry = EffectRegistry::default();
        registry.register(Intensity::Low, EffectKind::StarPulse);
        registry.register(Intensity::High, EffectKind::ColorSwitch);
        let selection = EffectSelection::pick(&registry, &mut StdRng::seed_from_u64(1));

        assert_eq!(selection.get(Intensity::Medium), Some(EffectKind::StarPulse));
        assert_eq!(selection.get(Intensity::VeryLow), Some(EffectKind::StarPulse));
        assert_eq!(selection.get(Intensity::VeryHigh), Some(EffectKind::ColorSwitch));
    }

    #[test]
    fn no_rhythm_means_no_effect() {
        let selection = EffectSelection::pick(&BUILTIN_EFFECTS, &mut StdRng::seed_from_u64(1));
        let silent = Tempo::new(0.0, 4).unwrap();
        let crawling = Tempo::new(0.5, 4).unwrap();
        assert_eq!(selection.for_section(Intensity::High, &silent), None);
        assert_eq!(selection.for_section(Intensity::High, &crawling), None);
        assert!(selection
            .for_section(Intensity::High, &Tempo::new(120.0, 4).unwrap())
            .is_some());
    }

    #[test]
    fn channels_follow_kind() {
        assert_eq!(EffectKind::BrightPulse(PulseStyle::White).channel(), ChannelKind::Flash);
        assert_eq!(EffectKind::StarPulse.channel(), ChannelKind::Default);
        assert!(EffectKind::RandomStrobe.is_strobe());
        assert!(!EffectKind::ColorSwitch.is_strobe());
    }

    #[test]
    fn kinds_serialize_with_tag() {
        let json = serde_json::to_string(&EffectKind::GroupedStrobe(StrobeGrouping::Vertical)).unwrap();
        assert_eq!(json, r#"{"kind":"grouped_strobe","variant":"vertical"}"#);
    }
}
