use rand::Rng;
use serde::{Deserialize, Serialize};

use super::color::Color;
use super::gamut::ColorGamut;

/// Colors closer than this on the xy plane count as duplicates.
const MIN_COLOR_DISTANCE: f64 = 0.1;
const MIN_EFFECT_COLORS: usize = 4;
const MAX_EFFECT_COLORS: usize = 5;

/// Ordered set of colors generators pick from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorPalette {
    colors: Vec<Color>,
}

impl ColorPalette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    fn from_srgb8(colors: &[(u8, u8, u8)]) -> Self {
        Self::new(
            colors
                .iter()
                .map(|&(r, g, b)| Color::from_srgb8(r, g, b))
                .collect(),
        )
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Red, cyan, hot pink and purple.
    pub fn default_srgb() -> Self {
        Self::from_srgb8(&[(255, 0, 0), (0, 255, 255), (255, 105, 180), (102, 51, 153)])
    }

    /// Gamut C primaries and the midpoints between them.
    pub fn default_hdr() -> Self {
        let ColorGamut { red, green, blue } = ColorGamut::HUE_C;
        let (r, g, b) = (red.to_color(), green.to_color(), blue.to_color());
        Self::new(vec![
            r,
            r.lerp(g, 0.5),
            g,
            g.lerp(b, 0.5),
            b,
            b.lerp(r, 0.5),
        ])
    }

    /// Built-in palettes that fit inside sRGB.
    pub fn builtin_srgb() -> Vec<Self> {
        vec![
            Self::default_srgb(),
            Self::from_srgb8(&[(15, 192, 252), (123, 29, 175), (255, 47, 185), (212, 255, 71)]),
            Self::from_srgb8(&[(255, 0, 0), (0, 255, 0), (0, 0, 255), (255, 255, 0)]),
            Self::from_srgb8(&[
                (164, 20, 217),
                (255, 128, 43),
                (249, 225, 5),
                (52, 199, 165),
                (93, 80, 206),
            ]),
        ]
    }

    /// Pick a built-in palette. Wide-gamut palettes are only considered when `allow_hdr`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, allow_hdr: bool) -> Self {
        let mut palettes = Self::builtin_srgb();
        if allow_hdr {
            palettes.push(Self::default_hdr());
        }
        let index = rng.random_range(0..palettes.len());
        palettes.swap_remove(index)
    }

    /// Palette suitable for effects: near-duplicate colors are dropped, a
    /// palette left with too few colors is replaced by the default one and at
    /// most five colors are kept.
    pub fn for_effects(&self, allow_hdr: bool) -> Self {
        let mut kept: Vec<Color> = Vec::with_capacity(self.colors.len());
        for color in &self.colors {
            if kept
                .iter()
                .all(|k| k.xy_distance(color) >= MIN_COLOR_DISTANCE)
            {
                kept.push(*color);
            }
        }

        if kept.len() < MIN_EFFECT_COLORS {
            let fallback = if allow_hdr {
                Self::default_hdr()
            } else {
                Self::default_srgb()
            };
            kept = fallback.colors;
        }
        kept.truncate(MAX_EFFECT_COLORS);
        Self::new(kept)
    }
}
