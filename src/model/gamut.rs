use serde::{Deserialize, Serialize};

use super::color::Color;

/// Sign values this close to zero count as "on the edge" so that points
/// produced by [`ColorGamut::closest_point`] test as contained.
const EDGE_EPSILON: f64 = 1e-9;

/// A point on the CIE 1931 chromaticity plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GamutPoint {
    pub x: f64,
    pub y: f64,
}

impl GamutPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_squared(self, other: GamutPoint) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Full-brightness color at this chromaticity.
    pub fn to_color(self) -> Color {
        Color::from_xy_brightness(self.x, self.y, 1.0)
    }
}

/// Triangle of reproducible chromaticities spanned by a device's primaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorGamut {
    pub red: GamutPoint,
    pub green: GamutPoint,
    pub blue: GamutPoint,
}

impl ColorGamut {
    pub const SRGB: ColorGamut = ColorGamut::new(
        GamutPoint::new(0.64, 0.33),
        GamutPoint::new(0.30, 0.60),
        GamutPoint::new(0.15, 0.06),
    );

    pub const DISPLAY_P3: ColorGamut = ColorGamut::new(
        GamutPoint::new(0.680, 0.320),
        GamutPoint::new(0.265, 0.690),
        GamutPoint::new(0.150, 0.060),
    );

    /// Philips Hue gamut A (older LivingColors / Bloom).
    pub const HUE_A: ColorGamut = ColorGamut::new(
        GamutPoint::new(0.704, 0.296),
        GamutPoint::new(0.2151, 0.7106),
        GamutPoint::new(0.138, 0.08),
    );

    /// Philips Hue gamut B (first generation bulbs).
    pub const HUE_B: ColorGamut = ColorGamut::new(
        GamutPoint::new(0.675, 0.322),
        GamutPoint::new(0.409, 0.518),
        GamutPoint::new(0.167, 0.04),
    );

    /// Philips Hue gamut C (current bulbs and strips).
    pub const HUE_C: ColorGamut = ColorGamut::new(
        GamutPoint::new(0.6915, 0.3038),
        GamutPoint::new(0.17, 0.7),
        GamutPoint::new(0.1532, 0.0475),
    );

    pub const fn new(red: GamutPoint, green: GamutPoint, blue: GamutPoint) -> Self {
        Self { red, green, blue }
    }

    /// Point-in-triangle test by edge signs. Points on an edge are inside.
    pub fn contains(&self, point: GamutPoint) -> bool {
        fn sign(p1: GamutPoint, p2: GamutPoint, p3: GamutPoint) -> f64 {
            (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
        }

        let signs = [
            sign(point, self.red, self.green),
            sign(point, self.green, self.blue),
            sign(point, self.blue, self.red),
        ];
        let has_neg = signs.iter().any(|&d| d < -EDGE_EPSILON);
        let has_pos = signs.iter().any(|&d| d > EDGE_EPSILON);
        !(has_neg && has_pos)
    }

    /// Nearest point on the triangle's boundary.
    pub fn closest_point(&self, point: GamutPoint) -> GamutPoint {
        [
            closest_point_on_segment(self.red, self.green, point),
            closest_point_on_segment(self.green, self.blue, point),
            closest_point_on_segment(self.blue, self.red, point),
        ]
        .into_iter()
        .min_by(|a, b| point.distance_squared(*a).total_cmp(&point.distance_squared(*b)))
        .unwrap_or(self.red)
    }

    /// Move a color's chromaticity into the gamut, keeping its brightness.
    /// Colors already inside are returned unchanged.
    pub fn clamp(&self, color: Color) -> Color {
        let point = GamutPoint::new(color.x(), color.y());
        if self.contains(point) {
            return color;
        }
        let nearest = self.closest_point(point);
        color.with_chromaticity(nearest.x, nearest.y)
    }
}

fn closest_point_on_segment(a: GamutPoint, b: GamutPoint, p: GamutPoint) -> GamutPoint {
    let (apx, apy) = (p.x - a.x, p.y - a.y);
    let (abx, aby) = (b.x - a.x, b.y - a.y);

    let length_squared = abx * abx + aby * aby;
    if length_squared <= 0.0 {
        return a;
    }
    let t = (apx * abx + apy * aby) / length_squared;

    if t < 0.0 {
        a
    } else if t > 1.0 {
        b
    } else {
        GamutPoint::new(a.x + abx * t, a.y + aby * t)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn white_point_is_inside_wide_gamuts() {
        // D65 lies just outside Hue gamut B.
        let d65 = GamutPoint::new(0.3127, 0.3290);
        for gamut in [
            ColorGamut::SRGB,
            ColorGamut::DISPLAY_P3,
            ColorGamut::HUE_A,
            ColorGamut::HUE_C,
        ] {
            assert!(gamut.contains(d65));
        }
    }

    #[test]
    fn vertices_are_contained() {
        let g = ColorGamut::HUE_B;
        assert!(g.contains(g.red));
        assert!(g.contains(g.green));
        assert!(g.contains(g.blue));
    }

    #[test]
    fn far_point_is_outside() {
        assert!(!ColorGamut::SRGB.contains(GamutPoint::new(0.9, 0.9)));
        assert!(!ColorGamut::SRGB.contains(GamutPoint::new(0.0, 0.0)));
    }

    #[test]
    fn closest_point_snaps_to_nearest_vertex() {
        let g = ColorGamut::SRGB;
        let p = g.closest_point(GamutPoint::new(0.8, 0.3));
        assert!((p.x - 0.64).abs() < 1e-12);
        assert!((p.y - 0.33).abs() < 1e-12);
    }

    #[test]
    fn closest_point_projects_onto_edge() {
        // Below the blue-red edge: the projection lies strictly between the vertices.
        let g = ColorGamut::SRGB;
        let p = g.closest_point(GamutPoint::new(0.4, 0.1));
        assert!(p.x > 0.15 && p.x < 0.64);
        assert!(g.contains(p));
    }

    #[test]
    fn clamp_keeps_brightness() {
        let c = Color::from_xy_brightness(0.1, 0.8, 0.42);
        let clamped = ColorGamut::HUE_B.clamp(c);
        assert!((clamped.brightness() - 0.42).abs() < 1e-12);
        assert!(ColorGamut::HUE_B.contains(GamutPoint::new(clamped.x(), clamped.y())));
    }

    #[test]
    fn clamp_inside_is_identity() {
        let c = Color::from_xy_brightness(0.33, 0.33, 0.5);
        assert_eq!(ColorGamut::SRGB.clamp(c), c);
    }

    proptest! {
        #[test]
        fn clamp_is_idempotent(x in 0f64..0.8, y in 0f64..0.9, brightness in 0f64..=1.0) {
            let c = Color::from_xy_brightness(x, y, brightness);
            for gamut in [ColorGamut::SRGB, ColorGamut::HUE_A, ColorGamut::HUE_C] {
                let once = gamut.clamp(c);
                prop_assert_eq!(gamut.clamp(once), once);
            }
        }
    }
}
