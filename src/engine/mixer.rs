use crate::model::{Color, GamutPoint};

/// Override the components of `bg` that a layer defines. A layer may set only
/// chromaticity, only brightness, both or neither.
pub fn overlay(bg: Color, chromaticity: Option<GamutPoint>, brightness: Option<f64>) -> Color {
    let color = match chromaticity {
        Some(xy) => bg.with_chromaticity(xy.x, xy.y),
        None => bg,
    };
    match brightness {
        Some(b) => color.with_brightness(b),
        None => color,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn brightness_only_keeps_chromaticity() {
        let bg = Color::from_xy_brightness(0.2, 0.3, 0.1);
        let out = overlay(bg, None, Some(0.9));
        assert_eq!(out, Color::from_xy_brightness(0.2, 0.3, 0.9));
    }

    #[test]
    fn chromaticity_only_keeps_brightness() {
        let bg = Color::from_xy_brightness(0.2, 0.3, 0.1);
        let out = overlay(bg, Some(GamutPoint::new(0.5, 0.4)), None);
        assert_eq!(out, Color::from_xy_brightness(0.5, 0.4, 0.1));
    }

    #[test]
    fn empty_layer_is_identity() {
        let bg = Color::from_xy_brightness(0.2, 0.3, 0.1);
        assert_eq!(overlay(bg, None, None), bg);
    }
}
