use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::gamut::ColorGamut;
use crate::error::PipelineError;

type Matrix3 = [[f64; 3]; 3];

/// Linear sRGB (D65) → CIE XYZ.
const LINEAR_SRGB_TO_XYZ: Matrix3 = [
    [0.412_456_4, 0.357_576_1, 0.180_437_5],
    [0.212_672_9, 0.715_152_2, 0.072_175_0],
    [0.019_333_9, 0.119_192_0, 0.950_304_1],
];

/// Linear Display P3 (D65) → CIE XYZ.
const LINEAR_P3_TO_XYZ: Matrix3 = [
    [0.486_570_9, 0.265_667_7, 0.198_217_3],
    [0.228_974_6, 0.691_738_5, 0.079_286_9],
    [0.000_000_0, 0.045_113_4, 1.043_944_4],
];

// Inverses are derived so that RGB → XYZ → RGB round-trips to machine precision.
static XYZ_TO_LINEAR_SRGB: LazyLock<Matrix3> = LazyLock::new(|| invert(&LINEAR_SRGB_TO_XYZ));
static XYZ_TO_LINEAR_P3: LazyLock<Matrix3> = LazyLock::new(|| invert(&LINEAR_P3_TO_XYZ));

/// Chromaticity of the D65 white point. Used as the chromaticity of black,
/// which has none of its own.
const D65_X: f64 = 0.3127;
const D65_Y: f64 = 0.3290;

fn mul(m: &Matrix3, v: [f64; 3]) -> [f64; 3] {
    let [[a, b, c], [d, e, f], [g, h, i]] = *m;
    let [x, y, z] = v;
    [
        a * x + b * y + c * z,
        d * x + e * y + f * z,
        g * x + h * y + i * z,
    ]
}

fn invert(m: &Matrix3) -> Matrix3 {
    let [[a, b, c], [d, e, f], [g, h, i]] = *m;
    let det = a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g);
    let inv = 1.0 / det;
    [
        [(e * i - f * h) * inv, (c * h - b * i) * inv, (b * f - c * e) * inv],
        [(f * g - d * i) * inv, (a * i - c * g) * inv, (c * d - a * f) * inv],
        [(d * h - e * g) * inv, (b * g - a * h) * inv, (a * e - b * d) * inv],
    ]
}

/// sRGB transfer function (also used by Display P3).
fn compand(linear: f64) -> f64 {
    if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

fn decompand(encoded: f64) -> f64 {
    if encoded <= 0.040_45 {
        encoded / 12.92
    } else {
        ((encoded + 0.055) / 1.055).powf(2.4)
    }
}

fn check_unit(name: &str, value: f64) -> Result<f64, PipelineError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PipelineError::invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// RGB triple with components nominally in [0, 1]. Colors outside the RGB
/// space's gamut convert to components outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    fn from_array([r, g, b]: [f64; 3]) -> Self {
        Self { r, g, b }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    fn validated(self) -> Result<Self, PipelineError> {
        check_unit("red", self.r)?;
        check_unit("green", self.g)?;
        check_unit("blue", self.b)?;
        Ok(self)
    }
}

/// CIE xyY color: chromaticity (x, y) plus relative luminance in [0, 1].
/// Every light-facing color in the pipeline uses this representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    x: f64,
    y: f64,
    brightness: f64,
}

impl Color {
    /// No luminance. Chromaticity is the D65 white point so interpolating
    /// out of black only changes brightness.
    pub const BLACK: Color = Color::from_xy_brightness(D65_X, D65_Y, 0.0);
    /// D65 white at full brightness.
    pub const WHITE: Color = Color::from_xy_brightness(D65_X, D65_Y, 1.0);

    /// Validated constructor. Every component must be within [0, 1].
    pub fn new(x: f64, y: f64, brightness: f64) -> Result<Self, PipelineError> {
        Ok(Self {
            x: check_unit("x", x)?,
            y: check_unit("y", y)?,
            brightness: check_unit("brightness", brightness)?,
        })
    }

    pub(crate) const fn from_xy_brightness(x: f64, y: f64, brightness: f64) -> Self {
        Self { x, y, brightness }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn with_brightness(self, brightness: f64) -> Self {
        Self { brightness, ..self }
    }

    pub fn with_chromaticity(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    // ── XYZ ──────────────────────────────────────────────────────

    /// From CIE XYZ tristimulus values. A zero sum maps to black.
    pub fn from_xyz(x: f64, y: f64, z: f64) -> Self {
        let sum = x + y + z;
        if sum <= 0.0 {
            return Self::BLACK.with_brightness(y.max(0.0));
        }
        Self {
            x: x / sum,
            y: y / sum,
            brightness: y,
        }
    }

    /// To CIE XYZ tristimulus values `[X, Y, Z]`.
    pub fn to_xyz(&self) -> [f64; 3] {
        if self.y <= 0.0 {
            return [0.0, 0.0, 0.0];
        }
        let luminance = self.brightness;
        [
            luminance / self.y * self.x,
            luminance,
            luminance / self.y * (1.0 - self.x - self.y),
        ]
    }

    // ── RGB ──────────────────────────────────────────────────────

    pub fn from_linear_srgb(rgb: Rgb) -> Result<Self, PipelineError> {
        let [x, y, z] = mul(&LINEAR_SRGB_TO_XYZ, rgb.validated()?.to_array());
        Ok(Self::from_xyz(x, y, z))
    }

    pub fn to_linear_srgb(&self) -> Rgb {
        Rgb::from_array(mul(&XYZ_TO_LINEAR_SRGB, self.to_xyz()))
    }

    /// From gamma-encoded sRGB components in [0, 1].
    pub fn from_srgb(r: f64, g: f64, b: f64) -> Result<Self, PipelineError> {
        let linear = Rgb::new(r, g, b).validated()?.map(decompand);
        Self::from_linear_srgb(linear)
    }

    /// From 8-bit sRGB components.
    pub fn from_srgb8(r: u8, g: u8, b: u8) -> Self {
        let linear = Rgb::new(f64::from(r), f64::from(g), f64::from(b))
            .map(|c| decompand(c / 255.0));
        let [x, y, z] = mul(&LINEAR_SRGB_TO_XYZ, linear.to_array());
        Self::from_xyz(x, y, z)
    }

    /// To gamma-encoded sRGB. Out-of-gamut colors are not clipped.
    pub fn to_srgb(&self) -> Rgb {
        self.to_linear_srgb().map(compand)
    }

    pub fn from_display_p3(r: f64, g: f64, b: f64) -> Result<Self, PipelineError> {
        let linear = Rgb::new(r, g, b).validated()?.map(decompand);
        let [x, y, z] = mul(&LINEAR_P3_TO_XYZ, linear.to_array());
        Ok(Self::from_xyz(x, y, z))
    }

    pub fn to_display_p3(&self) -> Rgb {
        Rgb::from_array(mul(&XYZ_TO_LINEAR_P3, self.to_xyz())).map(compand)
    }

    // ── Color temperature ────────────────────────────────────────

    /// Chromaticity of a CIE illuminant D series daylight at `kelvin`
    /// (valid for 4000..=25000 K).
    pub fn from_cct(kelvin: f64, brightness: f64) -> Result<Self, PipelineError> {
        let t = kelvin;
        let x = if (4000.0..=7000.0).contains(&t) {
            0.244_063 + 0.099_11e3 / t + 2.9678e6 / t.powi(2) - 4.6070e9 / t.powi(3)
        } else if t > 7000.0 && t <= 25000.0 {
            0.237_040 + 0.247_48e3 / t + 1.9018e6 / t.powi(2) - 2.0064e9 / t.powi(3)
        } else {
            return Err(PipelineError::invalid(format!(
                "color temperature must be within 4000..=25000 K, got {kelvin}"
            )));
        };
        let y = -3.0 * x * x + 2.87 * x - 0.275;
        Self::new(x, y, brightness)
    }

    // ── Interpolation ────────────────────────────────────────────

    /// Linear interpolation of chromaticity and brightness. `t` is clamped to
    /// [0, 1] and the endpoints are returned exactly.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        if t <= 0.0 {
            self
        } else if t >= 1.0 {
            other
        } else {
            self.lerp_unclamped(other, t)
        }
    }

    pub fn lerp_unclamped(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            brightness: self.brightness + (other.brightness - self.brightness) * t,
        }
    }

    /// Euclidean distance between chromaticities. Brightness is ignored.
    pub fn xy_distance(&self, other: &Color) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Chromaticity clamped into `gamut`; brightness is preserved.
    pub fn clamp(self, gamut: &ColorGamut) -> Self {
        gamut.clamp(self)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}
