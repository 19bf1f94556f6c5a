use serde::{Deserialize, Serialize};

use super::mixer;
use crate::error::PipelineError;
use crate::model::{Color, GamutPoint, Interval, LightId};
use crate::settings::{EffectConfig, StrobeStyle};

/// A time-boxed change of one light's color and/or brightness.
///
/// The target is held over `[position, position + duration)`. Before that the
/// light fades in from whatever lower layers show over `fade_in` seconds; after
/// it fades back out over `fade_out` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub light: LightId,
    pub position: f64,
    pub duration: f64,
    /// Target chromaticity. None keeps the underlying chromaticity.
    pub chromaticity: Option<GamutPoint>,
    /// Target brightness. None keeps the underlying brightness.
    pub brightness: Option<f64>,
    pub fade_in: f64,
    pub fade_out: f64,
}

impl Effect {
    /// An effect that changes nothing until a target is set.
    pub fn new(light: LightId, position: f64, duration: f64) -> Self {
        Self {
            light,
            position,
            duration,
            chromaticity: None,
            brightness: None,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }

    /// Hold `interval` on `light`.
    pub fn over(light: LightId, interval: Interval) -> Self {
        Self::new(light, interval.start(), interval.duration())
    }

    /// Target both chromaticity and brightness of `color`.
    pub fn with_color(self, color: Color) -> Self {
        Self {
            chromaticity: Some(GamutPoint::new(color.x(), color.y())),
            brightness: Some(color.brightness()),
            ..self
        }
    }

    /// Target only the chromaticity of `color`.
    pub fn with_chromaticity(self, color: Color) -> Self {
        Self {
            chromaticity: Some(GamutPoint::new(color.x(), color.y())),
            ..self
        }
    }

    pub fn with_brightness(self, brightness: f64) -> Self {
        Self {
            brightness: Some(brightness),
            ..self
        }
    }

    pub fn with_fade_in(self, fade_in: f64) -> Self {
        Self { fade_in, ..self }
    }

    pub fn with_fade_out(self, fade_out: f64) -> Self {
        Self { fade_out, ..self }
    }

    /// A strobe flash on `light` covering `interval`, shaped by `config.strobe_style`.
    pub fn strobe(
        config: &EffectConfig,
        strobe_color: Color,
        light: LightId,
        interval: Interval,
    ) -> Self {
        let flash = Self::over(light, interval).with_color(strobe_color);
        match config.strobe_style {
            StrobeStyle::Instant => flash,
            StrobeStyle::Realistic => {
                let half = interval.duration() / 2.0;
                Self {
                    duration: half,
                    fade_out: interval.duration() - half,
                    ..flash
                }
            }
        }
    }

    /// Fade-in begins here.
    pub fn start(&self) -> f64 {
        self.position - self.fade_in
    }

    /// Fade-out ends here.
    pub fn end(&self) -> f64 {
        self.position + self.duration + self.fade_out
    }

    /// The whole span in which this effect is visible.
    pub fn span(&self) -> Interval {
        Interval::new_unchecked(self.start(), (self.end() - self.start()).max(0.0))
    }

    /// Visible at `t`: `start <= t < end`.
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start() && t < self.end()
    }

    /// This effect cut off at `t`, with `start < t < end`. A fade cut short is
    /// compressed into what remains.
    pub fn ending_at(self, t: f64) -> Self {
        let hold_end = self.position + self.duration;
        if t >= hold_end {
            Self {
                fade_out: t - hold_end,
                ..self
            }
        } else if t >= self.position {
            Self {
                duration: t - self.position,
                fade_out: 0.0,
                ..self
            }
        } else {
            Self {
                position: t,
                duration: 0.0,
                fade_in: t - self.start(),
                fade_out: 0.0,
                ..self
            }
        }
    }

    /// This effect with everything before `t` removed, with `start < t < end`.
    pub fn starting_at(self, t: f64) -> Self {
        let hold_end = self.position + self.duration;
        if t <= self.position {
            Self {
                fade_in: self.position - t,
                ..self
            }
        } else if t <= hold_end {
            Self {
                position: t,
                duration: hold_end - t,
                fade_in: 0.0,
                ..self
            }
        } else {
            Self {
                position: t,
                duration: 0.0,
                fade_in: 0.0,
                fade_out: self.end() - t,
                ..self
            }
        }
    }

    /// The parts of this effect reaching out of `range`: up to one piece
    /// before it and one after. Empty when the effect lies inside `range` or
    /// misses it entirely.
    pub fn outside(self, range: &Interval) -> impl Iterator<Item = Effect> {
        let crosses = |t: f64| self.start() < t && t < self.end();
        let before = crosses(range.start()).then(|| self.ending_at(range.start()));
        let after = crosses(range.end()).then(|| self.starting_at(range.end()));
        before.into_iter().chain(after)
    }

    /// Reject negative durations, non-finite times and brightness outside [0, 1].
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.position.is_finite() {
            return Err(PipelineError::invalid(format!(
                "Effect position must be finite, got {}",
                self.position
            )));
        }
        for (name, value) in [
            ("duration", self.duration),
            ("fade_in", self.fade_in),
            ("fade_out", self.fade_out),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::invalid(format!(
                    "Effect {name} must be non-negative, got {value}"
                )));
            }
        }
        if let Some(b) = self.brightness {
            if !(0.0..=1.0).contains(&b) {
                return Err(PipelineError::invalid(format!(
                    "Effect brightness must be within [0, 1], got {b}"
                )));
            }
        }
        Ok(())
    }

    /// `from` with the components this effect defines replaced by its targets.
    pub fn target_over(&self, from: Color) -> Color {
        mixer::overlay(from, self.chromaticity, self.brightness)
    }

    /// Color of the light at `t` given the color `from` shown underneath.
    ///
    /// Inside the hold window the target is returned unmodified. In the fade
    /// windows the color moves linearly between `from` and the target. Outside
    /// the effect `from` is returned.
    pub fn interpolate(&self, t: f64, from: Color) -> Color {
        let target = self.target_over(from);
        let hold_end = self.position + self.duration;

        if t >= self.position && t < hold_end {
            target
        } else if t < self.position {
            if self.fade_in <= 0.0 || t < self.start() {
                return from;
            }
            from.lerp(target, (t - self.start()) / self.fade_in)
        } else {
            if self.fade_out <= 0.0 {
                return if t == hold_end && self.duration <= 0.0 {
                    target
                } else {
                    from
                };
            }
            from.lerp(target, 1.0 - (t - hold_end) / self.fade_out)
        }
    }
}
