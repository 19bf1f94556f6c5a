use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::Color;

// ── Effect settings ──────────────────────────────────────────────

/// How strobe flashes are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrobeStyle {
    /// Full brightness for the whole flash, then off.
    #[default]
    Instant,
    /// Full brightness for the first half, then a linear decay like a flash tube.
    Realistic,
}

/// Brightness levels and strobe appearance shared by every generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Resting brightness of background and color effects.
    pub base_brightness: f64,
    /// Peak brightness of pulses.
    pub max_brightness: f64,
    /// Color temperature of strobe flashes in kelvin.
    pub strobe_cct: f64,
    pub strobe_style: StrobeStyle,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            base_brightness: 0.1,
            max_brightness: 1.0,
            strobe_cct: 5000.0,
            strobe_style: StrobeStyle::Instant,
        }
    }
}

impl EffectConfig {
    /// Full-brightness strobe color.
    pub fn strobe_color(&self) -> Result<Color, PipelineError> {
        Color::from_cct(self.strobe_cct, 1.0)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, value) in [
            ("base_brightness", self.base_brightness),
            ("max_brightness", self.max_brightness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Config {
                    message: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }
        self.strobe_color().map_err(|e| PipelineError::Config {
            message: e.to_string(),
        })?;
        Ok(())
    }
}

// ── Analysis settings ────────────────────────────────────────────

/// Burst detector thresholds. Empirically tuned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    /// Maximum relative duration difference between neighbours of one run.
    pub duration_tolerance: f64,
    pub min_length: usize,
    /// Member duration ceiling at `min_length` members.
    pub max_duration_short: f64,
    /// Member duration ceiling at `long_length` members and beyond.
    pub max_duration_long: f64,
    pub long_length: usize,
    /// Confidence threshold for members of `confidence_short_duration` seconds.
    pub min_confidence_low: f64,
    /// Confidence threshold for members of `confidence_long_duration` seconds.
    pub min_confidence_high: f64,
    pub confidence_short_duration: f64,
    pub confidence_long_duration: f64,
    /// Share of members that must exceed their confidence threshold.
    pub confident_share: f64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            duration_tolerance: 0.15,
            min_length: 4,
            max_duration_short: 0.20,
            max_duration_long: 0.15,
            long_length: 12,
            min_confidence_low: 0.3,
            min_confidence_high: 0.6,
            confidence_short_duration: 0.1,
            confidence_long_duration: 0.2,
            confident_share: 2.0 / 3.0,
        }
    }
}

/// Strobe grid limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrobeConfig {
    /// Shortest flash the light transport can show as a distinct update
    /// (two frames at 25 Hz).
    pub min_effect_seconds: f64,
}

impl Default for StrobeConfig {
    fn default() -> Self {
        Self {
            min_effect_seconds: 0.08,
        }
    }
}

// ── Pipeline settings ────────────────────────────────────────────

pub const DEFAULT_SEED: u64 = 0x5EED_1157;

/// Everything that tunes a timeline build. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub effects: EffectConfig,
    pub bursts: BurstConfig,
    pub strobes: StrobeConfig,
    /// Seed for generator randomness. None uses [`DEFAULT_SEED`].
    pub seed: Option<u64>,
    /// Allow wide-gamut palettes.
    pub allow_hdr: bool,
    /// Skip the track-wide background color cycle.
    pub disable_background: bool,
}

impl PipelineConfig {
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }
}

/// Load a config file. Fields missing from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig, PipelineError> {
    let data = fs::read_to_string(path)?;
    let config: PipelineConfig = serde_json::from_str(&data)?;
    config.effects.validate()?;
    Ok(config)
}

/// Write a config file atomically (temp file, then rename).
pub fn save_config(path: &Path, config: &PipelineConfig) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes())?;
    fs::rename(&tmp, path)?;
    Ok(())
}
