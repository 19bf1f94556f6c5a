use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{AudioFeatures, Section};

/// Sections quieter than this (dB) start one level lower.
const QUIET_SECTION_DB: f64 = -15.0;

/// Five-point show intensity of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    VeryLow = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    VeryHigh = 5,
}

impl Intensity {
    pub const ALL: [Intensity; 5] = [
        Intensity::VeryLow,
        Intensity::Low,
        Intensity::Medium,
        Intensity::High,
        Intensity::VeryHigh,
    ];

    pub fn level(self) -> i32 {
        self as i32
    }

    fn clamped(level: i32) -> Self {
        match level {
            i32::MIN..=1 => Intensity::VeryLow,
            2 => Intensity::Low,
            3 => Intensity::Medium,
            4 => Intensity::High,
            _ => Intensity::VeryHigh,
        }
    }
}

impl TryFrom<i32> for Intensity {
    type Error = PipelineError;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        if (1..=5).contains(&level) {
            Ok(Self::clamped(level))
        } else {
            Err(PipelineError::invalid(format!(
                "Intensity must be within 1..=5, got {level}"
            )))
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intensity::VeryLow => "very low",
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
            Intensity::VeryHigh => "very high",
        };
        f.write_str(name)
    }
}

/// Index of the loudest section; the first one wins ties.
fn loudest_section(sections: &[Section]) -> Option<usize> {
    sections
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, s)| match best {
            Some((_, loudness)) if loudness >= s.loudness => best,
            _ => Some((i, s.loudness)),
        })
        .map(|(i, _)| i)
}

fn initial_level(features: &AudioFeatures, section: &Section) -> i32 {
    let mut level = (features.energy.clamp(0.0, 1.0) * 4.0).floor() as i32 + 1;
    if section.loudness < features.loudness {
        level -= 1;
    }
    if section.loudness < QUIET_SECTION_DB {
        level -= 1;
    }
    level.clamp(1, 5)
}

/// Intensity of every section, in section order.
///
/// Each section moves one level up or down with its loudness relative to the
/// previous section. The loudest section jumps one extra level, which the
/// following section gives back. Overshooting the top level instead lowers
/// every section computed so far by one.
pub fn compute_intensities(features: &AudioFeatures, sections: &[Section]) -> Vec<Intensity> {
    let loudest = loudest_section(sections);
    let last = sections.len().saturating_sub(1);

    let mut levels: Vec<i32> = Vec::with_capacity(sections.len());
    let mut previous: Option<(&Section, i32)> = None;
    let mut double_jump = false;

    for (i, section) in sections.iter().enumerate() {
        let level = match previous {
            None => initial_level(features, section),
            Some((prev_section, prev_level)) => {
                let mut level = prev_level;
                if section.loudness >= prev_section.loudness {
                    level += 1;
                } else {
                    level -= 1;
                }
                if double_jump && i != last {
                    level -= 1;
                }
                if loudest == Some(i) && level < 5 {
                    level += 1;
                    double_jump = true;
                } else {
                    double_jump = false;
                }
                if level > 5 && !double_jump {
                    level -= 1;
                    for earlier in &mut levels {
                        *earlier = (*earlier - 1).max(1);
                    }
                }
                level.clamp(1, 5)
            }
        };
        log::trace!(
            "section {i} at {:.2}s: {:.1} dB -> level {level}",
            section.interval.start(),
            section.loudness
        );
        levels.push(level);
        previous = Some((section, level));
    }

    levels.into_iter().map(Intensity::clamped).collect()
}
