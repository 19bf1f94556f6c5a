use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::gamut::ColorGamut;
use crate::error::PipelineError;

/// Identity of an addressable light. Equality and hashing are by
/// (kind, payload), so a Hue channel and a screen slot never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LightId {
    /// Entertainment-area channel on a Hue bridge.
    Hue { channel: u8 },
    /// Virtual light rendered on screen.
    Screen { index: u32 },
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightId::Hue { channel } => write!(f, "hue:{channel}"),
            LightId::Screen { index } => write!(f, "screen:{index}"),
        }
    }
}

impl FromStr for LightId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::invalid(format!("Invalid light id: {s:?}"));
        let (kind, payload) = s.split_once(':').ok_or_else(invalid)?;
        match kind {
            "hue" => payload
                .parse()
                .map(|channel| LightId::Hue { channel })
                .map_err(|_| invalid()),
            "screen" => payload
                .parse()
                .map(|index| LightId::Screen { index })
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl From<LightId> for String {
    fn from(id: LightId) -> String {
        id.to_string()
    }
}

impl TryFrom<String> for LightId {
    type Error = PipelineError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Position in the room. x runs left to right, y back to front, z bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Spatial axis used for grouping lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn of(self, position: &Position3) -> f64 {
        match self {
            Axis::X => position.x,
            Axis::Y => position.y,
            Axis::Z => position.z,
        }
    }
}

fn default_brightness() -> f64 {
    1.0
}

/// A light supplied by the roster. The pipeline never creates lights, it only
/// addresses them by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub id: LightId,
    pub position: Position3,
    pub gamut: ColorGamut,
    /// Output brightness multiplier in [0, 1].
    #[serde(default = "default_brightness")]
    pub brightness: f64,
}

impl Light {
    pub fn new(id: LightId, position: Position3, gamut: ColorGamut) -> Self {
        Self {
            id,
            position,
            gamut,
            brightness: 1.0,
        }
    }
}

/// Axis-aligned bounding box of a roster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LightBounds {
    pub min: Position3,
    pub max: Position3,
}

/// Ordered set of lights keyed by id. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(into = "Vec<Light>")]
pub struct LightRoster {
    lights: IndexMap<LightId, Light>,
}

impl From<LightRoster> for Vec<Light> {
    fn from(roster: LightRoster) -> Self {
        roster.lights.into_values().collect()
    }
}

impl<'de> Deserialize<'de> for LightRoster {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let lights = Vec::<Light>::deserialize(deserializer)?;
        LightRoster::new(lights).map_err(serde::de::Error::custom)
    }
}

impl LightRoster {
    /// Build a roster. Duplicate ids and brightness outside [0, 1] are rejected.
    pub fn new(lights: impl IntoIterator<Item = Light>) -> Result<Self, PipelineError> {
        let mut map = IndexMap::new();
        for light in lights {
            if !(0.0..=1.0).contains(&light.brightness) {
                return Err(PipelineError::invalid(format!(
                    "Light {} brightness must be within [0, 1], got {}",
                    light.id, light.brightness
                )));
            }
            if map.insert(light.id, light.clone()).is_some() {
                return Err(PipelineError::invalid(format!(
                    "Duplicate light id {}",
                    light.id
                )));
            }
        }
        Ok(Self { lights: map })
    }

    pub fn get(&self, id: LightId) -> Option<&Light> {
        self.lights.get(&id)
    }

    pub fn contains(&self, id: LightId) -> bool {
        self.lights.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = LightId> + '_ {
        self.lights.keys().copied()
    }

    /// Bounding box of all positions, or None for an empty roster.
    pub fn bounds(&self) -> Option<LightBounds> {
        let mut lights = self.iter();
        let first = lights.next()?.position;
        Some(lights.fold(
            LightBounds {
                min: first,
                max: first,
            },
            |b, light| {
                let p = light.position;
                LightBounds {
                    min: Position3::new(b.min.x.min(p.x), b.min.y.min(p.y), b.min.z.min(p.z)),
                    max: Position3::new(b.max.x.max(p.x), b.max.y.max(p.y), b.max.z.max(p.z)),
                }
            },
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn hue(channel: u8, x: f64) -> Light {
        Light::new(
            LightId::Hue { channel },
            Position3::new(x, 0.0, 0.0),
            ColorGamut::HUE_C,
        )
    }

    #[test]
    fn ids_compare_by_kind_and_payload() {
        assert_ne!(LightId::Hue { channel: 1 }, LightId::Screen { index: 1 });
        assert_eq!(LightId::Hue { channel: 1 }, LightId::Hue { channel: 1 });
    }

    #[test]
    fn id_string_round_trip() {
        for id in [LightId::Hue { channel: 7 }, LightId::Screen { index: 12 }] {
            assert_eq!(id.to_string().parse::<LightId>().unwrap(), id);
        }
        assert!("lamp:1".parse::<LightId>().is_err());
        assert!("hue:300".parse::<LightId>().is_err());
    }

    #[test]
    fn roster_rejects_duplicates() {
        let err = LightRoster::new([hue(1, 0.0), hue(1, 1.0)]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput { .. }));
    }

    #[test]
    fn roster_keeps_insertion_order() {
        let roster = LightRoster::new([hue(3, 0.0), hue(1, 1.0), hue(2, 2.0)]).unwrap();
        let ids: Vec<LightId> = roster.ids().collect();
        assert_eq!(
            ids,
            vec![
                LightId::Hue { channel: 3 },
                LightId::Hue { channel: 1 },
                LightId::Hue { channel: 2 }
            ]
        );
    }

    #[test]
    fn bounds_cover_all_lights() {
        let roster = LightRoster::new([hue(1, -1.0), hue(2, 2.5)]).unwrap();
        let bounds = roster.bounds().unwrap();
        assert!((bounds.min.x + 1.0).abs() < 1e-12);
        assert!((bounds.max.x - 2.5).abs() < 1e-12);
        assert!(LightRoster::default().bounds().is_none());
    }

    #[test]
    fn roster_deserializes_from_list() {
        let json = r#"[
            {"id": "hue:1", "position": {"x": 0.0, "y": 0.0, "z": 0.0},
             "gamut": {"red": {"x": 0.64, "y": 0.33}, "green": {"x": 0.3, "y": 0.6}, "blue": {"x": 0.15, "y": 0.06}}}
        ]"#;
        let roster: LightRoster = serde_json::from_str(json).unwrap();
        let light = roster.get(LightId::Hue { channel: 1 }).unwrap();
        assert!((light.brightness - 1.0).abs() < 1e-12);
        assert_eq!(light.gamut, ColorGamut::SRGB);
    }
}
