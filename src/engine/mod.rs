//! Effect timeline: effects, compositing channels, strobe grids and per-light
//! evaluation.

pub mod channel;
pub mod effect;
pub mod evaluator;
pub mod grouping;
pub mod mixer;
pub mod strobe_sync;
pub mod timeline;

pub use channel::{ChannelKind, ChannelLights, ChannelSet, EffectChannel};
pub use effect::Effect;
pub use evaluator::LightColors;
pub use strobe_sync::{StrobeSlot, StrobeSync, SyncGrid};
pub use timeline::Timeline;
