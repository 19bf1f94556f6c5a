//! Audio-reactive light shows: turns a track's audio analysis and a light
//! roster into a time-indexed, per-light color timeline.

pub mod analyzer;
pub mod demo;
pub mod effects;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod state;
pub mod util;
