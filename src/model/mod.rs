pub mod analysis;
pub mod color;
pub mod gamut;
pub mod interval;
pub mod light;
pub mod palette;

// Re-export commonly used types at the model level.
pub use analysis::{
    AudioAnalysis, AudioFeatures, Mode, RawAnalysis, RawSection, RawSegment, RawTrack, Section,
    Segment, Tempo, Timbre, Timings, TrackInfo, BEATS_PER_BAR, SEGMENT_VECTOR_LEN,
};
pub use color::{Color, Rgb};
pub use gamut::{ColorGamut, GamutPoint};
pub use interval::{overlap, slice_by_start, Interval, TimingCursor};
pub use light::{Axis, Light, LightBounds, LightId, LightRoster, Position3};
pub use palette::ColorPalette;
