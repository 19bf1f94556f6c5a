//! Track-level analysis derived once per track: burst detection over the
//! segment list and the per-section intensity progression.

pub mod bursts;
pub mod intensity;

pub use bursts::{detect_bursts, Burst, Bursts};
pub use intensity::{compute_intensities, Intensity};
