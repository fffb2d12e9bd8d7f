//! Line-level analysis of build driver output.

mod classifier;
mod location;
mod phase;
mod progress;

pub use classifier::{LineKind, classify};
pub use location::{Extracted, Location, SOURCE_SUFFIXES, extract_location};
pub use phase::detect_phase;
pub use progress::Progress;
