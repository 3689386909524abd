//! Spike event extraction from raw signal.

mod detection;

pub use detection::ThresholdCutoff;
