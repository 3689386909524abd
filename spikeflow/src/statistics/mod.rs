//! Statistics over detected spike trains.

mod burst;

pub use burst::{burst, BurstAnalysis, BurstSummary};
