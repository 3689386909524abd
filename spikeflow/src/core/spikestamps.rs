//! Per-channel spike timestamps.

use serde::{Deserialize, Serialize};

/// Spike times grouped by channel, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spikestamps {
    trains: Vec<Vec<f64>>,
}

impl Spikestamps {
    /// Creates spikestamps from per-channel spike trains.
    #[must_use]
    pub fn new(trains: Vec<Vec<f64>>) -> Self {
        Self { trains }
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.trains.len()
    }

    /// Returns one channel's spike train, if the channel exists.
    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.trains.get(index).map(Vec::as_slice)
    }

    /// Returns the total number of spikes across all channels.
    #[must_use]
    pub fn total_spikes(&self) -> usize {
        self.trains.iter().map(Vec::len).sum()
    }

    /// Appends another chunk's spikes channel-wise.
    ///
    /// Channels present only in `other` are grown on demand; chunk order is
    /// preserved within each train.
    pub fn merge(&mut self, other: Self) {
        if self.trains.len() < other.trains.len() {
            self.trains.resize_with(other.trains.len(), Vec::new);
        }
        for (train, incoming) in self.trains.iter_mut().zip(other.trains) {
            train.extend(incoming);
        }
    }
}

impl From<Vec<Vec<f64>>> for Spikestamps {
    fn from(trains: Vec<Vec<f64>>) -> Self {
        Self::new(trains)
    }
}
