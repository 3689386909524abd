//! Multi-channel signal datatype.

use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// A chunk of multi-electrode recording.
///
/// Data is sample-major: row `i` holds the value of every channel at
/// `timestamps[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Sample values, shape `(num_samples, num_channels)`.
    pub data: Array2<f64>,
    /// Per-sample timestamps in seconds, length `num_samples`.
    pub timestamps: Array1<f64>,
    /// Sampling rate in Hz.
    pub rate: f64,
}

impl Signal {
    /// Creates a signal chunk from raw samples.
    #[must_use]
    pub fn new(data: Array2<f64>, timestamps: Array1<f64>, rate: f64) -> Self {
        Self {
            data,
            timestamps,
            rate,
        }
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.data.ncols()
    }

    /// Returns the number of samples per channel.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Returns one channel as a view over its samples.
    #[must_use]
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.column(index)
    }

    /// Returns the earliest timestamp in the chunk.
    #[must_use]
    pub fn start_time(&self) -> f64 {
        self.timestamps.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Concatenates chunks along the time axis.
    ///
    /// Returns `None` when the list is empty or the chunks disagree on
    /// channel count or sampling rate.
    #[must_use]
    pub fn concat(chunks: Vec<Self>) -> Option<Self> {
        let first = chunks.first()?;
        let channels = first.num_channels();
        let rate = first.rate;
        if chunks
            .iter()
            .any(|c| c.num_channels() != channels || (c.rate - rate).abs() > f64::EPSILON)
        {
            return None;
        }

        let data_views: Vec<_> = chunks.iter().map(|c| c.data.view()).collect();
        let data = concatenate(Axis(0), &data_views).ok()?;
        let time_views: Vec<_> = chunks.iter().map(|c| c.timestamps.view()).collect();
        let timestamps = concatenate(Axis(0), &time_views).ok()?;

        Some(Self {
            data,
            timestamps,
            rate,
        })
    }
}
