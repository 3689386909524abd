//! Spike detection by threshold crossing.

use crate::core::{Payload, Signal, Spikestamps};
use crate::errors::NodeExecutionError;
use crate::operator::Operator;
use ndarray::ArrayView1;

/// Threshold-cutoff spike detection.
///
/// For each channel: estimate the noise floor, find falling-edge threshold
/// crossings separated by at least the dead time, and align each crossing to
/// the following signal minimum within the search range. Spike stamps are in
/// seconds, offset by the chunk's earliest timestamp.
///
/// Chunked input is processed chunk by chunk; per-chunk spike trains merge
/// channel-wise into one [`Spikestamps`].
#[derive(Debug, Clone)]
pub struct ThresholdCutoff {
    dead_time: f64,
    search_range: f64,
    cutoff: f64,
    use_mad: bool,
    tag: String,
}

impl Default for ThresholdCutoff {
    fn default() -> Self {
        Self {
            dead_time: 0.003,
            search_range: 0.002,
            cutoff: 5.0,
            use_mad: true,
            tag: "spike detection".to_string(),
        }
    }
}

impl ThresholdCutoff {
    /// Creates a detector with the standard parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the threshold multiplier over the noise estimate.
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Sets the minimum separation between detections, in seconds.
    #[must_use]
    pub fn with_dead_time(mut self, dead_time: f64) -> Self {
        self.dead_time = dead_time;
        self
    }

    /// Sets how far past a crossing to search for the spike minimum, in
    /// seconds.
    #[must_use]
    pub fn with_search_range(mut self, search_range: f64) -> Self {
        self.search_range = search_range;
        self
    }

    /// Chooses the noise estimator: median absolute deviation when `true`,
    /// standard deviation otherwise.
    #[must_use]
    pub fn with_use_mad(mut self, use_mad: bool) -> Self {
        self.use_mad = use_mad;
        self
    }

    /// Overrides the node tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Noise-scaled detection threshold for one channel.
    #[must_use]
    pub fn spike_threshold(&self, channel: ArrayView1<'_, f64>) -> f64 {
        let noise = if self.use_mad {
            let mut magnitudes: Vec<f64> = channel.iter().map(|v| v.abs()).collect();
            median(&mut magnitudes) / 0.6745
        } else {
            channel.std(0.0)
        };
        -self.cutoff * noise
    }

    /// Falling-edge crossings of `threshold`, pruned so that consecutive
    /// detections are at least the dead time apart.
    ///
    /// Pruning is iterative: each pass drops every crossing closer than the
    /// dead time to its current predecessor, until the list is stable.
    #[must_use]
    pub fn threshold_crossings(
        &self,
        channel: ArrayView1<'_, f64>,
        rate: f64,
        threshold: f64,
    ) -> Vec<usize> {
        let dead = self.dead_time * rate;
        let mut crossings: Vec<usize> = Vec::new();
        for i in 0..channel.len().saturating_sub(1) {
            if channel[i] > threshold && channel[i + 1] <= threshold {
                crossings.push(i);
            }
        }

        loop {
            let mut keep = vec![true; crossings.len()];
            let mut violated = false;
            for i in 1..crossings.len() {
                if ((crossings[i] - crossings[i - 1]) as f64) < dead {
                    keep[i] = false;
                    violated = true;
                }
            }
            if !violated {
                break;
            }
            crossings = crossings
                .into_iter()
                .zip(keep)
                .filter_map(|(c, k)| k.then_some(c))
                .collect();
        }
        crossings
    }

    /// Index of the signal minimum within the search range after each
    /// crossing.
    #[must_use]
    pub fn align_to_minimum(
        &self,
        channel: ArrayView1<'_, f64>,
        rate: f64,
        crossings: &[usize],
    ) -> Vec<usize> {
        let search_end = (self.search_range * rate) as usize;
        crossings
            .iter()
            .map(|&index| {
                let end = (index + search_end).min(channel.len());
                let mut min_index = index;
                let mut min_value = f64::INFINITY;
                for i in index..end {
                    if channel[i] < min_value {
                        min_value = channel[i];
                        min_index = i;
                    }
                }
                min_index
            })
            .collect()
    }

    /// Detects spikes in one signal chunk, channel by channel.
    #[must_use]
    pub fn detect(&self, signal: &Signal) -> Spikestamps {
        let t0 = signal.start_time();
        let mut trains = Vec::with_capacity(signal.num_channels());
        for ch in 0..signal.num_channels() {
            let channel = signal.channel(ch);
            let threshold = self.spike_threshold(channel);
            let crossings = self.threshold_crossings(channel, signal.rate, threshold);
            let spikes = self.align_to_minimum(channel, signal.rate, &crossings);
            trains.push(
                spikes
                    .iter()
                    .map(|&index| index as f64 / signal.rate + t0)
                    .collect(),
            );
        }
        Spikestamps::new(trains)
    }
}

impl Operator for ThresholdCutoff {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "dead_time": self.dead_time,
            "search_range": self.search_range,
            "cutoff": self.cutoff,
            "use_mad": self.use_mad,
        })
    }

    fn process(&self, inputs: Vec<Payload>) -> Result<Payload, NodeExecutionError> {
        match inputs.as_slice() {
            [Payload::Signal(signal)] => Ok(Payload::Spikestamps(self.detect(signal))),
            _ => Err(NodeExecutionError::new(
                &self.tag,
                "expected a single signal input",
            )),
        }
    }
}

/// Median of the values; the mean of the two middle values for even counts.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
