//! Burst statistics over spike trains.
//!
//! Bursting is the occurrence of a cluster of spikes with small inter-spike
//! intervals, typically tens of spikes under 100 ms apart.

use crate::core::Payload;
use crate::errors::NodeExecutionError;
use crate::operator::Operator;
use serde::{Deserialize, Serialize};

/// Per-burst statistics for a single channel.
///
/// Entries align across the four vectors: burst `i` starts at
/// `start_time[i]`, spans `duration[i]` seconds, and contains `length[i]`
/// spikes firing at `rate[i]` spikes per second.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurstSummary {
    /// Burst onset times, in seconds.
    pub start_time: Vec<f64>,
    /// Burst durations, in seconds.
    pub duration: Vec<f64>,
    /// Spikes per burst.
    pub length: Vec<usize>,
    /// Firing rate within each burst, spikes per second.
    pub rate: Vec<f64>,
}

impl BurstSummary {
    /// Returns the number of bursts recorded.
    #[must_use]
    pub fn num_bursts(&self) -> usize {
        self.start_time.len()
    }

    /// Appends another summary's bursts.
    pub fn merge(&mut self, other: Self) {
        self.start_time.extend(other.start_time);
        self.duration.extend(other.duration);
        self.length.extend(other.length);
        self.rate.extend(other.rate);
    }
}

/// Computes burst statistics for one channel's spike train.
///
/// A burst is a maximal run of at least `min_len` consecutive inter-spike
/// intervals, each no longer than `min_isi` seconds; a run of `k` intervals
/// covers `k + 1` spikes. Returns an empty summary when no burst qualifies.
#[must_use]
pub fn burst(train: &[f64], min_isi: f64, min_len: usize) -> BurstSummary {
    let mut summary = BurstSummary::default();
    if train.len() < 2 {
        return summary;
    }

    let isi_ok: Vec<bool> = train.windows(2).map(|w| w[1] - w[0] <= min_isi).collect();
    let mut i = 0;
    while i < isi_ok.len() {
        if !isi_ok[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < isi_ok.len() && isi_ok[i] {
            i += 1;
        }
        let run = i - start;
        if run >= min_len {
            let start_time = train[start];
            let end_time = train[start + run];
            summary.start_time.push(start_time);
            summary.duration.push(end_time - start_time);
            summary.length.push(run + 1);
            summary.rate.push((run + 1) as f64 / (end_time - start_time));
        }
    }
    summary
}

/// Wraps [`burst`] as a pipeline operator over spike-detection output.
#[derive(Debug, Clone)]
pub struct BurstAnalysis {
    channel: usize,
    min_isi: f64,
    min_len: usize,
    tag: String,
}

impl BurstAnalysis {
    /// Creates a burst analysis for one channel with the standard
    /// parameters (100 ms ISI, 10-interval minimum).
    #[must_use]
    pub fn new(channel: usize) -> Self {
        Self {
            channel,
            min_isi: 0.1,
            min_len: 10,
            tag: "burst analysis".to_string(),
        }
    }

    /// Sets the maximum inter-spike interval inside a burst, in seconds.
    #[must_use]
    pub fn with_min_isi(mut self, min_isi: f64) -> Self {
        self.min_isi = min_isi;
        self
    }

    /// Sets the minimum number of consecutive qualifying intervals.
    #[must_use]
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Overrides the node tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

impl Operator for BurstAnalysis {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "channel": self.channel,
            "min_isi": self.min_isi,
            "min_len": self.min_len,
        })
    }

    fn process(&self, inputs: Vec<Payload>) -> Result<Payload, NodeExecutionError> {
        match inputs.as_slice() {
            [Payload::Spikestamps(stamps)] => {
                let train = stamps.channel(self.channel).ok_or_else(|| {
                    NodeExecutionError::new(
                        &self.tag,
                        format!(
                            "channel {} out of range ({} channels)",
                            self.channel,
                            stamps.num_channels()
                        ),
                    )
                })?;
                Ok(Payload::Bursts(burst(train, self.min_isi, self.min_len)))
            }
            _ => Err(NodeExecutionError::new(
                &self.tag,
                "expected a single spikestamps input",
            )),
        }
    }
}
