//! The materialized value vocabulary passed between nodes.

use super::{Signal, Spikestamps};
use crate::statistics::BurstSummary;
use serde::{Deserialize, Serialize};

/// A materialized node output, persisted as-is by the cache layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// A multi-channel signal chunk.
    Signal(Signal),
    /// Per-channel spike timestamps.
    Spikestamps(Spikestamps),
    /// Burst statistics.
    Bursts(BurstSummary),
    /// No value.
    Empty,
}

impl Payload {
    /// Returns a short name for the payload kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Signal(_) => "signal",
            Self::Spikestamps(_) => "spikestamps",
            Self::Bursts(_) => "bursts",
            Self::Empty => "empty",
        }
    }

    /// Merges partial outputs produced from successive chunks into one value.
    ///
    /// Signals concatenate along the time axis, spikestamps and burst
    /// summaries merge channel- and entry-wise. Returns `None` when the list
    /// is empty or mixes payload kinds.
    #[must_use]
    pub fn collapse(parts: Vec<Self>) -> Option<Self> {
        let mut iter = parts.into_iter();
        match iter.next()? {
            Self::Signal(first) => {
                let mut chunks = vec![first];
                for part in iter {
                    let Self::Signal(chunk) = part else {
                        return None;
                    };
                    chunks.push(chunk);
                }
                Signal::concat(chunks).map(Self::Signal)
            }
            Self::Spikestamps(mut acc) => {
                for part in iter {
                    let Self::Spikestamps(stamps) = part else {
                        return None;
                    };
                    acc.merge(stamps);
                }
                Some(Self::Spikestamps(acc))
            }
            Self::Bursts(mut acc) => {
                for part in iter {
                    let Self::Bursts(bursts) = part else {
                        return None;
                    };
                    acc.merge(bursts);
                }
                Some(Self::Bursts(acc))
            }
            Self::Empty => iter
                .all(|part| matches!(part, Self::Empty))
                .then_some(Self::Empty),
        }
    }
}
