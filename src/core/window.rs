//! Bounded sample windows used by the pattern analyzers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of samples retained by the heart and motion analyzers.
pub const DEFAULT_WINDOW_CAPACITY: usize = 10;

/// A single value observed on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

/// The most recent samples of a channel, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleWindow {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl SampleWindow {
    /// Create an empty window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// The newest sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Whether each of the newest `count` samples differs from its
    /// predecessor by at most `tolerance`.
    ///
    /// Needs `count + 1` samples; returns false until the window holds them.
    pub fn is_settled(&self, count: usize, tolerance: f64) -> bool {
        if self.samples.len() <= count {
            return false;
        }

        let start = self.samples.len() - count - 1;
        self.samples
            .range(start..)
            .zip(self.samples.range(start + 1..))
            .all(|(prev, cur)| (cur.value - prev.value).abs() <= tolerance)
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
