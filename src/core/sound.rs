//! Sustained loud-noise detection over a trailing 60-second average.

use crate::core::notification::{Notification, StoreCommand, LOUD_NOISE_ID};
use crate::core::threshold::Channel;
use crate::core::window::Sample;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Width of the rolling window.
pub const WINDOW_MS: i64 = 60_000;
/// Average at or above which the noise is considered sustained (dB).
pub const LOUD_AVERAGE_DB: f64 = 80.0;
/// Samples required before the average is trusted in either direction.
pub const MIN_SAMPLES: usize = 10;

/// Rolling-average state for the sound channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundAnalyzer {
    samples: VecDeque<Sample>,
    active: bool,
}

impl SoundAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading, prune the window, and re-judge the average.
    pub fn step(mut self, sample: Sample) -> (Self, Vec<StoreCommand>) {
        let cutoff = sample.timestamp - Duration::milliseconds(WINDOW_MS);
        self.samples.push_back(sample);
        self.samples.retain(|s| s.timestamp >= cutoff);

        let mut commands = Vec::new();
        let count = self.samples.len();
        if count < MIN_SAMPLES {
            debug!(count, "not enough sound samples to judge");
            return (self, commands);
        }

        let average = self.average().unwrap_or(0.0);
        if average >= LOUD_AVERAGE_DB && !self.active {
            info!(average, count, "sustained loud noise");
            self.active = true;
            commands.push(StoreCommand::Insert(Notification::persistent(
                LOUD_NOISE_ID,
                Channel::Sound.label(),
                format!("Persistent loud noise: 60-second average {average:.1} dB"),
                sample.timestamp,
            )));
        } else if average < LOUD_AVERAGE_DB && self.active {
            info!(average, count, "loud noise subsided");
            self.active = false;
            commands.push(StoreCommand::Remove(LOUD_NOISE_ID));
        }

        (self, commands)
    }

    /// Mean of the retained samples.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(|s| s.value).mean())
    }

    /// Whether the persistent loud-noise alert is raised.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}
