//! Motion intensity detection.
//!
//! Counts step changes larger than [`CHANGE_THRESHOLD`]. Small changes decay
//! the counter by one instead of resetting it, so a single calm reading does
//! not discard an ongoing burst.

use crate::core::notification::{Notification, StoreCommand, INTENSE_MOTION_ID};
use crate::core::threshold::Channel;
use crate::core::window::{Sample, SampleWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Step change that counts as rapid (m/s²).
pub const CHANGE_THRESHOLD: f64 = 1.0;
/// Rapid changes needed before a candidate is opened.
pub const CHANGES_FOR_PATTERN: u32 = 4;
/// How long a candidate must last before notifying.
pub const PERSISTENCE_MS: i64 = 30_000;
/// Consecutive calm readings needed to clear the notification.
pub const STABLE_READINGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionPhase {
    Idle,
    /// Between one and three rapid changes counted
    RapidChanges,
    IntenseCandidate,
    NotifiedIntense,
}

/// Motion pattern state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionAnalyzer {
    window: SampleWindow,
    rapid_changes: u32,
    pattern_active: bool,
    pattern_started_at: Option<DateTime<Utc>>,
    notified: bool,
}

impl Default for MotionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionAnalyzer {
    pub fn new() -> Self {
        Self {
            window: SampleWindow::default(),
            rapid_changes: 0,
            pattern_active: false,
            pattern_started_at: None,
            notified: false,
        }
    }

    /// Advance the state machine by one reading.
    pub fn step(mut self, sample: Sample) -> (Self, Vec<StoreCommand>) {
        let prev = self.window.latest().map(|s| s.value);
        self.window.push(sample);

        let (cur, t) = (sample.value, sample.timestamp);
        let mut commands = Vec::new();

        if let Some(prev) = prev {
            if (cur - prev).abs() > CHANGE_THRESHOLD {
                self.rapid_changes += 1;
                if self.rapid_changes >= CHANGES_FOR_PATTERN && !self.pattern_active {
                    info!(changes = self.rapid_changes, "rapid motion, tracking candidate");
                    self.pattern_active = true;
                    self.pattern_started_at = Some(t);
                }
            } else {
                self.rapid_changes = self.rapid_changes.saturating_sub(1);
                if self.rapid_changes == 0 && self.pattern_active && !self.notified {
                    debug!("motion calmed before confirmation");
                    self.pattern_active = false;
                    self.pattern_started_at = None;
                }
            }
        }

        if self.pattern_active && !self.notified {
            let elapsed = self
                .pattern_started_at
                .map_or(0, |start| (t - start).num_milliseconds());
            if elapsed >= PERSISTENCE_MS {
                self.notified = true;
                info!(motion = cur, "intense motion confirmed");
                commands.push(StoreCommand::Insert(Notification::persistent(
                    INTENSE_MOTION_ID,
                    Channel::Motion.label(),
                    format!(
                        "Intense motion: rapid movement changes for over 30 seconds, now {cur:.2} m/s²"
                    ),
                    t,
                )));
            }
        } else if self.notified
            && self.rapid_changes == 0
            && self.window.is_settled(STABLE_READINGS, CHANGE_THRESHOLD)
        {
            info!(motion = cur, "motion settled");
            self.reset(sample);
            commands.push(StoreCommand::Remove(INTENSE_MOTION_ID));
        }

        (self, commands)
    }

    /// Return to idle. The window restarts from the current reading.
    fn reset(&mut self, current: Sample) {
        *self = Self::new();
        self.window.push(current);
    }

    pub fn phase(&self) -> MotionPhase {
        if self.notified {
            MotionPhase::NotifiedIntense
        } else if self.pattern_active {
            MotionPhase::IntenseCandidate
        } else if self.rapid_changes > 0 {
            MotionPhase::RapidChanges
        } else {
            MotionPhase::Idle
        }
    }

    pub fn rapid_changes(&self) -> u32 {
        self.rapid_changes
    }

    pub fn is_notified(&self) -> bool {
        self.notified
    }

    pub fn pattern_started_at(&self) -> Option<DateTime<Utc>> {
        self.pattern_started_at
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }
}
