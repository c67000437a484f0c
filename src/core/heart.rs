//! Heart-rate trend detection.
//!
//! Three consecutive rises of more than [`INCREASE_THRESHOLD_BPM`] mark an
//! abnormal candidate. A candidate that survives [`PERSISTENCE_MS`] raises the
//! persistent `abnormal-heart-rate` notification, which clears only once the
//! rate has been steady for [`STABLE_READINGS`] readings.
//!
//! A drop while in the candidate phase opens a grace period instead of
//! discarding the evidence; a rise inside the grace period resumes counting,
//! and a drop after [`GRACE_PERIOD_MS`] gives up and returns to idle.

use crate::core::notification::{Notification, StoreCommand, ABNORMAL_HEART_RATE_ID};
use crate::core::threshold::Channel;
use crate::core::window::{Sample, SampleWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A rise must exceed this to count (BPM).
pub const INCREASE_THRESHOLD_BPM: f64 = 2.0;
/// Rises needed before a candidate is opened.
pub const INCREASES_FOR_PATTERN: u32 = 3;
/// How long a candidate must last before notifying.
pub const PERSISTENCE_MS: i64 = 30_000;
/// Tolerance window after a drop during a candidate.
pub const GRACE_PERIOD_MS: i64 = 5_000;
/// Consecutive steady readings needed to clear the notification.
pub const STABLE_READINGS: usize = 5;
/// Maximum step between steady readings (BPM).
pub const STABLE_TOLERANCE_BPM: f64 = 2.0;

/// Where the analyzer currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartPhase {
    Idle,
    /// One or two qualifying rises seen
    Tracking,
    AbnormalCandidate,
    NotifiedAbnormal,
}

/// State from other channels the heart analyzer reports alongside its alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartContext {
    pub loud_noise_active: bool,
}

/// Heart-rate pattern state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateAnalyzer {
    window: SampleWindow,
    increases: u32,
    pattern_active: bool,
    pattern_started_at: Option<DateTime<Utc>>,
    notified: bool,
    grace_active: bool,
    grace_started_at: Option<DateTime<Utc>>,
}

impl Default for HeartRateAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartRateAnalyzer {
    pub fn new() -> Self {
        Self {
            window: SampleWindow::default(),
            increases: 0,
            pattern_active: false,
            pattern_started_at: None,
            notified: false,
            grace_active: false,
            grace_started_at: None,
        }
    }

    /// Advance the state machine by one reading.
    pub fn step(mut self, sample: Sample, ctx: HeartContext) -> (Self, Vec<StoreCommand>) {
        let prev = self.window.latest().map(|s| s.value);
        self.window.push(sample);

        let (cur, t) = (sample.value, sample.timestamp);
        let mut commands = Vec::new();

        if let Some(prev) = prev {
            if cur > prev + INCREASE_THRESHOLD_BPM {
                self.on_rise(t);
            } else if cur <= prev {
                self.on_drop(sample);
            }
        }

        if self.pattern_active && !self.notified {
            if elapsed_ms(self.pattern_started_at, t) >= PERSISTENCE_MS {
                self.notified = true;
                self.grace_active = false;
                self.grace_started_at = None;
                info!(
                    bpm = cur,
                    loud_noise = ctx.loud_noise_active,
                    "abnormal heart rate confirmed"
                );
                commands.push(StoreCommand::Insert(Notification::persistent(
                    ABNORMAL_HEART_RATE_ID,
                    Channel::Heart.label(),
                    abnormal_message(cur, ctx),
                    t,
                )));
            }
        } else if self.notified
            && self.increases == 0
            && self.window.is_settled(STABLE_READINGS, STABLE_TOLERANCE_BPM)
        {
            info!(bpm = cur, "heart rate stabilized");
            self.reset(sample);
            commands.push(StoreCommand::Remove(ABNORMAL_HEART_RATE_ID));
        }

        (self, commands)
    }

    fn on_rise(&mut self, t: DateTime<Utc>) {
        self.increases += 1;

        if self.grace_active {
            debug!("rise during grace period, resuming");
            self.grace_active = false;
            self.grace_started_at = None;
        }

        if self.increases >= INCREASES_FOR_PATTERN && !self.pattern_active {
            info!(increases = self.increases, "heart rate rising, tracking candidate");
            self.pattern_active = true;
            self.pattern_started_at = Some(t);
        }
    }

    fn on_drop(&mut self, sample: Sample) {
        let t = sample.timestamp;

        if self.pattern_active && !self.notified && !self.grace_active {
            debug!("drop during candidate, grace period started");
            self.grace_active = true;
            self.grace_started_at = Some(t);
            self.increases = 0;
        } else if self.grace_active && elapsed_ms(self.grace_started_at, t) >= GRACE_PERIOD_MS {
            debug!("grace period expired");
            self.reset(sample);
        } else if self.notified {
            self.increases = 0;
        }
    }

    /// Return to idle. The window restarts from the current reading.
    fn reset(&mut self, current: Sample) {
        *self = Self::new();
        self.window.push(current);
    }

    pub fn phase(&self) -> HeartPhase {
        if self.notified {
            HeartPhase::NotifiedAbnormal
        } else if self.pattern_active {
            HeartPhase::AbnormalCandidate
        } else if self.increases > 0 {
            HeartPhase::Tracking
        } else {
            HeartPhase::Idle
        }
    }

    pub fn increases(&self) -> u32 {
        self.increases
    }

    pub fn in_grace(&self) -> bool {
        self.grace_active
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

fn abnormal_message(bpm: f64, ctx: HeartContext) -> String {
    let context = if ctx.loud_noise_active {
        "loud noise detected nearby"
    } else {
        "no loud noise detected"
    };
    format!("Abnormal heart rate pattern: rising for over 30 seconds, now {bpm:.0} BPM ({context})")
}

/// Milliseconds from `since` to `now`; zero when there is no start time.
fn elapsed_ms(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    since.map_or(0, |start| (now - start).num_milliseconds())
}
