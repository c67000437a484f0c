//! Instantaneous threshold checks.
//!
//! Stateless: every reading is judged on its own and each breach produces one
//! transient notification. Transient notifications are never cleared here;
//! they age out through the store's cap or are dismissed.

use crate::core::notification::{Notification, NotificationKind, StoreCommand};
use crate::source::types::SensorReading;
use serde::{Deserialize, Serialize};

/// A monitored sensor quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Heart,
    Motion,
    Sound,
}

impl Channel {
    /// Prefix used in transient notification ids.
    pub fn key(self) -> &'static str {
        match self {
            Channel::Heart => "heart",
            Channel::Motion => "motion",
            Channel::Sound => "sound",
        }
    }

    /// Sensor name shown on notifications.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Heart => "Heart Rate",
            Channel::Motion => "Motion Sensor",
            Channel::Sound => "Sound Level",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Heart => "BPM",
            Channel::Motion => "m/s²",
            Channel::Sound => "dB",
        }
    }
}

/// Coarse classification of a channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelStatus {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::Low => write!(f, "LOW"),
            ChannelStatus::Medium => write!(f, "MEDIUM"),
            ChannelStatus::High => write!(f, "HIGH"),
        }
    }
}

/// Fixed bounds for every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Heart rate below this is a warning (BPM)
    pub heart_low: f64,
    /// Heart rate above this is an alert (BPM)
    pub heart_high: f64,
    /// Lower bound used only for status classification (m/s²)
    pub motion_low: f64,
    /// Motion above this is an alert (m/s², gravity-compensated)
    pub motion_high: f64,
    /// Lower bound used only for status classification (dB)
    pub sound_low: f64,
    /// Sound above this is a warning (dB)
    pub sound_high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heart_low: 60.0,
            heart_high: 100.0,
            motion_low: 2.0,
            motion_high: 3.0,
            sound_low: 40.0,
            sound_high: 80.0,
        }
    }
}

impl Thresholds {
    /// `(low, high)` bounds of a channel.
    pub fn bounds(&self, channel: Channel) -> (f64, f64) {
        match channel {
            Channel::Heart => (self.heart_low, self.heart_high),
            Channel::Motion => (self.motion_low, self.motion_high),
            Channel::Sound => (self.sound_low, self.sound_high),
        }
    }

    /// Classify a value against the channel's bounds.
    pub fn status(&self, channel: Channel, value: f64) -> ChannelStatus {
        let (low, high) = self.bounds(channel);
        if value < low {
            ChannelStatus::Low
        } else if value > high {
            ChannelStatus::High
        } else {
            ChannelStatus::Medium
        }
    }
}

/// Per-reading min/max checks.
#[derive(Debug, Clone, Default)]
pub struct ThresholdEvaluator {
    thresholds: Thresholds,
}

impl ThresholdEvaluator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Check one reading.
    ///
    /// The high-sound check is skipped while the persistent loud-noise alert
    /// is active, so the same condition is not reported twice.
    pub fn evaluate(&self, reading: &SensorReading, loud_noise_active: bool) -> Vec<StoreCommand> {
        let t = &self.thresholds;
        let at = reading.observed_at;
        let mut raised = Vec::new();

        if reading.heartbeat < t.heart_low {
            raised.push(Notification::transient(
                Channel::Heart.key(),
                "low",
                Channel::Heart.label(),
                format!("Low heart rate detected: {:.0} BPM", reading.heartbeat),
                NotificationKind::Warning,
                at,
            ));
        } else if reading.heartbeat > t.heart_high {
            raised.push(Notification::transient(
                Channel::Heart.key(),
                "high",
                Channel::Heart.label(),
                format!("High heart rate detected: {:.0} BPM", reading.heartbeat),
                NotificationKind::Alert,
                at,
            ));
        }

        if reading.motion > t.motion_high {
            raised.push(Notification::transient(
                Channel::Motion.key(),
                "high",
                Channel::Motion.label(),
                format!("High motion detected: {:.1} m/s²", reading.motion),
                NotificationKind::Alert,
                at,
            ));
        }

        if reading.sound > t.sound_high && !loud_noise_active {
            raised.push(Notification::transient(
                Channel::Sound.key(),
                "high",
                Channel::Sound.label(),
                format!("High noise level: {:.0} dB", reading.sound),
                NotificationKind::Warning,
                at,
            ));
        }

        raised.into_iter().map(StoreCommand::Insert).collect()
    }
}
