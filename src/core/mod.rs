//! Core anomaly detection for the Sense Guardian engine.
//!
//! This module contains:
//! - The notification store every evaluator writes through
//! - Instantaneous threshold checks
//! - Per-channel pattern analyzers for heart rate, motion and sound

pub mod heart;
pub mod motion;
pub mod notification;
pub mod sound;
pub mod threshold;
pub mod window;

// Re-export commonly used types
pub use heart::{HeartContext, HeartPhase, HeartRateAnalyzer};
pub use motion::{MotionAnalyzer, MotionPhase};
pub use notification::{
    DismissOutcome, Notification, NotificationKind, NotificationStore, StoreCommand,
    ABNORMAL_HEART_RATE_ID, INTENSE_MOTION_ID, LOUD_NOISE_ID, MAX_TRANSIENT, PERSISTENT_IDS,
};
pub use sound::SoundAnalyzer;
pub use threshold::{Channel, ChannelStatus, ThresholdEvaluator, Thresholds};
pub use window::{Sample, SampleWindow};
