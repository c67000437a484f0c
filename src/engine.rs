//! The alert engine.
//!
//! Owns the three pattern analyzers, the threshold evaluator and the
//! notification store. Each reading is handled as one unit: every analyzer
//! steps on a copy of its state, and only once all of them have run are the
//! new states committed and their writes applied to the store.
//!
//! There is no background clock. Grace periods, persistence thresholds and
//! the sound window are measured against reading timestamps, so a feed that
//! goes quiet also freezes its timers.

use crate::core::{
    Channel, ChannelStatus, DismissOutcome, HeartContext, HeartRateAnalyzer, MotionAnalyzer,
    Notification, NotificationStore, Sample, SoundAnalyzer, StoreCommand, ThresholdEvaluator,
    Thresholds,
};
use crate::source::{normalize, RawEvent, SensorReading};
use crate::stats::{create_shared_stats, SharedEngineStats};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

/// What happened to an offered payload.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Normalized and analyzed
    Processed(SensorReading),
    /// No recognizable sensor field; state untouched
    Unrecognized,
    /// The engine has been shut down
    Stopped,
}

/// Overall system state shown next to the alert list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Normal,
    Monitoring,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemStatus::Normal => write!(f, "NORMAL"),
            SystemStatus::Monitoring => write!(f, "MONITORING"),
        }
    }
}

/// Headless anomaly-detection and alert-lifecycle engine.
pub struct Engine {
    evaluator: ThresholdEvaluator,
    heart: HeartRateAnalyzer,
    motion: MotionAnalyzer,
    sound: SoundAnalyzer,
    store: NotificationStore,
    stats: SharedEngineStats,
    latest: Option<SensorReading>,
    accepting: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl Engine {
    /// Create an engine with fresh analyzers and an empty store.
    pub fn new(thresholds: Thresholds) -> Self {
        Self::from_parts(
            ThresholdEvaluator::new(thresholds),
            HeartRateAnalyzer::new(),
            MotionAnalyzer::new(),
            SoundAnalyzer::new(),
            NotificationStore::new(),
        )
    }

    /// Assemble an engine from independently built components.
    pub fn from_parts(
        evaluator: ThresholdEvaluator,
        heart: HeartRateAnalyzer,
        motion: MotionAnalyzer,
        sound: SoundAnalyzer,
        store: NotificationStore,
    ) -> Self {
        Self {
            evaluator,
            heart,
            motion,
            sound,
            store,
            stats: create_shared_stats(),
            latest: None,
            accepting: true,
        }
    }

    /// Report into an existing statistics handle.
    pub fn with_stats(mut self, stats: SharedEngineStats) -> Self {
        self.stats = stats;
        self
    }

    /// Normalize a raw payload and run it through the analyzers.
    pub fn process_reading(&mut self, raw: &Value, observed_at: DateTime<Utc>) -> IngestOutcome {
        if !self.accepting {
            self.stats.record_reading_rejected();
            return IngestOutcome::Stopped;
        }

        match normalize(raw, observed_at) {
            Some(reading) => {
                self.process(&reading);
                IngestOutcome::Processed(reading)
            }
            None => {
                warn!("ignoring payload without sensor fields");
                self.stats.record_payload_unrecognized();
                IngestOutcome::Unrecognized
            }
        }
    }

    /// Process a raw event using its own timestamp.
    pub fn process_event(&mut self, event: &RawEvent) -> IngestOutcome {
        self.process_reading(&event.payload, event.observed_at)
    }

    /// Run an already normalized reading through every evaluator.
    ///
    /// Returns the store writes that resulted, in the order they were applied.
    pub fn process(&mut self, reading: &SensorReading) -> Vec<StoreCommand> {
        if !self.accepting {
            self.stats.record_reading_rejected();
            return Vec::new();
        }

        let t = reading.observed_at;

        let (sound, mut commands) = self.sound.clone().step(Sample::new(reading.sound, t));
        let loud_noise_active = sound.is_active();

        let (heart, heart_commands) = self
            .heart
            .clone()
            .step(Sample::new(reading.heartbeat, t), HeartContext { loud_noise_active });
        let (motion, motion_commands) = self.motion.clone().step(Sample::new(reading.motion, t));

        commands.extend(heart_commands);
        commands.extend(motion_commands);
        commands.extend(self.evaluator.evaluate(reading, loud_noise_active));

        self.sound = sound;
        self.heart = heart;
        self.motion = motion;
        for command in &commands {
            self.apply(command.clone());
        }
        self.latest = Some(reading.clone());
        self.stats.record_reading_processed();

        debug!(
            heartbeat = reading.heartbeat,
            motion = reading.motion,
            sound = reading.sound,
            writes = commands.len(),
            "reading processed"
        );
        commands
    }

    fn apply(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::Insert(notification) => {
                self.stats.record_notification_raised();
                self.store.insert(notification);
            }
            StoreCommand::Remove(id) => {
                if self.store.remove(id) {
                    self.stats.record_notification_cleared();
                }
            }
        }
    }

    /// Active notifications, newest first.
    pub fn current_notifications(&self) -> &[Notification] {
        self.store.list()
    }

    /// Dismiss a notification. Returns false when it is persistent or unknown.
    pub fn dismiss(&mut self, id: &str) -> bool {
        match self.store.dismiss(id) {
            DismissOutcome::Removed => true,
            DismissOutcome::Refused => {
                info!(id, "persistent notification cannot be dismissed");
                self.stats.record_dismissal_refused();
                false
            }
            DismissOutcome::NotFound => false,
        }
    }

    /// Stop accepting readings. Committed state is left as it is.
    pub fn shutdown(&mut self) {
        if self.accepting {
            info!("engine shut down");
        }
        self.accepting = false;
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// `Normal` when there is nothing to report.
    pub fn system_status(&self) -> SystemStatus {
        if self.store.is_empty() {
            SystemStatus::Normal
        } else {
            SystemStatus::Monitoring
        }
    }

    /// Classification of the latest value on a channel.
    pub fn channel_status(&self, channel: Channel) -> Option<ChannelStatus> {
        let reading = self.latest.as_ref()?;
        let value = match channel {
            Channel::Heart => reading.heartbeat,
            Channel::Motion => reading.motion,
            Channel::Sound => reading.sound,
        };
        Some(self.evaluator.thresholds().status(channel, value))
    }

    pub fn latest_reading(&self) -> Option<&SensorReading> {
        self.latest.as_ref()
    }

    pub fn heart(&self) -> &HeartRateAnalyzer {
        &self.heart
    }

    pub fn motion(&self) -> &MotionAnalyzer {
        &self.motion
    }

    pub fn sound(&self) -> &SoundAnalyzer {
        &self.sound
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn stats(&self) -> &SharedEngineStats {
        &self.stats
    }
}
