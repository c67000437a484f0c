//! Notifications and the store every analyzer writes through.
//!
//! The store keeps alerts newest-first. Transient alerts are capped at
//! [`MAX_TRANSIENT`]; persistent alerts are keyed by a fixed id, never
//! duplicated, and can only be cleared by the analyzer that raised them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persistent id for a sustained heart-rate increase.
pub const ABNORMAL_HEART_RATE_ID: &str = "abnormal-heart-rate";
/// Persistent id for sustained rapid motion changes.
pub const INTENSE_MOTION_ID: &str = "intense-motion";
/// Persistent id for a loud 60-second sound average.
pub const LOUD_NOISE_ID: &str = "loud-noise-persistent";

/// The ids that can never be dismissed by the user.
pub const PERSISTENT_IDS: [&str; 3] = [ABNORMAL_HEART_RATE_ID, INTENSE_MOTION_ID, LOUD_NOISE_ID];

/// Maximum number of transient notifications retained.
pub const MAX_TRANSIENT: usize = 10;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Warning,
    Alert,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Warning => write!(f, "warning"),
            NotificationKind::Alert => write!(f, "alert"),
        }
    }
}

/// A human-readable alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Display name of the originating sensor
    pub sensor: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
    pub persistent: bool,
}

impl Notification {
    /// A dismissable notification with an id unique to its creation time.
    pub fn transient(
        channel: &str,
        level: &str,
        sensor: &str,
        message: String,
        kind: NotificationKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{channel}-{level}-{}", timestamp.timestamp_millis()),
            sensor: sensor.to_string(),
            message,
            kind,
            timestamp,
            persistent: false,
        }
    }

    /// A notification under one of the fixed persistent ids.
    pub fn persistent(
        id: &'static str,
        sensor: &str,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            sensor: sensor.to_string(),
            message,
            kind: NotificationKind::Alert,
            timestamp,
            persistent: true,
        }
    }

    /// What has to happen before a persistent notification goes away.
    pub fn hint(&self) -> Option<&'static str> {
        if !self.persistent {
            return None;
        }
        Some(match self.id.as_str() {
            LOUD_NOISE_ID => "This alert will remain until the 60-second sound average drops below 80 dB",
            ABNORMAL_HEART_RATE_ID => "This alert will remain until heart rate pattern stabilizes",
            INTENSE_MOTION_ID => "This alert will remain until movement settles",
            _ => "This is a persistent alert",
        })
    }
}

/// A write requested by an analyzer or the threshold evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    Insert(Notification),
    Remove(&'static str),
}

/// Result of a dismiss request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissOutcome {
    Removed,
    /// The notification is persistent and cannot be dismissed
    Refused,
    NotFound,
}

/// Ordered collection of active notifications, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationStore {
    entries: Vec<Notification>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a notification at the front.
    ///
    /// An entry with the same id is replaced rather than duplicated. Once the
    /// transient entries exceed [`MAX_TRANSIENT`] the oldest ones are evicted.
    pub fn insert(&mut self, notification: Notification) {
        self.entries.retain(|n| n.id != notification.id);
        let persistent = notification.persistent;
        self.entries.insert(0, notification);

        if !persistent {
            self.evict_transient();
        }
    }

    /// Dismiss a notification on behalf of the user.
    pub fn dismiss(&mut self, id: &str) -> DismissOutcome {
        if PERSISTENT_IDS.contains(&id) {
            debug!(id, "refusing to dismiss persistent notification");
            return DismissOutcome::Refused;
        }

        match self.entries.iter().position(|n| n.id == id) {
            Some(index) if self.entries[index].persistent => DismissOutcome::Refused,
            Some(index) => {
                self.entries.remove(index);
                DismissOutcome::Removed
            }
            None => DismissOutcome::NotFound,
        }
    }

    /// Remove an entry regardless of persistence. Returns whether one existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Apply an analyzer's write.
    pub fn apply(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::Insert(notification) => self.insert(notification),
            StoreCommand::Remove(id) => {
                self.remove(id);
            }
        }
    }

    /// All notifications, newest first.
    pub fn list(&self) -> &[Notification] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn transient_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.persistent).count()
    }

    fn evict_transient(&mut self) {
        let mut kept = 0;
        self.entries.retain(|n| {
            if n.persistent {
                return true;
            }
            kept += 1;
            kept <= MAX_TRANSIENT
        });
    }
}
