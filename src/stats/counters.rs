//! Session counters for the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Running counters for one engine session.
#[derive(Debug)]
pub struct EngineStats {
    /// Unique id of this engine instance
    instance_id: Uuid,
    /// Readings that ran through the analyzers
    readings_processed: AtomicU64,
    /// Payloads with no recognizable sensor field
    payloads_unrecognized: AtomicU64,
    /// Payloads offered after shutdown
    readings_rejected: AtomicU64,
    /// Notifications inserted into the store
    notifications_raised: AtomicU64,
    /// Persistent notifications cleared by their analyzer
    notifications_cleared: AtomicU64,
    /// Dismiss requests refused for persistent notifications
    dismissals_refused: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            readings_processed: AtomicU64::new(0),
            payloads_unrecognized: AtomicU64::new(0),
            readings_rejected: AtomicU64::new(0),
            notifications_raised: AtomicU64::new(0),
            notifications_cleared: AtomicU64::new(0),
            dismissals_refused: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn record_reading_processed(&self) {
        self.readings_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_payload_unrecognized(&self) {
        self.payloads_unrecognized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reading_rejected(&self) {
        self.readings_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_raised(&self) {
        self.notifications_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_cleared(&self) {
        self.notifications_cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dismissal_refused(&self) {
        self.dismissals_refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            instance_id: self.instance_id,
            readings_processed: self.readings_processed.load(Ordering::Relaxed),
            payloads_unrecognized: self.payloads_unrecognized.load(Ordering::Relaxed),
            readings_rejected: self.readings_rejected.load(Ordering::Relaxed),
            notifications_raised: self.notifications_raised.load(Ordering::Relaxed),
            notifications_cleared: self.notifications_cleared.load(Ordering::Relaxed),
            dismissals_refused: self.dismissals_refused.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Readings processed: {}\n\
             - Unrecognized payloads: {}\n\
             - Readings rejected after shutdown: {}\n\
             - Notifications raised: {}\n\
             - Persistent alerts cleared: {}\n\
             - Dismissals refused: {}\n\
             - Session duration: {} seconds",
            stats.readings_processed,
            stats.payloads_unrecognized,
            stats.readings_rejected,
            stats.notifications_raised,
            stats.notifications_cleared,
            stats.dismissals_refused,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.readings_processed.store(0, Ordering::Relaxed);
        self.payloads_unrecognized.store(0, Ordering::Relaxed);
        self.readings_rejected.store(0, Ordering::Relaxed);
        self.notifications_raised.store(0, Ordering::Relaxed);
        self.notifications_cleared.store(0, Ordering::Relaxed);
        self.dismissals_refused.store(0, Ordering::Relaxed);
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub instance_id: Uuid,
    pub readings_processed: u64,
    pub payloads_unrecognized: u64,
    pub readings_rejected: u64,
    pub notifications_raised: u64,
    pub notifications_cleared: u64,
    pub dismissals_refused: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedEngineStats = Arc<EngineStats>;

/// Create a new shared statistics handle.
pub fn create_shared_stats() -> SharedEngineStats {
    Arc::new(EngineStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = EngineStats::new();

        stats.record_reading_processed();
        stats.record_reading_processed();
        stats.record_notification_raised();
        stats.record_dismissal_refused();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.readings_processed, 2);
        assert_eq!(snapshot.notifications_raised, 1);
        assert_eq!(snapshot.dismissals_refused, 1);
        assert_eq!(snapshot.notifications_cleared, 0);
    }

    #[test]
    fn test_reset() {
        let stats = EngineStats::new();
        stats.record_payload_unrecognized();
        stats.record_reading_rejected();
        stats.reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.payloads_unrecognized, 0);
        assert_eq!(snapshot.readings_rejected, 0);
    }

    #[test]
    fn test_summary_format() {
        let summary = EngineStats::new().summary();
        assert!(summary.contains("Readings processed: 0"));
        assert!(summary.contains("Dismissals refused"));
    }
}
