//! Sense Guardian - anomaly detection and alert lifecycle for wearable safety sensors.
//!
//! This library turns raw sensor payloads (heart rate, acceleration, sound
//! level and GPS) into a deduplicated, bounded list of user-facing
//! notifications.
//!
//! # Notification lifecycle
//!
//! - **Transient**: one per threshold breach, dismissable, at most 10 kept
//! - **Persistent**: one per sustained pattern, cleared only by the analyzer
//!   that raised it once its channel returns to normal
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Sense Guardian                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────────┐    │
//! │  │   Source    │──▶│ Normalizer  │──▶│        Engine        │    │
//! │  │ (sim/replay)│   │  (shapes)   │   │ sound ▶ heart ▶      │    │
//! │  └─────────────┘   └─────────────┘   │ motion ▶ thresholds  │    │
//! │                                      └──────────────────────┘    │
//! │                                                 │                │
//! │                    ┌─────────────┐              ▼                │
//! │                    │    Stats    │◀──── ┌─────────────┐          │
//! │                    │ (counters)  │      │Notification │          │
//! │                    └─────────────┘      │    Store    │          │
//! │                                         └─────────────┘          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use sense_guardian::{Engine, Thresholds};
//! use serde_json::json;
//!
//! let mut engine = Engine::new(Thresholds::default());
//! engine.process_reading(&json!({ "heartbeat": 110, "motion": 0.4, "sound": 50 }), Utc::now());
//!
//! let alerts = engine.current_notifications();
//! assert_eq!(alerts.len(), 1);
//! assert_eq!(alerts[0].message, "High heart rate detected: 110 BPM");
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    Channel, ChannelStatus, Notification, NotificationKind, NotificationStore, StoreCommand,
    Thresholds,
};
pub use engine::{Engine, IngestOutcome, SystemStatus};
pub use source::{normalize, GpsFix, RawEvent, SensorReading, SourceError};
pub use stats::{create_shared_stats, EngineStats, SharedEngineStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
