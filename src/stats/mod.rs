//! Engine statistics.
//!
//! Counters describing what the engine has seen this session. Nothing here is
//! persisted; a restart starts from zero.

pub mod counters;

// Re-export commonly used types
pub use counters::{create_shared_stats, EngineStats, SharedEngineStats, StatsSnapshot};
