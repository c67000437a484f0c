//! Reading sources for the Sense Guardian engine.
//!
//! Raw payloads arrive from the device feed, a replay file, or the built-in
//! simulator, and are normalized into [`SensorReading`]s before analysis.

pub mod normalize;
pub mod replay;
pub mod types;

#[cfg(feature = "simulator")]
pub mod simulated;

// Re-export commonly used types
pub use normalize::{normalize, normalize_event, STANDARD_GRAVITY};
pub use replay::{parse_line, ReplayReader};
pub use types::{GpsFix, RawEvent, SensorReading, SourceError, WAITING_FOR_SIGNAL};

#[cfg(feature = "simulator")]
pub use simulated::{RandomWalk, SimulatedSource, SimulatorConfig};
