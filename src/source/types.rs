//! Canonical reading types for the Sense Guardian engine.
//!
//! Raw payloads come in several historical shapes. Everything downstream of
//! the normalizer only ever sees a [`SensorReading`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder address shown while the receiver has no position fix.
pub const WAITING_FOR_SIGNAL: &str = "Waiting for GPS signal...";

/// A position fix from the GPS receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub lat: f64,
    pub lng: f64,
    /// Number of satellites in view (0 when unknown)
    pub satellites: u32,
    /// Human-readable label or formatted coordinates
    pub address: String,
}

impl GpsFix {
    /// Build a fix, deriving the address when no label was supplied.
    pub fn new(lat: f64, lng: f64, satellites: u32, label: Option<&str>) -> Self {
        let address = match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => label.to_string(),
            None => format_address(lat, lng, satellites),
        };

        Self {
            lat,
            lng,
            satellites,
            address,
        }
    }

    /// Whether the receiver reported a real position.
    ///
    /// The hardware reports `0, 0` until it acquires satellites.
    pub fn has_fix(&self) -> bool {
        !(self.lat == 0.0 && self.lng == 0.0)
    }

    /// Google Maps link for a valid fix.
    pub fn maps_url(&self) -> Option<String> {
        self.has_fix()
            .then(|| format!("https://www.google.com/maps?q={},{}", self.lat, self.lng))
    }
}

impl Default for GpsFix {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0, None)
    }
}

fn format_address(lat: f64, lng: f64, satellites: u32) -> String {
    if lat == 0.0 && lng == 0.0 {
        return WAITING_FOR_SIGNAL.to_string();
    }

    let mut address = format!("{lat:.6}, {lng:.6}");
    if satellites > 0 {
        address.push_str(&format!(" ({satellites} satellites)"));
    }
    address
}

/// One normalized tick of sensor data.
///
/// Immutable once built; [`crate::source::normalize`] is the only producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Heart rate in BPM (1 decimal)
    pub heartbeat: f64,
    /// Gravity-compensated acceleration in m/s² (2 decimals)
    pub motion: f64,
    /// Sound level in dB (1 decimal)
    pub sound: f64,
    pub gps: GpsFix,
    pub observed_at: DateTime<Utc>,
}

/// A raw payload as delivered by a data source, stamped with its arrival time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub payload: serde_json::Value,
    pub observed_at: DateTime<Utc>,
}

impl RawEvent {
    pub fn new(payload: serde_json::Value, observed_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            observed_at,
        }
    }

    /// Stamp a payload with the current time.
    pub fn now(payload: serde_json::Value) -> Self {
        Self::new(payload, Utc::now())
    }
}

/// Errors raised by data sources.
#[derive(Debug)]
pub enum SourceError {
    AlreadyRunning,
    IoError(String),
    /// A replay line that is not a JSON object (1-based line number)
    ParseError { line: usize, message: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::AlreadyRunning => write!(f, "Source is already running"),
            SourceError::IoError(e) => write!(f, "IO error: {e}"),
            SourceError::ParseError { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for SourceError {}
