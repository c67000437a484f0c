//! Reading normalization.
//!
//! Maps the payload shapes seen from the device over time onto one
//! [`SensorReading`]. Each output field is resolved through an ordered rule
//! list; the first rule that yields a number wins. Missing or garbage values
//! fall back to 0, this layer never rejects a field.
//!
//! Accepted shapes:
//! - a nested sensor suite (`{"MPU6050": {"heartRate", "accelX", ...}, "sound": {"level"}, "gps": {...}}`)
//! - flat three-axis acceleration next to flat scalars (`{"ax", "ay", "az", "bpm", "noise"}`)
//! - fully flat scalars (`{"heartbeat", "motion", "sound", "lat", "lng"}`)
//! - any of the above wrapped one level deep under an arbitrary key

use crate::source::types::{GpsFix, RawEvent, SensorReading};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Standard gravity subtracted from raw accelerometer magnitudes (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.8;

type Object = Map<String, Value>;

/// Where a rule looks for its key.
#[derive(Debug, Clone, Copy)]
enum Field {
    /// Inside the nested health/motion block
    Health(&'static str),
    /// Inside the nested sound block
    Sound(&'static str),
    /// Inside the gps block, or the root when there is none
    Gps(&'static str),
    /// At the root of the payload
    Flat(&'static str),
}

const HEARTBEAT_RULES: &[Field] = &[
    Field::Health("heartRate"),
    Field::Flat("heartbeat"),
    Field::Flat("heart_rate"),
    Field::Flat("bpm"),
];

const MOTION_RULES: &[Field] = &[
    Field::Health("motion"),
    Field::Flat("motion"),
    Field::Flat("acceleration"),
];

const SOUND_RULES: &[Field] = &[
    Field::Sound("level"),
    Field::Sound("db"),
    Field::Flat("sound"),
    Field::Flat("noise"),
    Field::Flat("sound_level"),
];

const LAT_RULES: &[Field] = &[Field::Gps("latitude"), Field::Gps("lat")];
const LNG_RULES: &[Field] = &[Field::Gps("longitude"), Field::Gps("lng")];
const SATELLITE_RULES: &[Field] = &[Field::Gps("satellites"), Field::Gps("sat")];
const LABEL_RULES: &[Field] = &[Field::Gps("address"), Field::Gps("label")];

/// Accelerometer component names, in lookup order.
const AXIS_KEYS: &[[&str; 3]] = &[
    ["accelX", "accelY", "accelZ"],
    ["ax", "ay", "az"],
    ["accel_x", "accel_y", "accel_z"],
];

/// Block names that hold the health/motion sensor when nested.
const HEALTH_BLOCKS: &[&str] = &["MPU6050", "mpu6050", "health", "motion", "accelerometer"];

/// Keys that mark an arbitrary sub-object as a health/motion block.
const HEALTH_MARKERS: &[&str] = &["heartRate", "accelX", "accelY", "accelZ"];

const SOUND_BLOCKS: &[&str] = &["sound", "microphone", "mic"];
const GPS_BLOCKS: &[&str] = &["gps", "location"];

/// Every root-level key that makes a payload recognizable.
const ROOT_MARKERS: &[&str] = &[
    "heartbeat",
    "heart_rate",
    "bpm",
    "motion",
    "acceleration",
    "sound",
    "noise",
    "sound_level",
    "ax",
    "ay",
    "az",
    "accel_x",
    "accel_y",
    "accel_z",
    "lat",
    "lng",
    "latitude",
    "longitude",
    "gps",
    "location",
];

/// Borrowed view over the blocks of one payload.
struct PayloadView<'a> {
    root: &'a Object,
    health: Option<&'a Object>,
    sound: Option<&'a Object>,
    gps: Option<&'a Object>,
}

impl<'a> PayloadView<'a> {
    fn new(root: &'a Object) -> Self {
        Self {
            root,
            health: find_health_block(root),
            sound: find_block(root, SOUND_BLOCKS),
            gps: find_block(root, GPS_BLOCKS),
        }
    }

    fn lookup(&self, field: Field) -> Option<f64> {
        let (block, key) = match field {
            Field::Health(key) => (self.health?, key),
            Field::Sound(key) => (self.sound?, key),
            Field::Gps(key) => (self.gps.unwrap_or(self.root), key),
            Field::Flat(key) => (self.root, key),
        };
        block.get(key).and_then(number)
    }

    /// First rule that yields a number.
    fn resolve(&self, rules: &[Field]) -> Option<f64> {
        rules.iter().find_map(|&field| self.lookup(field))
    }

    fn resolve_str(&self, rules: &[Field]) -> Option<&'a str> {
        rules.iter().find_map(|&field| match field {
            Field::Gps(key) => self.gps.unwrap_or(self.root).get(key)?.as_str(),
            _ => None,
        })
    }

    fn heartbeat(&self) -> Option<f64> {
        self.resolve(HEARTBEAT_RULES).map(non_negative)
    }

    fn motion(&self) -> Option<f64> {
        // Nested accelerometers report raw axes including gravity; the net
        // value keeps its sign.
        if let Some(magnitude) = self.health.and_then(axis_magnitude) {
            return Some(magnitude - STANDARD_GRAVITY);
        }
        if let Some(magnitude) = axis_magnitude(self.root) {
            return Some((magnitude - STANDARD_GRAVITY).abs());
        }
        self.resolve(MOTION_RULES).map(non_negative)
    }

    fn sound(&self) -> Option<f64> {
        self.resolve(SOUND_RULES).map(non_negative)
    }

    fn gps(&self) -> Option<GpsFix> {
        let lat = self.resolve(LAT_RULES);
        let lng = self.resolve(LNG_RULES);
        if lat.is_none() && lng.is_none() && self.gps.is_none() {
            return None;
        }

        let satellites = self
            .resolve(SATELLITE_RULES)
            .map(|s| non_negative(s).floor() as u32)
            .unwrap_or(0);

        Some(GpsFix::new(
            lat.unwrap_or(0.0),
            lng.unwrap_or(0.0),
            satellites,
            self.resolve_str(LABEL_RULES),
        ))
    }
}

/// Normalize one raw payload.
///
/// Returns `None` when the payload carries no recognizable sensor field.
pub fn normalize(payload: &Value, observed_at: DateTime<Utc>) -> Option<SensorReading> {
    let reading = candidate_roots(payload.as_object()?)
        .find_map(|root| read_root(root, observed_at));
    if reading.is_none() {
        debug!("payload has no recognizable sensor fields");
    }
    reading
}

/// Normalize a raw event using its arrival timestamp.
pub fn normalize_event(event: &RawEvent) -> Option<SensorReading> {
    normalize(&event.payload, event.observed_at)
}

fn read_root(root: &Object, observed_at: DateTime<Utc>) -> Option<SensorReading> {
    let view = PayloadView::new(root);

    let heartbeat = view.heartbeat();
    let motion = view.motion();
    let sound = view.sound();
    let gps = view.gps();

    if heartbeat.is_none() && motion.is_none() && sound.is_none() && gps.is_none() {
        return None;
    }

    Some(SensorReading {
        heartbeat: round_to(heartbeat.unwrap_or(0.0), 1),
        motion: round_to(motion.unwrap_or(0.0), 2),
        sound: round_to(sound.unwrap_or(0.0), 1),
        gps: gps.unwrap_or_default(),
        observed_at,
    })
}

/// The payload itself, then every sub-object that looks like one.
///
/// A root can carry a marker key without any usable value (a `"location"`
/// string, say), so wrapped children are still tried after it.
fn candidate_roots(object: &Object) -> impl Iterator<Item = &Object> {
    let wrapped = object
        .values()
        .filter_map(Value::as_object)
        .filter(|child| is_recognizable(child));
    is_recognizable(object).then_some(object).into_iter().chain(wrapped)
}

fn is_recognizable(object: &Object) -> bool {
    ROOT_MARKERS.iter().any(|key| object.contains_key(*key)) || find_health_block(object).is_some()
}

fn find_block<'a>(root: &'a Object, names: &[&str]) -> Option<&'a Object> {
    names
        .iter()
        .find_map(|name| root.get(*name).and_then(Value::as_object))
}

fn find_health_block(root: &Object) -> Option<&Object> {
    find_block(root, HEALTH_BLOCKS).or_else(|| {
        root.values()
            .filter_map(Value::as_object)
            .find(|child| HEALTH_MARKERS.iter().any(|key| child.contains_key(*key)))
    })
}

/// Magnitude of the first axis set with at least one numeric component.
fn axis_magnitude(block: &Object) -> Option<f64> {
    AXIS_KEYS.iter().find_map(|keys| {
        let components: Vec<Option<f64>> =
            keys.iter().map(|key| block.get(*key).and_then(number)).collect();
        if components.iter().all(Option::is_none) {
            return None;
        }
        let sum_sq: f64 = components.iter().map(|c| c.unwrap_or(0.0).powi(2)).sum();
        Some(sum_sq.sqrt())
    })
}

/// Numbers and numeric strings; anything non-finite is treated as absent.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn non_negative(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::WAITING_FOR_SIGNAL;
    use serde_json::json;

    fn norm(payload: Value) -> Option<SensorReading> {
        normalize(&payload, Utc::now())
    }

    #[test]
    fn test_flat_scalars() {
        let reading = norm(json!({
            "heartbeat": 72.44,
            "motion": 1.234,
            "sound": 55.56,
            "lat": 40.7128,
            "lng": -74.006,
        }))
        .unwrap();

        assert_eq!(reading.heartbeat, 72.4);
        assert_eq!(reading.motion, 1.23);
        assert_eq!(reading.sound, 55.6);
        assert_eq!(reading.gps.address, "40.712800, -74.006000");
    }

    #[test]
    fn test_nested_sensor_suite() {
        let reading = norm(json!({
            "MPU6050": { "heartRate": 88, "accelX": 0.0, "accelY": 0.0, "accelZ": 12.0 },
            "sound": { "level": 64.27 },
            "gps": { "latitude": 51.5, "longitude": -0.12, "satellites": 6 },
        }))
        .unwrap();

        assert_eq!(reading.heartbeat, 88.0);
        // 12.0 - 9.8
        assert_eq!(reading.motion, 2.2);
        assert_eq!(reading.sound, 64.3);
        assert_eq!(reading.gps.satellites, 6);
        assert!(reading.gps.address.ends_with("(6 satellites)"));
    }

    #[test]
    fn test_nested_acceleration_keeps_sign() {
        let reading = norm(json!({
            "health": { "accelX": 0.0, "accelY": 0.0, "accelZ": 9.0 },
        }))
        .unwrap();
        assert_eq!(reading.motion, -0.8);

        // free fall reads no gravity at all
        let reading = norm(json!({
            "MPU6050": { "heartRate": 70, "accelX": 0.0, "accelY": 0.0, "accelZ": 0.0 },
        }))
        .unwrap();
        assert_eq!(reading.motion, -9.8);
    }

    #[test]
    fn test_flat_axes_use_absolute_net_value() {
        let reading = norm(json!({ "ax": 0.0, "ay": 0.0, "az": 9.0, "bpm": 65 })).unwrap();
        assert_eq!(reading.motion, 0.8);
        assert_eq!(reading.heartbeat, 65.0);

        let reading = norm(json!({ "ax": 3.0, "ay": 4.0, "az": 12.0 })).unwrap();
        // sqrt(9 + 16 + 144) = 13.0
        assert_eq!(reading.motion, 3.2);
    }

    #[test]
    fn test_heartbeat_resolution_order() {
        let reading = norm(json!({
            "health": { "heartRate": 90 },
            "heartbeat": 70,
            "bpm": 50,
        }))
        .unwrap();
        assert_eq!(reading.heartbeat, 90.0);

        let reading = norm(json!({ "heart_rate": 61, "bpm": 50 })).unwrap();
        assert_eq!(reading.heartbeat, 61.0);
    }

    #[test]
    fn test_sound_aliases() {
        assert_eq!(norm(json!({ "noise": 42 })).unwrap().sound, 42.0);
        assert_eq!(norm(json!({ "sound_level": 43 })).unwrap().sound, 43.0);
        assert_eq!(norm(json!({ "sound": { "db": 44 } })).unwrap().sound, 44.0);
    }

    #[test]
    fn test_wrapped_payload() {
        let reading = norm(json!({
            "device-7f3a": { "heartbeat": 101, "sound": 30, "acceleration": 0.5 }
        }))
        .unwrap();
        assert_eq!(reading.heartbeat, 101.0);
        assert_eq!(reading.sound, 30.0);
        assert_eq!(reading.motion, 0.5);
    }

    #[test]
    fn test_wrapper_found_behind_unusable_root_marker() {
        let reading = norm(json!({
            "location": "Ward 3",
            "device": { "heartbeat": 80, "sound": 50 },
        }))
        .expect("wrapped readings should be found");
        assert_eq!(reading.heartbeat, 80.0);
        assert_eq!(reading.sound, 50.0);
    }

    #[test]
    fn test_garbage_fields_become_zero() {
        let reading = norm(json!({
            "heartbeat": "not a number",
            "sound": -12,
            "motion": null,
        }))
        .unwrap();
        assert_eq!(reading.heartbeat, 0.0);
        assert_eq!(reading.sound, 0.0);
        assert_eq!(reading.motion, 0.0);
        assert_eq!(reading.gps.address, WAITING_FOR_SIGNAL);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let reading = norm(json!({ "heartbeat": " 77.25 " })).unwrap();
        assert_eq!(reading.heartbeat, 77.3);
    }

    #[test]
    fn test_unrecognized_payload() {
        assert!(norm(json!({ "battery": 80, "firmware": "1.2.0" })).is_none());
        assert!(norm(json!([1, 2, 3])).is_none());
        assert!(norm(json!("hello")).is_none());
    }

    #[test]
    fn test_gps_label() {
        let reading = norm(json!({
            "gps": { "lat": 40.7128, "lng": -74.006, "address": "New York, NY" },
        }))
        .unwrap();
        assert_eq!(reading.gps.address, "New York, NY");
        assert_eq!(reading.heartbeat, 0.0);
    }
}
