//! End-to-end scenarios through the engine

use chrono::{DateTime, Duration, TimeZone, Utc};
use sense_guardian::core::{
    HeartPhase, MotionPhase, ABNORMAL_HEART_RATE_ID, INTENSE_MOTION_ID, LOUD_NOISE_ID,
    MAX_TRANSIENT,
};
use sense_guardian::source::ReplayReader;
use sense_guardian::{Engine, IngestOutcome, NotificationKind, SystemStatus, Thresholds};
use serde_json::{json, Value};
use std::io::Cursor;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

fn reading(heartbeat: f64, motion: f64, sound: f64) -> Value {
    json!({ "heartbeat": heartbeat, "motion": motion, "sound": sound })
}

fn ids(engine: &Engine) -> Vec<String> {
    engine.current_notifications().iter().map(|n| n.id.clone()).collect()
}

#[test]
fn test_single_high_heart_rate_reading() {
    let mut engine = Engine::new(Thresholds::default());
    engine.process_reading(&reading(105.0, 0.5, 50.0), at(0));

    let alerts = engine.current_notifications();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, NotificationKind::Alert);
    assert_eq!(alerts[0].sensor, "Heart Rate");
    assert_eq!(alerts[0].message, "High heart rate detected: 105 BPM");
    assert!(!alerts[0].persistent);
    assert!(alerts[0].id.starts_with("heart-high-"));
}

#[test]
fn test_rising_heart_rate_raises_and_clears_persistent_alert() {
    let mut engine = Engine::default();
    for (secs, bpm) in [(0, 70.0), (1, 73.0), (2, 76.0), (3, 79.0)] {
        engine.process_reading(&reading(bpm, 0.5, 50.0), at(secs));
    }
    assert_eq!(engine.heart().phase(), HeartPhase::AbnormalCandidate);

    engine.process_reading(&reading(79.0, 0.5, 50.0), at(32));
    assert!(!engine.store().contains(ABNORMAL_HEART_RATE_ID));

    engine.process_reading(&reading(79.0, 0.5, 50.0), at(33));
    let alert = engine
        .store()
        .get(ABNORMAL_HEART_RATE_ID)
        .expect("abnormal heart rate alert missing");
    assert!(alert.persistent);
    assert!(alert.message.contains("no loud noise detected"));
    assert_eq!(engine.system_status(), SystemStatus::Monitoring);

    assert!(!engine.dismiss(ABNORMAL_HEART_RATE_ID));
    assert!(engine.store().contains(ABNORMAL_HEART_RATE_ID));

    // the last five steps must all be within 2 BPM; the 76 -> 79 rise drops out at 36s
    for secs in 34..=35 {
        engine.process_reading(&reading(80.0, 0.5, 50.0), at(secs));
        assert!(engine.store().contains(ABNORMAL_HEART_RATE_ID));
    }
    engine.process_reading(&reading(81.0, 0.5, 50.0), at(36));
    assert!(!engine.store().contains(ABNORMAL_HEART_RATE_ID));
    assert_eq!(engine.heart().phase(), HeartPhase::Idle);
    assert_eq!(engine.system_status(), SystemStatus::Normal);
}

#[test]
fn test_intense_motion_lifecycle() {
    let mut engine = Engine::default();
    for (secs, motion) in [(0, 0.0), (1, 1.5), (2, 3.0), (3, 4.5), (4, 6.0)] {
        engine.process_reading(&reading(75.0, motion, 50.0), at(secs));
    }
    assert_eq!(engine.motion().phase(), MotionPhase::IntenseCandidate);

    // a small change only decays the counter
    engine.process_reading(&reading(75.0, 6.2, 50.0), at(5));
    assert_eq!(engine.motion().rapid_changes(), 3);
    assert_eq!(engine.motion().phase(), MotionPhase::IntenseCandidate);

    engine.process_reading(&reading(75.0, 4.0, 50.0), at(34));
    let alert = engine.store().get(INTENSE_MOTION_ID).expect("intense motion alert missing");
    assert!(alert.message.ends_with("now 4.00 m/s²"));

    for secs in 35..=38 {
        engine.process_reading(&reading(75.0, 4.0, 50.0), at(secs));
        assert!(engine.store().contains(INTENSE_MOTION_ID), "cleared early at {secs}s");
    }
    engine.process_reading(&reading(75.0, 4.0, 50.0), at(39));
    assert!(!engine.store().contains(INTENSE_MOTION_ID));
    assert_eq!(engine.motion().phase(), MotionPhase::Idle);
}

#[test]
fn test_loud_noise_raised_then_cleared() {
    let mut engine = Engine::default();
    for secs in 0..10 {
        engine.process_reading(&reading(75.0, 0.5, 85.0), at(secs));
    }
    let loud = engine.store().get(LOUD_NOISE_ID).expect("loud noise alert missing");
    assert_eq!(loud.message, "Persistent loud noise: 60-second average 85.0 dB");
    assert!(!engine.dismiss(LOUD_NOISE_ID));

    engine.process_reading(&reading(75.0, 0.5, 20.0), at(10));
    assert!(!engine.store().contains(LOUD_NOISE_ID));
    assert!(!engine.sound().is_active());
}

#[test]
fn test_transient_cap_and_persistent_survival() {
    let mut engine = Engine::default();
    for secs in 0..10 {
        engine.process_reading(&reading(75.0, 0.5, 85.0), at(secs));
    }
    assert!(engine.store().contains(LOUD_NOISE_ID));

    for secs in 10..40 {
        engine.process_reading(&reading(130.0, 0.5, 85.0), at(secs));
    }
    assert_eq!(engine.store().transient_count(), MAX_TRANSIENT);
    assert!(engine.store().contains(LOUD_NOISE_ID));

    // newest first
    let list = ids(&engine);
    assert!(list[0].ends_with(&at(39).timestamp_millis().to_string()));
}

#[test]
fn test_missing_fields_default_to_zero() {
    let mut engine = Engine::default();
    let outcome = engine.process_reading(&json!({ "sound": 55 }), at(0));
    let IngestOutcome::Processed(reading) = outcome else {
        panic!("payload should be recognized");
    };
    assert_eq!(reading.heartbeat, 0.0);
    assert_eq!(reading.motion, 0.0);

    let alerts = engine.current_notifications();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "Low heart rate detected: 0 BPM");
    assert_eq!(alerts[0].kind, NotificationKind::Warning);
}

#[test]
fn test_device_shape_payload() {
    let mut engine = Engine::default();
    let payload = json!({
        "MPU6050": { "heartRate": 72, "accelX": 0.0, "accelY": 0.0, "accelZ": 14.8 },
        "sound": { "level": 48.5 },
        "gps": { "latitude": 40.7128, "longitude": -74.006, "satellites": 6 }
    });

    let IngestOutcome::Processed(reading) = engine.process_reading(&payload, at(0)) else {
        panic!("device payload should be recognized");
    };
    assert_eq!(reading.heartbeat, 72.0);
    assert_eq!(reading.motion, 5.0);
    assert_eq!(reading.sound, 48.5);
    assert_eq!(reading.gps.address, "40.712800, -74.006000 (6 satellites)");

    // 5.0 m/s² is above the motion bound
    assert_eq!(ids(&engine).len(), 1);
    assert!(ids(&engine)[0].starts_with("motion-high-"));
}

#[test]
fn test_replay_feed_through_engine() {
    let feed = [
        r#"{"observed_at": "2024-05-01T12:00:00Z", "payload": {"bpm": 70}}"#,
        "",
        r#"{"observed_at": "2024-05-01T12:00:01Z", "payload": {"bpm": 73}}"#,
        r#"{"observed_at": "2024-05-01T12:00:02Z", "payload": {"bpm": 76}}"#,
        "garbage",
        r#"{"observed_at": "2024-05-01T12:00:03Z", "payload": {"bpm": 79}}"#,
        r#"{"observed_at": "2024-05-01T12:00:33Z", "payload": {"bpm": 79}}"#,
    ]
    .join("\n");

    let mut engine = Engine::default();
    let mut errors = 0;
    for event in ReplayReader::new(Cursor::new(feed)) {
        match event {
            Ok(event) => {
                engine.process_event(&event);
            }
            Err(_) => errors += 1,
        }
    }

    assert_eq!(errors, 1);
    assert_eq!(engine.stats().snapshot().readings_processed, 5);
    assert!(engine.store().contains(ABNORMAL_HEART_RATE_ID));
}

#[test]
fn test_shutdown_is_final() {
    let mut engine = Engine::default();
    engine.process_reading(&reading(75.0, 0.5, 50.0), at(0));
    engine.shutdown();
    engine.shutdown();

    let outcome = engine.process_reading(&reading(130.0, 9.0, 99.0), at(1));
    assert_eq!(outcome, IngestOutcome::Stopped);
    assert!(engine.current_notifications().is_empty());
    assert_eq!(engine.latest_reading().map(|r| r.heartbeat), Some(75.0));
}
