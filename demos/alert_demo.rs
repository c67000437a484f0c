//! Demonstration of the Sense Guardian alert lifecycle.
//!
//! This example shows how to:
//! 1. Feed readings into the engine
//! 2. Watch transient and persistent notifications appear
//! 3. Try to dismiss them
//! 4. See persistent alerts clear once their channel calms down
//!
//! Run with: cargo run --example alert_demo

use chrono::{DateTime, Duration, Utc};
use sense_guardian::core::{ABNORMAL_HEART_RATE_ID, LOUD_NOISE_ID};
use sense_guardian::{Engine, Thresholds};
use serde_json::json;

fn main() {
    println!("Sense Guardian - Alert Demo");
    println!("===========================");
    println!();

    let mut engine = Engine::new(Thresholds::default());
    let start = Utc::now();
    let at = |secs: i64| -> DateTime<Utc> { start + Duration::seconds(secs) };

    println!("1. A single reading above 100 BPM");
    engine.process_reading(&json!({ "heartbeat": 105, "motion": 0.4, "sound": 50 }), at(0));
    show(&engine);

    let transient = engine.current_notifications()[0].id.clone();
    println!("   Dismissing {transient}: {}", engine.dismiss(&transient));
    println!();

    println!("2. Ten seconds of 85 dB");
    for secs in 1..=10 {
        engine.process_reading(&json!({ "heartbeat": 72, "motion": 0.4, "sound": 85 }), at(secs));
    }
    show(&engine);
    println!("   Dismissing {LOUD_NOISE_ID}: {}", engine.dismiss(LOUD_NOISE_ID));
    println!();

    println!("3. Heart rate rising for over 30 seconds");
    for (secs, bpm) in [(11, 75), (12, 78), (13, 81), (44, 81)] {
        engine.process_reading(&json!({ "heartbeat": bpm, "motion": 0.4, "sound": 85 }), at(secs));
    }
    show(&engine);

    println!("4. Quiet room, steady heart rate");
    for secs in 45..=60 {
        engine.process_reading(&json!({ "heartbeat": 80, "motion": 0.4, "sound": 20 }), at(secs));
    }
    show(&engine);
    println!(
        "   {ABNORMAL_HEART_RATE_ID} still active: {}",
        engine.store().contains(ABNORMAL_HEART_RATE_ID)
    );
    println!();

    engine.shutdown();
    println!("{}", engine.stats().summary());
}

fn show(engine: &Engine) {
    println!("   Status: {}", engine.system_status());
    for n in engine.current_notifications() {
        let tag = if n.persistent { "persistent" } else { "transient" };
        println!("   [{}] {} ({tag}): {}", n.kind, n.sensor, n.message);
        if let Some(hint) = n.hint() {
            println!("       {hint}");
        }
    }
    println!();
}
