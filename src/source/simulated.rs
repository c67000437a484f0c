//! Simulated sensor source.
//!
//! Emits a clamped random walk on a fixed interval, for running the engine
//! without hardware. Payloads use the flat scalar shape.

use crate::source::types::{RawEvent, SourceError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Readings buffered before new ones are dropped.
pub const QUEUE_CAPACITY: usize = 1_000;

/// Configuration for the simulated source.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Time between readings
    pub interval: Duration,
    /// Fixed seed for a reproducible walk
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            seed: None,
        }
    }
}

/// Random-walk generator for heartbeat, motion and sound.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    heartbeat: f64,
    motion: f64,
    sound: f64,
    rng: StdRng,
}

impl RandomWalk {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            heartbeat: 75.0,
            motion: 3.2,
            sound: 45.0,
            rng,
        }
    }

    /// Advance the walk and render the next payload.
    pub fn next_payload(&mut self) -> Value {
        self.heartbeat = (self.heartbeat + self.jitter(10.0)).clamp(50.0, 120.0);
        self.motion = (self.motion + self.jitter(2.0)).clamp(0.0, 10.0);
        self.sound = (self.sound + self.jitter(15.0)).clamp(20.0, 100.0);

        json!({
            "heartbeat": self.heartbeat,
            "motion": self.motion,
            "sound": self.sound,
            "gps": { "lat": 40.7128, "lng": -74.0060, "address": "New York, NY" },
        })
    }

    /// Uniform step in `[-span / 2, span / 2)`.
    fn jitter(&mut self, span: f64) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * span
    }
}

/// A source that generates readings on a background thread.
pub struct SimulatedSource {
    config: SimulatorConfig,
    sender: Sender<RawEvent>,
    receiver: Receiver<RawEvent>,
    walk: Option<RandomWalk>,
    worker: Option<(Sender<()>, JoinHandle<RandomWalk>)>,
}

impl SimulatedSource {
    /// Create a stopped source.
    pub fn new(config: SimulatorConfig) -> Self {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        let walk = RandomWalk::new(config.seed);
        Self {
            config,
            sender,
            receiver,
            walk: Some(walk),
            worker: None,
        }
    }

    /// Start generating readings.
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadyRunning);
        }

        let mut walk = self
            .walk
            .take()
            .unwrap_or_else(|| RandomWalk::new(self.config.seed));
        let sender = self.sender.clone();
        let interval = self.config.interval;
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        // Don't block if the channel is full - just drop the reading
                        let event = RawEvent::now(walk.next_payload());
                        if let Err(TrySendError::Disconnected(_)) = sender.try_send(event) {
                            break;
                        }
                    }
                    // stop requested or sender dropped
                    _ => break,
                }
            }
            walk
        });

        debug!(interval_ms = interval.as_millis() as u64, "simulator started");
        self.worker = Some((stop_tx, handle));
        Ok(())
    }

    /// Stop generating readings. The walk resumes where it left off on restart.
    pub fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            drop(stop_tx);
            match handle.join() {
                Ok(walk) => self.walk = Some(walk),
                Err(_) => debug!("simulator thread panicked"),
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Get the receiver for raw events.
    pub fn receiver(&self) -> &Receiver<RawEvent> {
        &self.receiver
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<RawEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::normalize::normalize_event;

    #[test]
    fn test_seeded_walk_is_reproducible() {
        let mut a = RandomWalk::new(Some(7));
        let mut b = RandomWalk::new(Some(7));
        for _ in 0..20 {
            assert_eq!(a.next_payload(), b.next_payload());
        }
    }

    #[test]
    fn test_walk_stays_in_bounds() {
        let mut walk = RandomWalk::new(Some(42));
        for _ in 0..1_000 {
            let payload = walk.next_payload();
            let hb = payload["heartbeat"].as_f64().unwrap();
            let motion = payload["motion"].as_f64().unwrap();
            let sound = payload["sound"].as_f64().unwrap();
            assert!((50.0..=120.0).contains(&hb));
            assert!((0.0..=10.0).contains(&motion));
            assert!((20.0..=100.0).contains(&sound));
        }
    }

    #[test]
    fn test_source_emits_normalizable_events() {
        let mut source = SimulatedSource::new(SimulatorConfig {
            interval: Duration::from_millis(5),
            seed: Some(1),
        });
        source.start().unwrap();
        assert!(source.is_running());
        assert!(matches!(source.start(), Err(SourceError::AlreadyRunning)));

        let event = source
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .expect("no event from simulator");
        source.stop();
        assert!(!source.is_running());

        let reading = normalize_event(&event).expect("simulated payload not recognized");
        assert_eq!(reading.gps.address, "New York, NY");
    }

    #[test]
    fn test_stop_returns_with_full_queue() {
        let mut source = SimulatedSource::new(SimulatorConfig {
            interval: Duration::from_micros(100),
            seed: Some(3),
        });
        source.start().unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while source.receiver().len() < QUEUE_CAPACITY && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(source.receiver().len(), QUEUE_CAPACITY);

        let (done_tx, done_rx) = bounded::<()>(1);
        let stopper = thread::spawn(move || {
            source.stop();
            let _ = done_tx.send(());
            source
        });
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "stop() blocked on a full queue"
        );

        let source = stopper.join().unwrap();
        assert!(!source.is_running());
        assert!(source.try_recv().is_some());
    }
}
