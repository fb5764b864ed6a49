//! Scenario replay source
//!
//! Plays a parsed scenario back through the `EventSource` interface on a
//! dedicated thread, optionally paced by the record timestamps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{EventSource, RouteEventCallback};
use tracing::{debug, info};

use crate::scenario::{Scenario, TimedEvent};

/// Longest single sleep, bounds how late a stop request is noticed
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Replays recorded events
pub struct ReplaySource {
    source_id: String,
    events: Arc<Vec<TimedEvent>>,
    /// Playback rate; `0` replays as fast as the queue accepts
    speed: f64,
    listening: Arc<AtomicBool>,
}

impl ReplaySource {
    pub fn new(source_id: impl Into<String>, scenario: Scenario, speed: f64) -> Self {
        Self {
            source_id: source_id.into(),
            events: Arc::new(scenario.events),
            speed: if speed.is_finite() && speed > 0.0 {
                speed
            } else {
                0.0
            },
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl EventSource for ReplaySource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: RouteEventCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let events = self.events.clone();
        let speed = self.speed;
        let listening = self.listening.clone();

        info!(source_id = %source_id, events = events.len(), speed, "replay started");

        std::thread::spawn(move || {
            let started = Instant::now();
            let mut replayed = 0usize;

            for timed in events.iter() {
                if speed > 0.0 {
                    let due = started + Duration::from_secs_f64(timed.t / speed);
                    if !sleep_until(due, &listening) {
                        break;
                    }
                }
                if !listening.load(Ordering::Relaxed) {
                    break;
                }
                callback(timed.event.clone());
                replayed += 1;
            }

            listening.store(false, Ordering::SeqCst);
            debug!(source_id = %source_id, replayed, "replay finished");
            // Dropping `callback` here releases the queue sender
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

/// Sleep until `due`; false if stopped meanwhile
fn sleep_until(due: Instant, listening: &AtomicBool) -> bool {
    loop {
        if !listening.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= due {
            return true;
        }
        std::thread::sleep((due - now).min(MAX_SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Point2, RouteEvent};
    use std::sync::mpsc;

    fn scenario(times: &[f64]) -> Scenario {
        Scenario {
            events: times
                .iter()
                .enumerate()
                .map(|(i, &t)| TimedEvent {
                    t,
                    event: RouteEvent::Position {
                        robot: 0,
                        position: Point2::new(i as f64, 0.0),
                    },
                })
                .collect(),
            errors: Vec::new(),
        }
    }

    fn collect(source: &ReplaySource) -> mpsc::Receiver<RouteEvent> {
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        source.listen(Arc::new(move |event| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(event);
            }
        }));
        rx
    }

    #[test]
    fn test_unpaced_replay_preserves_order() {
        let source = ReplaySource::new("replay", scenario(&[0.0, 5.0, 10.0]), 0.0);
        let rx = collect(&source);

        // Iterator ends when the replay thread drops the callback
        let xs: Vec<f64> = rx
            .iter()
            .map(|event| match event {
                RouteEvent::Position { position, .. } => position.x,
                RouteEvent::Plan { .. } => -1.0,
            })
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert!(!source.is_listening());
    }

    #[test]
    fn test_paced_replay_waits() {
        let source = ReplaySource::new("replay", scenario(&[0.0, 0.1]), 2.0);
        let started = Instant::now();
        let rx = collect(&source);
        assert_eq!(rx.iter().count(), 2);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_stop_interrupts_replay() {
        let source = ReplaySource::new("replay", scenario(&[0.0, 60.0]), 1.0);
        let rx = collect(&source);
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());

        source.stop();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());
    }

    #[test]
    fn test_invalid_speed_means_unpaced() {
        assert_eq!(ReplaySource::new("r", Scenario::default(), -3.0).speed(), 0.0);
        assert_eq!(ReplaySource::new("r", Scenario::default(), f64::NAN).speed(), 0.0);
    }
}
