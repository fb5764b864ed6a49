//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! The dispatcher never awaits a sink. Every published path carries the
//! robot's whole released prefix, so a newer path for a topic makes any queued
//! older one obsolete. When the queue is full an offer evicts, in order of
//! preference: a queued path on the same topic, the oldest queued path whose
//! topic has a newer one queued behind it, the oldest queued path. The newest
//! offer is always kept, and with a capacity of at least one slot per robot no
//! topic ever loses its latest path.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{PathSink, PublishedPath};

use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// Outcome of offering a path to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// Queued after evicting an older path (counted as dropped)
    Evicted,
    /// Worker gone
    Closed,
}

#[derive(Default)]
struct Pending {
    paths: VecDeque<PublishedPath>,
    closed: bool,
}

impl Pending {
    /// Index of the path to evict from a full queue to make room for a path
    /// on `topic`
    fn victim(&self, topic: &str) -> usize {
        if let Some(index) = self.paths.iter().position(|p| p.topic == topic) {
            return index;
        }
        self.paths
            .iter()
            .enumerate()
            .position(|(index, path)| {
                self.paths
                    .iter()
                    .skip(index + 1)
                    .any(|later| later.topic == path.topic)
            })
            .unwrap_or(0)
    }
}

struct Shared {
    pending: Mutex<Pending>,
    ready: Notify,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    shared: Arc<Shared>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn a worker owning `sink`
    pub fn spawn<S: PathSink + Send + Sync + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            ready: Notify::new(),
            capacity: queue_capacity.max(1),
        });
        let metrics = Arc::new(SinkMetrics::new());

        let worker = SinkWorker {
            sink,
            shared: Arc::clone(&shared),
            metrics: Arc::clone(&metrics),
            name: name.clone(),
        };

        Self {
            name,
            shared,
            metrics,
            worker: tokio::spawn(worker.run()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue `path` without waiting
    pub fn offer(&self, path: PublishedPath) -> Offer {
        let mut pending = self.shared.lock();
        if pending.closed || self.worker.is_finished() {
            error!(sink = %self.name, "sink worker is gone");
            return Offer::Closed;
        }

        let mut outcome = Offer::Queued;
        if pending.paths.len() >= self.shared.capacity {
            let victim = pending.victim(&path.topic);
            if let Some(evicted) = pending.paths.remove(victim) {
                self.metrics.inc_dropped_count();
                metrics::counter!("route_sync_sink_dropped_total", "sink" => self.name.clone())
                    .increment(1);
                warn!(
                    sink = %self.name,
                    topic = %evicted.topic,
                    seq = evicted.seq,
                    newer_seq = path.seq,
                    "sink queue full, older path evicted"
                );
                outcome = Offer::Evicted;
            }
        }

        pending.paths.push_back(path);
        self.metrics.set_queue_len(pending.paths.len());
        drop(pending);

        self.shared.ready.notify_one();
        outcome
    }

    /// Close the queue, wait for the worker to drain it and return the
    /// final counters
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        self.shared.lock().closed = true;
        self.shared.ready.notify_one();

        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "sink worker panicked");
        }
        debug!(sink = %self.name, "sink drained");
        self.metrics.snapshot()
    }
}

struct SinkWorker<S> {
    sink: S,
    shared: Arc<Shared>,
    metrics: Arc<SinkMetrics>,
    name: String,
}

impl<S: PathSink> SinkWorker<S> {
    /// Next queued path; `None` once the queue is closed and drained
    async fn next(&self) -> Option<PublishedPath> {
        loop {
            {
                let mut pending = self.shared.lock();
                if let Some(path) = pending.paths.pop_front() {
                    self.metrics.set_queue_len(pending.paths.len());
                    return Some(path);
                }
                if pending.closed {
                    return None;
                }
            }
            // A notify_one sent before this await leaves a permit behind
            self.shared.ready.notified().await;
        }
    }

    #[instrument(name = "sink_worker", skip(self), fields(sink = %self.name))]
    async fn run(mut self) {
        debug!("sink worker started");

        while let Some(path) = self.next().await {
            match self.sink.write(&path).await {
                Ok(()) => self.metrics.record_write(path.stamp_ms),
                Err(e) => {
                    // A failed write only costs this path
                    self.metrics.inc_failure_count();
                    error!(
                        topic = %path.topic,
                        seq = path.seq,
                        error = %e,
                        "sink write failed"
                    );
                }
            }
        }

        if let Err(e) = self.sink.flush().await {
            error!(error = %e, "sink flush failed");
        }
        if let Err(e) = self.sink.close().await {
            error!(error = %e, "sink close failed");
        }
        self.metrics.set_queue_len(0);

        debug!("sink worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;

    fn path_on(topic: &str, seq: u64) -> PublishedPath {
        PublishedPath {
            robot: 0,
            robot_name: "robot_0".into(),
            topic: topic.to_string(),
            seq,
            stamp_ms: 1_700_000_000_000 + seq as i64,
            frame_id: "map".to_string(),
            poses: Vec::new(),
        }
    }

    fn path(seq: u64) -> PublishedPath {
        path_on("robot_0/path_synced", seq)
    }

    /// Records written (topic, seq); optionally waits for a go signal before
    /// the first write, or fails every odd sequence number.
    #[derive(Default)]
    struct ScriptedSink {
        written: Arc<Mutex<Vec<(String, u64)>>>,
        gate: Option<Arc<Notify>>,
        fail_odd: bool,
        closed: Arc<Mutex<bool>>,
    }

    impl PathSink for ScriptedSink {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn write(&mut self, path: &PublishedPath) -> Result<(), ContractError> {
            if let Some(gate) = self.gate.take() {
                gate.notified().await;
            }
            if self.fail_odd && path.seq % 2 == 1 {
                return Err(ContractError::sink_write("scripted", "odd seq"));
            }
            self.written
                .lock()
                .unwrap()
                .push((path.topic.clone(), path.seq));
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn seqs(written: &Mutex<Vec<(String, u64)>>) -> Vec<u64> {
        written.lock().unwrap().iter().map(|(_, seq)| *seq).collect()
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_in_order() {
        let sink = ScriptedSink::default();
        let written = Arc::clone(&sink.written);
        let closed = Arc::clone(&sink.closed);

        let handle = SinkHandle::spawn(sink, 8);
        for seq in 1..=4 {
            assert_eq!(handle.offer(path(seq)), Offer::Queued);
        }

        let snapshot = handle.shutdown().await;
        assert_eq!(seqs(&written), vec![1, 2, 3, 4]);
        assert!(*closed.lock().unwrap());
        assert_eq!(snapshot.write_count, 4);
        assert_eq!(snapshot.queue_len, 0);
        assert_eq!(snapshot.last_stamp_ms, Some(1_700_000_000_004));
    }

    #[tokio::test]
    async fn test_latest_path_survives_full_queue() {
        let gate = Arc::new(Notify::new());
        let sink = ScriptedSink {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        let written = Arc::clone(&sink.written);

        let handle = SinkHandle::spawn(sink, 1);
        assert_eq!(handle.offer(path(1)), Offer::Queued);
        for seq in 2..=3 {
            handle.offer(path(seq));
        }
        assert!(handle.metrics().dropped_count() >= 1);

        gate.notify_one();
        let snapshot = handle.shutdown().await;

        assert_eq!(seqs(&written).last(), Some(&3));
        assert!(!seqs(&written).contains(&2));
        assert_eq!(snapshot.offered(), 3);
    }

    #[tokio::test]
    async fn test_full_queue_evicts_obsolete_path_before_other_topics() {
        let gate = Arc::new(Notify::new());
        let sink = ScriptedSink {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        let written = Arc::clone(&sink.written);

        // The worker has not run yet: nothing leaves the queue until we yield.
        let handle = SinkHandle::spawn(sink, 2);
        assert_eq!(handle.offer(path_on("a/path_synced", 1)), Offer::Queued);
        assert_eq!(handle.offer(path_on("a/path_synced", 2)), Offer::Queued);
        assert_eq!(handle.offer(path_on("b/path_synced", 1)), Offer::Evicted);

        gate.notify_one();
        handle.shutdown().await;

        assert_eq!(
            *written.lock().unwrap(),
            vec![
                ("a/path_synced".to_string(), 2),
                ("b/path_synced".to_string(), 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_writes_are_counted_and_skipped() {
        let sink = ScriptedSink {
            fail_odd: true,
            ..Default::default()
        };
        let written = Arc::clone(&sink.written);

        let handle = SinkHandle::spawn(sink, 8);
        for seq in 1..=5 {
            handle.offer(path(seq));
        }

        let snapshot = handle.shutdown().await;
        assert_eq!(seqs(&written), vec![2, 4]);
        assert_eq!(snapshot.failure_count, 3);
        assert_eq!(snapshot.write_count, 2);
    }

    #[test]
    fn test_victim_prefers_same_topic_then_obsolete() {
        let mut pending = Pending::default();
        pending.paths.extend([
            path_on("a", 1),
            path_on("b", 1),
            path_on("b", 2),
            path_on("c", 1),
        ]);

        assert_eq!(pending.victim("c"), 3);
        assert_eq!(pending.victim("d"), 1);

        pending.paths.remove(1);
        assert_eq!(pending.victim("d"), 0);
    }
}
