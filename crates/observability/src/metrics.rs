//! Engine metrics
//!
//! Facade helpers for the Prometheus exporter plus an in-memory aggregator
//! used for the end-of-run summary.

use std::collections::{BTreeMap, HashMap};

use contracts::{PathReady, RobotIndex};
use metrics::{counter, gauge, histogram};

/// Record one emitted path
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_path_ready;
///
/// for ready in engine.handle(event) {
///     record_path_ready(&ready);
///     tx.send(ready).await?;
/// }
/// ```
pub fn record_path_ready(ready: &PathReady) {
    let robot = ready.robot.to_string();

    counter!("route_sync_paths_ready_total", "robot" => robot.clone()).increment(1);
    counter!("route_sync_points_unlocked_total", "robot" => robot.clone())
        .increment(ready.newly_unlocked as u64);
    gauge!("route_sync_frontier", "robot" => robot).set(ready.frontier as f64);
    histogram!("route_sync_path_len").record(ready.path.len() as f64);
}

/// Record one handled event and how many paths it released
pub fn record_event_handled(kind: &str, emitted: usize) {
    counter!("route_sync_events_total", "kind" => kind.to_string()).increment(1);
    histogram!("route_sync_paths_per_event").record(emitted as f64);
}

/// Record a robot's current step
pub fn record_step(robot: RobotIndex, step: usize) {
    gauge!("route_sync_step", "robot" => robot.to_string()).set(step as f64);
}

/// Record the number of robots currently stalled
pub fn record_stalled_robots(count: usize) {
    gauge!("route_sync_stalled_robots").set(count as f64);
}

/// Record time spent inside the engine for one event
pub fn record_handle_latency_us(latency_us: f64) {
    histogram!("route_sync_handle_latency_us").record(latency_us);
}

/// Record ingestion queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("route_sync_queue_depth").set(depth as f64);
}

/// Engine metrics aggregator
///
/// Aggregates in memory so a run can print a summary without a scrape.
#[derive(Debug, Clone, Default)]
pub struct EngineMetricsAggregator {
    /// Events handed to the engine
    pub total_events: u64,

    /// Events per kind (`plan`, `position`)
    pub events_by_kind: BTreeMap<String, u64>,

    /// Emitted PathReady events
    pub total_paths: u64,

    /// Points released over the whole run
    pub total_unlocked: u64,

    /// Stall reports raised
    pub stalls: u64,

    /// Stalled robots tagged as mutual waits
    pub mutual_stalls: u64,

    /// Emitted path length per robot
    pub path_len_stats: HashMap<RobotIndex, RunningStats>,

    /// Engine time per event (microseconds)
    pub latency_stats: RunningStats,
}

impl EngineMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one handled event and its output
    pub fn update(&mut self, kind: &str, emitted: &[PathReady]) {
        self.total_events += 1;
        *self.events_by_kind.entry(kind.to_string()).or_insert(0) += 1;

        for ready in emitted {
            self.total_paths += 1;
            self.total_unlocked += ready.newly_unlocked as u64;
            self.path_len_stats
                .entry(ready.robot)
                .or_default()
                .push(ready.path.len() as f64);
        }
    }

    pub fn record_stall(&mut self) {
        self.stalls += 1;
    }

    /// Count a stalled robot found to be in a mutual wait
    pub fn record_mutual_stall(&mut self) {
        self.mutual_stalls += 1;
    }

    pub fn record_latency_us(&mut self, latency_us: f64) {
        self.latency_stats.push(latency_us);
    }

    /// Build the summary report
    pub fn summary(&self) -> MetricsSummary {
        let path_lengths = self
            .path_len_stats
            .iter()
            .map(|(robot, stats)| (*robot, StatsSummary::from(stats)))
            .collect();

        MetricsSummary {
            total_events: self.total_events,
            events_by_kind: self.events_by_kind.clone(),
            total_paths: self.total_paths,
            total_unlocked: self.total_unlocked,
            paths_per_event: if self.total_events > 0 {
                self.total_paths as f64 / self.total_events as f64
            } else {
                0.0
            },
            stalls: self.stalls,
            mutual_stalls: self.mutual_stalls,
            path_lengths,
            latency_us: StatsSummary::from(&self.latency_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_events: u64,
    pub events_by_kind: BTreeMap<String, u64>,
    pub total_paths: u64,
    pub total_unlocked: u64,
    pub paths_per_event: f64,
    pub stalls: u64,
    pub mutual_stalls: u64,
    pub path_lengths: BTreeMap<RobotIndex, StatsSummary>,
    pub latency_us: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Route Sync Metrics Summary ===")?;
        writeln!(f, "Events handled: {}", self.total_events)?;
        for (kind, count) in &self.events_by_kind {
            writeln!(f, "  {}: {}", kind, count)?;
        }
        writeln!(
            f,
            "Paths emitted: {} ({:.2} per event)",
            self.total_paths, self.paths_per_event
        )?;
        writeln!(f, "Points unlocked: {}", self.total_unlocked)?;
        writeln!(
            f,
            "Stalls: {} (mutual: {})",
            self.stalls, self.mutual_stalls
        )?;
        writeln!(f, "Engine latency (us): {}", self.latency_us)?;

        if !self.path_lengths.is_empty() {
            writeln!(f, "Path length per robot:")?;
            for (robot, stats) in &self.path_lengths {
                writeln!(f, "  robot {}: {}", robot, stats)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Pose3;

    fn ready(robot: RobotIndex, len: usize, newly_unlocked: usize) -> PathReady {
        PathReady {
            robot,
            path: (0..len).map(|i| Pose3::new(i as f64, 0.0, 0.0)).collect(),
            newly_unlocked,
            frontier: len,
            pass_id: 1,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = EngineMetricsAggregator::new();

        aggregator.update("plan", &[ready(0, 1, 1)]);
        aggregator.update("position", &[ready(0, 2, 1), ready(1, 3, 3)]);
        aggregator.update("position", &[]);
        aggregator.record_stall();
        aggregator.record_stall();
        aggregator.record_mutual_stall();

        assert_eq!(aggregator.total_events, 3);
        assert_eq!(aggregator.events_by_kind.get("position"), Some(&2));
        assert_eq!(aggregator.total_paths, 3);
        assert_eq!(aggregator.total_unlocked, 5);
        assert_eq!(aggregator.stalls, 2);
        assert_eq!(aggregator.mutual_stalls, 1);

        let summary = aggregator.summary();
        assert!((summary.paths_per_event - 1.0).abs() < 1e-10);
        assert_eq!(summary.path_lengths[&0].count, 2);
        assert!((summary.path_lengths[&0].mean - 1.5).abs() < 1e-10);

        aggregator.reset();
        assert_eq!(aggregator.total_events, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = EngineMetricsAggregator::new();
        aggregator.update("plan", &[ready(1, 4, 4)]);
        aggregator.record_latency_us(12.0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Events handled: 1"));
        assert!(output.contains("plan: 1"));
        assert!(output.contains("1.00 per event"));
        assert!(output.contains("robot 1: min=4.000"));
    }

    #[test]
    fn test_empty_stats_display() {
        assert_eq!(StatsSummary::default().to_string(), "N/A");
    }
}
