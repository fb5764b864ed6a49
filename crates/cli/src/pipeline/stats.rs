//! Pipeline statistics and metrics.

use std::fmt;
use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::EngineMetricsAggregator;

/// Why the engine loop stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Every source finished and the queue drained
    #[default]
    Completed,
    /// `--max-events` reached
    EventLimit,
    /// `--timeout` elapsed
    TimedOut,
    /// Ctrl-C or SIGTERM
    Interrupted,
    /// Dispatcher stopped accepting paths
    DispatcherClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Completed => "completed",
            StopReason::EventLimit => "event limit reached",
            StopReason::TimedOut => "timed out",
            StopReason::Interrupted => "interrupted",
            StopReason::DispatcherClosed => "dispatcher closed",
        };
        f.write_str(text)
    }
}

/// Final state of one robot
#[derive(Debug, Clone, Default)]
pub struct RobotProgress {
    pub name: String,
    pub step: usize,
    pub released: usize,
    pub plan_len: usize,
    pub stalled: bool,
}

impl RobotProgress {
    /// Whole plan released
    pub fn is_complete(&self) -> bool {
        self.plan_len > 0 && self.released == self.plan_len
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Events parsed from the scenario
    pub scenario_events: usize,

    /// Scenario records rejected while parsing
    pub parse_errors: u64,

    /// Events accepted by the ingestion queue
    pub events_received: u64,

    /// Position samples dropped under backpressure
    pub events_dropped: u64,

    /// Events handed to the engine
    pub events_handled: u64,

    /// PathReady events sent to the dispatcher
    pub paths_emitted: u64,

    /// Engine recomputation passes
    pub passes: u64,

    pub duration: Duration,

    pub stop_reason: StopReason,

    pub robots: Vec<RobotProgress>,

    /// Final per-sink counters
    pub sinks: Vec<(String, MetricsSnapshot)>,

    pub engine_metrics: EngineMetricsAggregator,
}

impl PipelineStats {
    /// Handled events per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_handled as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn completed_robots(&self) -> usize {
        self.robots.iter().filter(|r| r.is_complete()).count()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Stop reason: {}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Scenario events: {}", self.scenario_events);
        println!("   ├─ Parse errors: {}", self.parse_errors);
        println!("   ├─ Events received: {}", self.events_received);
        println!("   ├─ Events dropped: {}", self.events_dropped);
        println!("   ├─ Events handled: {}", self.events_handled);
        println!("   ├─ Events/s: {:.2}", self.events_per_sec());
        println!("   ├─ Recomputation passes: {}", self.passes);
        println!("   └─ Paths emitted: {}", self.paths_emitted);

        println!(
            "\n🤖 Robots ({} of {} fully released)",
            self.completed_robots(),
            self.robots.len()
        );
        for (i, robot) in self.robots.iter().enumerate() {
            let prefix = if i == self.robots.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!(
                "   {} {}: step {}, released {}/{}{}",
                prefix,
                robot.name,
                robot.step,
                robot.released,
                robot.plan_len,
                if robot.stalled { " (stalled)" } else { "" }
            );
        }

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, metrics)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: written {}, failed {}, dropped {}",
                    prefix, name, metrics.write_count, metrics.failure_count, metrics.dropped_count
                );
            }
        }

        println!("\n{}", self.engine_metrics.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_per_sec() {
        let stats = PipelineStats {
            events_handled: 50,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.events_per_sec() - 25.0).abs() < 1e-10);
        assert_eq!(PipelineStats::default().events_per_sec(), 0.0);
    }

    #[test]
    fn test_completed_robots() {
        let stats = PipelineStats {
            robots: vec![
                RobotProgress {
                    name: "robot_0".into(),
                    step: 2,
                    released: 3,
                    plan_len: 3,
                    stalled: false,
                },
                RobotProgress {
                    name: "robot_1".into(),
                    step: 1,
                    released: 1,
                    plan_len: 3,
                    stalled: true,
                },
                RobotProgress::default(),
            ],
            ..Default::default()
        };
        assert_eq!(stats.completed_robots(), 1);
        assert_eq!(StopReason::TimedOut.to_string(), "timed out");
    }
}
