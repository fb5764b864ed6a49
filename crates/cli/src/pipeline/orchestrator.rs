//! Pipeline orchestrator - coordinates all components.
//!
//! scenario replay -> ingestion queue -> engine loop -> mpsc -> dispatcher

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{FleetBlueprint, PathReady, RouteEvent};
use ingestion::{BackpressureConfig, DropPolicy, IngestionPipeline, ReplaySource, Scenario};
use observability::EngineMetricsAggregator;
use sync_engine::SynchronizationEngine;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::stats::{PipelineStats, RobotProgress, StopReason};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: FleetBlueprint,

    /// Scenario replayed as the only event source
    pub scenario_path: PathBuf,

    /// Replay speed multiplier (0 = unpaced)
    pub speed: f64,

    /// Maximum number of events to handle (None = unlimited)
    pub max_events: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    pub drop_policy: DropPolicy,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the scenario is exhausted, a limit is hit or
    /// `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Load scenario
        if !self.config.scenario_path.exists() {
            return Err(CliError::scenario_not_found(&self.config.scenario_path).into());
        }
        let scenario = Scenario::load(&self.config.scenario_path, &blueprint.fleet.robots)
            .with_context(|| {
                format!(
                    "Failed to load scenario from {}",
                    self.config.scenario_path.display()
                )
            })?;
        let scenario_events = scenario.len();
        let parse_errors = scenario.errors.len() as u64;

        info!(
            events = scenario_events,
            parse_errors,
            duration_secs = scenario.duration(),
            speed = self.config.speed,
            "Scenario loaded"
        );

        // Setup Ingestion Pipeline
        let mut ingestion = IngestionPipeline::with_config(BackpressureConfig::new(
            self.config.buffer_size,
            self.config.drop_policy,
        ));
        ingestion.metrics().record_parse_errors(parse_errors);
        ingestion.register_event_source(
            "replay".to_string(),
            Box::new(ReplaySource::new("replay", scenario, self.config.speed)),
            None,
        );

        // Setup Engine
        let engine = SynchronizationEngine::new(blueprint.fleet_size(), blueprint.engine.clone());
        info!(
            robots = blueprint.fleet_size(),
            advance_policy = ?blueprint.engine.advance_policy,
            stall_pass_threshold = blueprint.engine.stall_pass_threshold,
            "Synchronization engine configured"
        );

        // Setup Dispatcher
        let (path_tx, path_rx) = mpsc::channel::<PathReady>(self.config.buffer_size.max(1));

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - synchronized paths will be dropped");
        }

        let dispatcher = dispatcher::create_dispatcher(blueprint, path_rx)
            .await
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = blueprint.sinks.len(), "Dispatcher started");

        // Start Pipeline
        let event_rx = ingestion
            .take_receiver()
            .context("Failed to get ingestion receiver")?;
        ingestion.start_all();

        let mut engine_loop = EngineLoop::new(engine, path_tx);
        let stop_reason = engine_loop
            .drive(
                &event_rx,
                shutdown,
                self.config.max_events,
                self.config.timeout,
            )
            .await;

        // Shutdown
        info!(reason = %stop_reason, "Shutting down pipeline...");
        ingestion.stop_all();
        drop(event_rx);

        let EngineLoop {
            engine,
            aggregator,
            path_tx,
            events_handled,
            paths_emitted,
            ..
        } = engine_loop;
        drop(path_tx);

        let sinks = match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(sinks)) => sinks,
            Ok(Err(e)) => {
                return Err(CliError::pipeline_execution(format!("dispatcher task failed: {e}")).into())
            }
            Err(_) => {
                warn!("Dispatcher did not drain within 5s");
                Vec::new()
            }
        };

        let ingest = ingestion.metrics().snapshot();
        let stats = PipelineStats {
            scenario_events,
            parse_errors,
            events_received: ingest.events_received,
            events_dropped: ingest.events_dropped,
            events_handled,
            paths_emitted,
            passes: engine.pass_count(),
            duration: start_time.elapsed(),
            stop_reason,
            robots: robot_progress(&engine, blueprint),
            sinks,
            engine_metrics: aggregator,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            events_per_sec = format!("{:.2}", stats.events_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Single owner of the engine; handles one event at a time
struct EngineLoop {
    engine: SynchronizationEngine,
    path_tx: mpsc::Sender<PathReady>,
    aggregator: EngineMetricsAggregator,
    known_stalls: BTreeSet<usize>,
    known_mutual: BTreeSet<usize>,
    events_handled: u64,
    paths_emitted: u64,
}

impl EngineLoop {
    fn new(engine: SynchronizationEngine, path_tx: mpsc::Sender<PathReady>) -> Self {
        Self {
            engine,
            path_tx,
            aggregator: EngineMetricsAggregator::new(),
            known_stalls: BTreeSet::new(),
            known_mutual: BTreeSet::new(),
            events_handled: 0,
            paths_emitted: 0,
        }
    }

    async fn drive<F>(
        &mut self,
        event_rx: &Receiver<RouteEvent>,
        shutdown: F,
        max_events: Option<u64>,
        timeout: Option<Duration>,
    ) -> StopReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        info!(max_events = ?max_events, "Pipeline running");

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    return StopReason::Interrupted;
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = ?timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    return StopReason::TimedOut;
                }
                next = event_rx.recv() => match next {
                    Ok(event) => event,
                    Err(_) => return StopReason::Completed,
                },
            };

            observability::record_queue_depth(event_rx.len());
            if !self.process(event).await {
                warn!("Dispatcher channel closed");
                return StopReason::DispatcherClosed;
            }

            if let Some(max) = max_events {
                if self.events_handled >= max {
                    info!(events = self.events_handled, "Reached max events limit");
                    return StopReason::EventLimit;
                }
            }
        }
    }

    /// Returns false once the dispatcher has gone away
    async fn process(&mut self, event: RouteEvent) -> bool {
        let robot = event.robot();
        let kind = event.kind();

        let started = Instant::now();
        let emitted = self.engine.handle(event);
        let latency_us = started.elapsed().as_secs_f64() * 1e6;

        self.events_handled += 1;
        observability::record_event_handled(kind, emitted.len());
        observability::record_handle_latency_us(latency_us);
        self.aggregator.update(kind, &emitted);
        self.aggregator.record_latency_us(latency_us);
        if let Some(step) = self.engine.step(robot) {
            observability::record_step(robot, step);
        }
        self.track_stalls();

        for ready in emitted {
            observability::record_path_ready(&ready);
            debug!(
                robot = ready.robot,
                len = ready.path.len(),
                frontier = ready.frontier,
                pass_id = ready.pass_id,
                "Path released"
            );
            if self.path_tx.send(ready).await.is_err() {
                return false;
            }
            self.paths_emitted += 1;
        }
        true
    }

    /// Count new stalls, and stalls that turned mutual once a partner stalled
    fn track_stalls(&mut self) {
        let stalled: BTreeSet<usize> = self.engine.stalled_robots().into_iter().collect();
        let mut mutual = BTreeSet::new();
        for &robot in &stalled {
            if !self.known_stalls.contains(&robot) {
                self.aggregator.record_stall();
            }
            let Some(report) = self.engine.stall_report(robot) else {
                continue;
            };
            if report.mutual_wait {
                if !self.known_mutual.contains(&robot) {
                    self.aggregator.record_mutual_stall();
                }
                mutual.insert(robot);
            }
        }
        observability::record_stalled_robots(stalled.len());
        self.known_stalls = stalled;
        self.known_mutual = mutual;
    }
}

fn robot_progress(engine: &SynchronizationEngine, blueprint: &FleetBlueprint) -> Vec<RobotProgress> {
    let stalled: BTreeSet<usize> = engine.stalled_robots().into_iter().collect();
    blueprint
        .fleet
        .robots
        .iter()
        .enumerate()
        .map(|(robot, name)| RobotProgress {
            name: name.to_string(),
            step: engine.step(robot).unwrap_or(0),
            released: engine.cursor(robot).unwrap_or(0),
            plan_len: engine.plan_len(robot).unwrap_or(0),
            stalled: stalled.contains(&robot),
        })
        .collect()
}
