//! Dispatcher - main loop for fan-out to sinks

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{ContractError, FleetBlueprint, PathReady, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::formatter::PathFormatter;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
    /// Turns engine output into publishable paths
    pub formatter: PathFormatter,
}

impl DispatcherConfig {
    pub fn from_blueprint(blueprint: &FleetBlueprint) -> Self {
        Self {
            sinks: blueprint.sinks.clone(),
            formatter: PathFormatter::from_blueprint(blueprint),
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<PathReady>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<PathReady>) -> Self {
        Self { config, input_rx }
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config.sinks).await?;

        Ok(Dispatcher {
            handles,
            formatter: self.config.formatter,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(sinks),
        fields(sink_count = sinks.len())
    )]
    async fn initialize_handles(sinks: &[SinkConfig]) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(sinks.len());
        for sink_config in sinks {
            handles.push(create_sink_handle(sink_config).await?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params).map_err(|e| {
                DispatcherError::sink_creation(&config.name, ContractError::Io(e))
            })?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Formats engine output and fans it out to sinks
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    formatter: PathFormatter,
    input_rx: mpsc::Receiver<PathReady>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        formatter: PathFormatter,
        input_rx: mpsc::Receiver<PathReady>,
    ) -> Self {
        Self {
            handles,
            formatter,
            input_rx,
        }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns the final sink metrics once the input channel is closed and
    /// every sink has drained its queue.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut path_count: u64 = 0;

        while let Some(ready) = self.input_rx.recv().await {
            if self.dispatch_path(&ready) {
                path_count += 1;
            }

            if path_count > 0 && path_count.is_multiple_of(100) {
                debug!(paths = path_count, "Dispatcher progress");
            }
        }

        info!(paths = path_count, "Dispatcher input closed, shutting down");

        let handles = std::mem::take(&mut self.handles);
        let mut final_metrics = Vec::with_capacity(handles.len());
        for handle in handles {
            let name = handle.name().to_string();
            final_metrics.push((name, handle.shutdown().await));
        }

        info!("Dispatcher shutdown complete");
        final_metrics
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    fn dispatch_path(&mut self, ready: &PathReady) -> bool {
        let Some(path) = self.formatter.format(ready) else {
            warn!(robot = ready.robot, "PathReady for robot outside the roster, skipped");
            return false;
        };

        metrics::counter!("route_sync_paths_published_total").increment(1);
        debug!(
            topic = %path.topic,
            seq = path.seq,
            poses = path.poses.len(),
            pass_id = ready.pass_id,
            "Dispatching path"
        );

        for handle in &self.handles {
            handle.offer(path.clone());
        }
        true
    }
}

/// Convenience function to create a dispatcher from a fleet blueprint
#[instrument(name = "dispatcher_create", skip(blueprint, input_rx))]
pub async fn create_dispatcher(
    blueprint: &FleetBlueprint,
    input_rx: mpsc::Receiver<PathReady>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig::from_blueprint(blueprint);
    DispatcherBuilder::new(config, input_rx).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, PathSink, Pose3, PublishedPath};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        name: String,
        seen: Arc<Mutex<Vec<PublishedPath>>>,
    }

    impl PathSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, path: &PublishedPath) -> Result<(), ContractError> {
            self.seen.lock().unwrap().push(path.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn formatter() -> PathFormatter {
        PathFormatter::new(vec!["robot_0".into(), "robot_1".into()], "path_synced", "map")
    }

    fn ready(robot: usize, len: usize, pass_id: u64) -> PathReady {
        PathReady {
            robot,
            path: (0..len).map(|i| Pose3::new(i as f64, 0.0, 0.0)).collect(),
            newly_unlocked: 1,
            frontier: len,
            pass_id,
        }
    }

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);
        let seen_a = Arc::new(Mutex::new(Vec::new()));
        let seen_b = Arc::new(Mutex::new(Vec::new()));

        let handles = vec![
            SinkHandle::spawn(
                RecordingSink {
                    name: "a".to_string(),
                    seen: Arc::clone(&seen_a),
                },
                10,
            ),
            SinkHandle::spawn(
                RecordingSink {
                    name: "b".to_string(),
                    seen: Arc::clone(&seen_b),
                },
                10,
            ),
        ];

        let dispatcher = Dispatcher::with_handles(handles, formatter(), input_rx);
        let handle = dispatcher.spawn();

        input_tx.send(ready(0, 1, 1)).await.unwrap();
        input_tx.send(ready(1, 1, 1)).await.unwrap();
        input_tx.send(ready(0, 2, 2)).await.unwrap();
        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.iter().all(|(_, m)| m.write_count == 3));

        let seen = seen_a.lock().unwrap();
        let topics: Vec<_> = seen.iter().map(|p| (p.topic.as_str(), p.seq)).collect();
        assert_eq!(
            topics,
            vec![
                ("robot_0/path_synced", 1),
                ("robot_1/path_synced", 1),
                ("robot_0/path_synced", 2),
            ]
        );
        assert_eq!(seen[2].poses.len(), 2);
        assert_eq!(seen_b.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_robot_not_dispatched() {
        let (input_tx, input_rx) = mpsc::channel(4);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handles = vec![SinkHandle::spawn(
            RecordingSink {
                name: "only".to_string(),
                seen: Arc::clone(&seen),
            },
            4,
        )];

        let handle = Dispatcher::with_handles(handles, formatter(), input_rx).spawn();
        input_tx.send(ready(5, 1, 1)).await.unwrap();
        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics[0].1.offered(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_blueprint() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let mut blueprint = FleetBlueprint::default();
        blueprint.sinks = vec![SinkConfig {
            name: "test_log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let dispatcher = create_dispatcher(&blueprint, input_rx).await.unwrap();
        let handle = dispatcher.spawn();

        input_tx.send(ready(0, 1, 1)).await.unwrap();
        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics[0].0, "test_log");
        assert_eq!(metrics[0].1.write_count, 1);
    }

    #[tokio::test]
    async fn test_bad_network_sink_fails_build() {
        let (_input_tx, input_rx) = mpsc::channel(1);

        let mut blueprint = FleetBlueprint::default();
        blueprint.sinks = vec![SinkConfig {
            name: "broken".to_string(),
            sink_type: SinkType::Network,
            queue_capacity: 1,
            params: HashMap::new(),
        }];

        let err = create_dispatcher(&blueprint, input_rx).await.err().unwrap();
        assert!(matches!(err, DispatcherError::SinkCreation { ref name, .. } if name == "broken"));
    }
}
