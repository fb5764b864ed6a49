//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{EventSource, RouteEvent};
use tracing::{debug, info, instrument, warn};

use crate::adapter::EventAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::generic_adapter::GenericEventAdapter;

/// Ingestion Pipeline
///
/// Funnels every registered source into one bounded, ordered queue. The
/// receiver yields `Err` once all sources have finished after `start_all`.
pub struct IngestionPipeline {
    adapters: HashMap<String, Box<dyn EventAdapter>>,

    metrics: Arc<IngestionMetrics>,

    /// Pipeline-held sender, released by `start_all`
    tx: Option<Sender<RouteEvent>>,

    rx: Option<Receiver<RouteEvent>>,

    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx: Some(tx),
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Register an event source
    ///
    /// # Arguments
    /// * `source_id` - Unique source name
    /// * `source` - Source implementing the `EventSource` trait
    /// * `config` - Optional backpressure configuration
    #[instrument(
        name = "ingestion_register_event_source",
        skip(self, source, config),
        fields(source_id = %source_id)
    )]
    pub fn register_event_source(
        &mut self,
        source_id: String,
        source: Box<dyn EventSource>,
        config: Option<BackpressureConfig>,
    ) {
        let adapter = GenericEventAdapter::new(
            source_id.clone(),
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(source_id = %source_id, "registered event source");
        self.adapters.insert(source_id, Box::new(adapter));
    }

    /// Start all registered sources
    ///
    /// Releases the pipeline's own sender, so the queue closes once every
    /// source has finished. Sources registered afterwards cannot be started.
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&mut self) {
        let Some(tx) = self.tx.take() else {
            warn!("ingestion pipeline already started");
            return;
        };

        info!(count = self.adapters.len(), "starting all event sources");
        for (source_id, adapter) in &self.adapters {
            if !adapter.is_listening() {
                debug!(source_id = %source_id, "starting adapter");
                adapter.start(tx.clone(), self.metrics.clone());
            }
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all event sources");
        for (source_id, adapter) in &self.adapters {
            if adapter.is_listening() {
                debug!(source_id = %source_id, "stopping adapter");
                adapter.stop();
            }
        }
    }

    /// Get event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<RouteEvent>> {
        self.rx.take()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.adapters
            .get(source_id)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplaySource;
    use crate::scenario::Scenario;
    use contracts::RobotName;

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new(100);
        assert_eq!(pipeline.source_count(), 0);
    }

    #[test]
    fn test_take_receiver_once() {
        let mut pipeline = IngestionPipeline::new(100);
        assert!(pipeline.take_receiver().is_some());
        assert!(pipeline.take_receiver().is_none());
    }

    #[tokio::test]
    async fn test_queue_closes_after_sources_finish() {
        let roster: Vec<RobotName> = vec!["a".into(), "b".into()];
        let text = r#"{"t": 0.0, "type": "position", "robot": "a", "x": 0.0, "y": 0.0}
{"t": 0.0, "type": "position", "robot": "b", "x": 1.0, "y": 0.0}
{"t": 0.0, "type": "position", "robot": "a", "x": 2.0, "y": 0.0}"#;

        let mut pipeline = IngestionPipeline::new(1);
        pipeline.register_event_source(
            "replay".to_string(),
            Box::new(ReplaySource::new("replay", Scenario::parse(text, &roster), 0.0)),
            None,
        );
        let rx = pipeline.take_receiver().unwrap();
        pipeline.start_all();

        let mut robots = Vec::new();
        while let Ok(event) = rx.recv().await {
            robots.push(event.robot());
        }
        assert_eq!(robots, vec![0, 1, 0]);
        assert_eq!(pipeline.metrics().snapshot().events_received, 3);
        assert!(!pipeline.is_source_listening("replay"));
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut pipeline = IngestionPipeline::new(4);
        pipeline.start_all();
        pipeline.start_all();
        let rx = pipeline.take_receiver().unwrap();
        assert!(rx.is_closed());
    }
}
