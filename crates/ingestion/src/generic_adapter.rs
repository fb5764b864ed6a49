//! Generic event adapter
//!
//! Unified adapter over the `EventSource` trait, so the pipeline treats
//! scenario replay and live sources the same way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Sender, TrySendError};
use contracts::{EventSource, RouteEvent, RouteEventCallback};
use tracing::{debug, trace, warn};

use crate::adapter::EventAdapter;
use crate::config::{BackpressureConfig, DropPolicy, IngestionMetrics};

/// Adapts an `EventSource` into an `EventAdapter`
pub struct GenericEventAdapter {
    source_id: String,
    source: Box<dyn EventSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl GenericEventAdapter {
    pub fn new(source_id: String, source: Box<dyn EventSource>, config: BackpressureConfig) -> Self {
        Self {
            source_id,
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl EventAdapter for GenericEventAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn start(&self, tx: Sender<RouteEvent>, metrics: Arc<IngestionMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();

        debug!(source_id = %source_id, "starting generic adapter");

        let callback: RouteEventCallback = Arc::new(move |event| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            trace!(source_id = %source_id, kind = event.kind(), "generic adapter received event");
            send_event(&tx, event, &metrics, &source_id, drop_policy);
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source_id = %self.source_id, "stopping generic adapter");
            self.source.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed) && self.source.is_listening()
    }
}

/// Send an event, applying the backpressure policy
///
/// Runs on the source's own thread, so waiting for room is allowed.
/// Plans are never dropped.
pub(crate) fn send_event(
    tx: &Sender<RouteEvent>,
    event: RouteEvent,
    metrics: &IngestionMetrics,
    source_id: &str,
    drop_policy: DropPolicy,
) {
    let may_drop =
        drop_policy == DropPolicy::DropNewestPosition && matches!(event, RouteEvent::Position { .. });

    let result = if may_drop {
        match tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                metrics.record_dropped();
                metrics::counter!("route_sync_ingest_dropped_total").increment(1);
                trace!(source_id = %source_id, robot = event.robot(), "position dropped (queue full)");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(()),
        }
    } else {
        tx.send_blocking(event).map_err(|_| ())
    };

    match result {
        Ok(()) => {
            metrics.update_queue_len(tx.len());
            trace!(source_id = %source_id, "event queued");
        }
        Err(()) => {
            warn!(source_id = %source_id, "channel closed");
        }
    }
}
