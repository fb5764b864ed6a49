//! Event adapter trait

use std::sync::Arc;

use async_channel::Sender;
use contracts::RouteEvent;

use crate::config::IngestionMetrics;

/// Event adapter trait
///
/// Bridges one event source onto the shared queue:
/// 1. Register a callback with the source
/// 2. Apply the backpressure policy
/// 3. Forward events in the order the source produced them
pub trait EventAdapter: Send + Sync {
    fn source_id(&self) -> &str;

    /// Start forwarding events
    ///
    /// # Arguments
    /// * `tx` - Event queue sender, dropped when the source finishes
    /// * `metrics` - Shared ingestion metrics
    fn start(&self, tx: Sender<RouteEvent>, metrics: Arc<IngestionMetrics>);

    fn stop(&self);

    fn is_listening(&self) -> bool;
}
