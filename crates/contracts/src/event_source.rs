//! EventSource trait - route event source abstraction
//!
//! Decouples the producers of position samples and plan assignments (scenario
//! replay, live transports) from the single ordered queue feeding the engine.

use std::sync::Arc;

use crate::RouteEvent;

/// Route event callback type
///
/// Sources hand every produced event to this callback. Dropping the last
/// clone of the callback signals that the source has finished.
pub type RouteEventCallback = Arc<dyn Fn(RouteEvent) + Send + Sync>;

/// Route event source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn EventSource> = Box::new(ReplaySource::from_path(path, &roster)?);
/// source.listen(Arc::new(|event| {
///     println!("robot {} sent {}", event.robot(), event.kind());
/// }));
/// // ... later ...
/// source.stop();
/// ```
pub trait EventSource: Send + Sync {
    /// Source name (used for logging/metrics)
    fn source_id(&self) -> &str;

    /// Start producing events into `callback`
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: RouteEventCallback);

    /// Stop producing events
    fn stop(&self);

    fn is_listening(&self) -> bool;
}
