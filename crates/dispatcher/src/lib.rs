//! # Dispatcher
//!
//! Path publication module.
//!
//! Responsibilities:
//! - Consume `PathReady` events from the engine
//! - Format them into `PublishedPath` (topic, frame, stamp, orientation)
//! - Fan-out to multiple sinks
//! - Isolate slow sinks so they never block the engine loop

pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{PathReady, PathSink, PublishedPath};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use formatter::{yaw_to_quaternion, PathFormatter};
pub use handle::{Offer, SinkHandle};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink, NetworkSink};
