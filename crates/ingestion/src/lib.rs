//! # Ingestion Pipeline
//!
//! Route event ingestion module.
//!
//! Responsibilities:
//! - Register event sources (scenario replay, live transports)
//! - Parse recorded scenarios into `RouteEvent`s
//! - Backpressure management and drop policy
//! - Funnel everything into one ordered async-channel queue
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, ReplaySource, Scenario};
//!
//! let scenario = Scenario::load(path, &blueprint.fleet.robots)?;
//! let mut pipeline = IngestionPipeline::new(1024);
//! pipeline.register_event_source(
//!     "replay".to_string(),
//!     Box::new(ReplaySource::new("replay", scenario, 1.0)),
//!     None,
//! );
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(event) = rx.recv().await {
//!     // Feed the engine
//! }
//! ```

mod adapter;
mod config;
mod error;
mod generic_adapter;
mod pipeline;
mod replay;
mod scenario;

// Re-exports
pub use adapter::EventAdapter;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::RouteEvent;
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericEventAdapter;
pub use pipeline::IngestionPipeline;
pub use replay::ReplaySource;
pub use scenario::{RecordBody, Scenario, ScenarioRecord, TimedEvent};
