//! # Sync Engine
//!
//! Multi-robot route synchronization core.
//!
//! Responsibilities:
//! - map position samples to discrete plan steps (`SegmentProgressTracker`)
//! - gate each robot's path points on the steps of other robots (`SyncGate`)
//! - run fleet-wide recomputation passes and emit `PathReady`
//! - surface robots held at a locked frontier (`StallMonitor`)
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::{EngineConfig, SynchronizationEngine};
//!
//! let mut engine = SynchronizationEngine::new(2, EngineConfig::default());
//!
//! for event in events {
//!     for ready in engine.handle(event) {
//!         // Publish ready.path for ready.robot
//!     }
//! }
//! ```

mod engine;
mod error;
mod gate;
mod stall;
mod step_vector;
mod tracker;

pub use engine::SynchronizationEngine;
pub use error::{EngineError, Result};
pub use gate::SyncGate;
pub use stall::{StallMonitor, StallReport};
pub use step_vector::StepVector;
pub use tracker::{SegmentProgressTracker, StepUpdate};

// Re-export contracts types
pub use contracts::{AdvancePolicy, EngineConfig, PathReady, RobotPlan, RouteEvent};
