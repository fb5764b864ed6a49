//! PathSink trait - Dispatcher output interface
//!
//! Sinks receive fully formatted paths: topic, frame, timestamp and
//! quaternion orientation are filled in by the dispatcher.

use serde::{Deserialize, Serialize};

use crate::{ContractError, RobotIndex, RobotName};

/// Orientation quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Single path pose with orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StampedPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub orientation: Quaternion,
}

/// Path as handed to sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedPath {
    pub robot: RobotIndex,
    pub robot_name: RobotName,

    /// Namespaced topic, e.g. `robot_0/path_synced`
    pub topic: String,

    /// Per-robot publication counter (starts at 1)
    pub seq: u64,

    /// Publication time, unix epoch milliseconds
    pub stamp_ms: i64,

    /// Coordinate frame of all poses
    pub frame_id: String,

    pub poses: Vec<StampedPose>,
}

/// Path output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(PathSink: Send)]
pub trait LocalPathSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Publish one path
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, path: &PublishedPath) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
