//! Engine error types

use contracts::{PlanDefect, RobotIndex};
use thiserror::Error;

/// Engine-level errors
///
/// All of them are local to one robot's event; none stops the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Rejected plan, the prior plan stays active
    #[error("malformed plan for robot {robot}: {reason}")]
    MalformedPlan { robot: RobotIndex, reason: PlanDefect },

    /// Robot index outside the fleet arena
    #[error("unknown robot {robot} (fleet size {fleet_size})")]
    UnknownRobot {
        robot: RobotIndex,
        fleet_size: usize,
    },
}

impl EngineError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::MalformedPlan { .. } => "malformed_plan",
            EngineError::UnknownRobot { .. } => "unknown_robot",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
