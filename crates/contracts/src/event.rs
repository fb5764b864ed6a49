//! Engine input events and output notifications.

use serde::{Deserialize, Serialize};

use crate::{Point2, Pose3, RobotIndex, RouteSegment};

/// Event consumed by the synchronization engine
///
/// All events pass through one ordered queue; per robot they must arrive in
/// causal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteEvent {
    /// Position sample reported by a robot
    Position { robot: RobotIndex, position: Point2 },

    /// New route for a robot, replacing any previous one
    Plan {
        robot: RobotIndex,
        segments: Vec<RouteSegment>,
    },
}

impl RouteEvent {
    pub fn robot(&self) -> RobotIndex {
        match self {
            RouteEvent::Position { robot, .. } | RouteEvent::Plan { robot, .. } => *robot,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RouteEvent::Position { .. } => "position",
            RouteEvent::Plan { .. } => "plan",
        }
    }
}

/// Path ready for publication
///
/// Carries the whole unlocked prefix of the robot's plan, from point 0 up to
/// (excluding) the frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathReady {
    pub robot: RobotIndex,

    /// Poses of every unlocked point, in step order
    pub path: Vec<Pose3>,

    /// Points unlocked by the pass that produced this event
    pub newly_unlocked: usize,

    /// Index of the first locked point (== `path.len()`)
    pub frontier: usize,

    /// Recomputation pass that produced this event
    pub pass_id: u64,
}

impl PathReady {
    /// Whether every point of the plan has been released
    pub fn is_complete(&self, plan_len: usize) -> bool {
        self.frontier >= plan_len
    }
}
