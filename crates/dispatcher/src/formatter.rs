//! PathReady -> PublishedPath formatting
//!
//! The engine hands over bare geometry. Topic naming, frame id, sequence
//! numbers, timestamps and quaternion orientation are added here.

use chrono::Utc;
use contracts::{FleetBlueprint, PathReady, PublishedPath, Quaternion, RobotName, StampedPose};
use nalgebra::{UnitQuaternion, Vector3};

/// Quaternion for a rotation of `heading` radians about +Z
pub fn yaw_to_quaternion(heading: f64) -> Quaternion {
    let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), heading);
    Quaternion {
        x: q.i,
        y: q.j,
        z: q.k,
        w: q.w,
    }
}

/// Stateful formatter holding the roster and per-robot sequence counters
#[derive(Debug, Clone)]
pub struct PathFormatter {
    robots: Vec<RobotName>,
    path_topic: String,
    frame_id: String,
    seq: Vec<u64>,
}

impl PathFormatter {
    pub fn new(
        robots: Vec<RobotName>,
        path_topic: impl Into<String>,
        frame_id: impl Into<String>,
    ) -> Self {
        let seq = vec![0; robots.len()];
        Self {
            robots,
            path_topic: path_topic.into(),
            frame_id: frame_id.into(),
            seq,
        }
    }

    pub fn from_blueprint(blueprint: &FleetBlueprint) -> Self {
        Self::new(
            blueprint.fleet.robots.clone(),
            blueprint.topics.path_topic.clone(),
            blueprint.fleet.frame_id.clone(),
        )
    }

    /// Format one event; `None` when the robot is not in the roster
    pub fn format(&mut self, ready: &PathReady) -> Option<PublishedPath> {
        let robot_name = self.robots.get(ready.robot)?.clone();
        let seq = self.seq.get_mut(ready.robot)?;
        *seq += 1;

        let poses = ready
            .path
            .iter()
            .map(|pose| StampedPose {
                x: pose.position.x,
                y: pose.position.y,
                z: 0.0,
                orientation: yaw_to_quaternion(pose.heading),
            })
            .collect();

        Some(PublishedPath {
            robot: ready.robot,
            topic: robot_name.topic(&self.path_topic),
            robot_name,
            seq: *seq,
            stamp_ms: Utc::now().timestamp_millis(),
            frame_id: self.frame_id.clone(),
            poses,
        })
    }

    /// Paths published so far for `robot`
    pub fn published(&self, robot: usize) -> u64 {
        self.seq.get(robot).copied().unwrap_or(0)
    }
}
