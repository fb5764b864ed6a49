//! Route plan contracts
//!
//! A robot's plan is two sequences indexed identically by step:
//! `PathSegment`s for progress tracking and `SyncedPathPoint`s for gating.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Point2, Pose3};

/// Robot arena index (position in the configured roster)
pub type RobotIndex = usize;

/// Directed straight-line corridor between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub start: Point2,
    pub goal: Point2,
    /// Corridor radius around the segment (meters, > 0)
    pub width: f64,
}

impl PathSegment {
    pub fn new(start: Point2, goal: Point2, width: f64) -> Self {
        Self { start, goal, width }
    }
}

/// Cross-robot gating rule: `robot_id` must have reached `required_step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathPrecondition {
    pub robot_id: RobotIndex,
    pub required_step: usize,
}

impl PathPrecondition {
    pub fn new(robot_id: RobotIndex, required_step: usize) -> Self {
        Self {
            robot_id,
            required_step,
        }
    }
}

/// Path point emitted once all its preconditions hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedPathPoint {
    pub pose: Pose3,
    #[serde(default)]
    pub preconditions: Vec<PathPrecondition>,
}

impl SyncedPathPoint {
    /// Point without preconditions
    pub fn free(pose: Pose3) -> Self {
        Self {
            pose,
            preconditions: Vec::new(),
        }
    }

    pub fn gated(pose: Pose3, preconditions: Vec<PathPrecondition>) -> Self {
        Self {
            pose,
            preconditions,
        }
    }
}

/// Route segment as delivered by the multi-robot planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start: Point2,
    pub end: Point2,
    pub width: f64,
    #[serde(default)]
    pub preconditions: Vec<PathPrecondition>,
}

/// Reason a plan was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanDefect {
    #[error("plan is empty")]
    Empty,

    #[error("segment/point length mismatch: {segments} segments, {points} points")]
    LengthMismatch { segments: usize, points: usize },

    #[error("segment {index} has invalid width {width}")]
    InvalidWidth { index: usize, width: f64 },

    #[error("segment {index} has non-finite coordinates")]
    NonFiniteGeometry { index: usize },
}

/// Validated per-robot plan
///
/// Segments and points always have equal, non-zero length.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotPlan {
    segments: Vec<PathSegment>,
    points: Vec<SyncedPathPoint>,
}

impl RobotPlan {
    /// Pair `segments` with `points`, rejecting malformed input
    pub fn new(
        segments: Vec<PathSegment>,
        points: Vec<SyncedPathPoint>,
    ) -> Result<Self, PlanDefect> {
        if segments.len() != points.len() {
            return Err(PlanDefect::LengthMismatch {
                segments: segments.len(),
                points: points.len(),
            });
        }
        if segments.is_empty() {
            return Err(PlanDefect::Empty);
        }

        for (index, segment) in segments.iter().enumerate() {
            if !segment.start.is_finite() || !segment.goal.is_finite() {
                return Err(PlanDefect::NonFiniteGeometry { index });
            }
            if !(segment.width.is_finite() && segment.width > 0.0) {
                return Err(PlanDefect::InvalidWidth {
                    index,
                    width: segment.width,
                });
            }
        }

        Ok(Self { segments, points })
    }

    /// Build a plan from planner route segments
    ///
    /// Each point sits on its segment's end, heading along the segment.
    pub fn from_route(route: &[RouteSegment]) -> Result<Self, PlanDefect> {
        let (segments, points) = route
            .iter()
            .map(|seg| {
                (
                    PathSegment::new(seg.start, seg.end, seg.width),
                    SyncedPathPoint::gated(
                        Pose3::along(&seg.start, &seg.end),
                        seg.preconditions.clone(),
                    ),
                )
            })
            .unzip();
        Self::new(segments, points)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn points(&self) -> &[SyncedPathPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a constructed plan
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn into_parts(self) -> (Vec<PathSegment>, Vec<SyncedPathPoint>) {
        (self.segments, self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_route(len: usize) -> Vec<RouteSegment> {
        (0..len)
            .map(|i| RouteSegment {
                start: Point2::new(i as f64, 0.0),
                end: Point2::new(i as f64 + 1.0, 0.0),
                width: 0.5,
                preconditions: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_from_route_derives_heading() {
        let mut route = straight_route(2);
        route[1].end = Point2::new(1.0, 1.0);
        route[1].preconditions = vec![PathPrecondition::new(1, 3)];

        let plan = RobotPlan::from_route(&route).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.points()[0].pose, Pose3::new(1.0, 0.0, 0.0));
        assert!((plan.points()[1].pose.heading - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(plan.points()[1].preconditions, vec![PathPrecondition::new(1, 3)]);
        assert_eq!(plan.segments()[1].goal, Point2::new(1.0, 1.0));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let plan = RobotPlan::from_route(&straight_route(3)).unwrap();
        let (segments, mut points) = plan.into_parts();
        points.pop();

        let result = RobotPlan::new(segments, points);
        assert_eq!(
            result.unwrap_err(),
            PlanDefect::LengthMismatch {
                segments: 3,
                points: 2
            }
        );
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert_eq!(RobotPlan::from_route(&[]).unwrap_err(), PlanDefect::Empty);
    }

    #[test]
    fn test_non_positive_width_rejected() {
        let mut route = straight_route(2);
        route[1].width = 0.0;
        let err = RobotPlan::from_route(&route).unwrap_err();
        assert!(matches!(err, PlanDefect::InvalidWidth { index: 1, .. }));
    }

    #[test]
    fn test_precondition_serde_field_names() {
        let json = r#"{"robot_id": 2, "required_step": 4}"#;
        let pc: PathPrecondition = serde_json::from_str(json).unwrap();
        assert_eq!(pc, PathPrecondition::new(2, 4));
    }
}
