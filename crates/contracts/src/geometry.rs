//! Planar geometry value types.

use serde::{Deserialize, Serialize};

/// Position in the map frame (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Heading (radians) of the vector pointing from `self` to `to`
    #[inline]
    pub fn heading_to(&self, to: &Point2) -> f64 {
        (to.y - self.y).atan2(to.x - self.x)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Planar pose: position plus heading about +Z
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose3 {
    pub position: Point2,
    /// Heading in radians, counter-clockwise from +X
    pub heading: f64,
}

impl Pose3 {
    #[inline]
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            position: Point2 { x, y },
            heading,
        }
    }

    /// Pose at `goal`, oriented along the direction `start -> goal`
    pub fn along(start: &Point2, goal: &Point2) -> Self {
        Self {
            position: *goal,
            heading: start.heading_to(goal),
        }
    }
}
