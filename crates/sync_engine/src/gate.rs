//! Cross-robot gating of a robot's synced path points.

use contracts::{PathPrecondition, Pose3, SyncedPathPoint};

use crate::StepVector;

/// Per-robot gate over its synced path points
///
/// `cursor` counts the points already released for the current plan.
#[derive(Debug, Clone, Default)]
pub struct SyncGate {
    points: Vec<SyncedPathPoint>,
    cursor: usize,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the point sequence and rewind the cursor
    pub fn init(&mut self, points: Vec<SyncedPathPoint>) {
        self.points = points;
        self.cursor = 0;
    }

    /// Whether every precondition of point `index` holds
    ///
    /// Indices past the end are never unlocked.
    pub fn is_unlocked(&self, index: usize, steps: &StepVector) -> bool {
        self.points.get(index).is_some_and(|point| {
            point
                .preconditions
                .iter()
                .all(|precondition| steps.satisfies(precondition))
        })
    }

    /// Poses of the contiguous run of unlocked points starting at `cursor`
    ///
    /// Stops at the first locked point even if later points are unlocked.
    pub fn compute_unlocked_path(&self, cursor: usize, steps: &StepVector) -> Vec<Pose3> {
        (cursor..self.points.len())
            .take_while(|&index| self.is_unlocked(index, steps))
            .map(|index| self.points[index].pose)
            .collect()
    }

    /// Unsatisfied preconditions of the point at `cursor`
    pub fn blocking_preconditions(
        &self,
        cursor: usize,
        steps: &StepVector,
    ) -> Vec<PathPrecondition> {
        self.points
            .get(cursor)
            .map(|point| {
                point
                    .preconditions
                    .iter()
                    .filter(|precondition| !steps.satisfies(precondition))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record `count` more points as released
    pub(crate) fn advance(&mut self, count: usize) {
        self.cursor = (self.cursor + count).min(self.points.len());
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Poses from point 0 up to (excluding) the cursor
    pub fn released_path(&self) -> Vec<Pose3> {
        self.points[..self.cursor]
            .iter()
            .map(|point| point.pose)
            .collect()
    }
}
