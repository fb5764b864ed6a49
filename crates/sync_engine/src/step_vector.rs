//! Fleet-wide step snapshot.

use contracts::{PathPrecondition, RobotIndex};

/// Current step of every robot in the fleet
///
/// Sized once from the roster. Only the engine writes to it, and never while
/// gates are evaluating against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepVector {
    steps: Vec<usize>,
}

impl StepVector {
    pub fn new(fleet_size: usize) -> Self {
        Self {
            steps: vec![0; fleet_size],
        }
    }

    /// Step of `robot`, `None` outside the fleet
    #[inline]
    pub fn get(&self, robot: RobotIndex) -> Option<usize> {
        self.steps.get(robot).copied()
    }

    pub(crate) fn set(&mut self, robot: RobotIndex, step: usize) {
        if let Some(slot) = self.steps.get_mut(robot) {
            *slot = step;
        }
    }

    /// Whether `precondition` holds against this snapshot
    ///
    /// Preconditions naming robots outside the fleet never hold.
    #[inline]
    pub fn satisfies(&self, precondition: &PathPrecondition) -> bool {
        self.get(precondition.robot_id)
            .is_some_and(|step| step >= precondition.required_step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.steps
    }
}
