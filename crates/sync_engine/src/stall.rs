//! Stall detection for robots waiting on a locked frontier.
//!
//! A robot is *waiting* when it has consumed every released point of its plan
//! (step >= cursor) while the next point is still locked. The engine has no
//! way to resolve a wait; the monitor only makes long waits visible.

use contracts::{PathPrecondition, RobotIndex};
use serde::Serialize;

/// Diagnostic emitted once per stall
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StallReport {
    pub robot: RobotIndex,

    /// Index of the first locked point
    pub frontier: usize,

    /// Consecutive observations spent waiting
    pub observations: u32,

    /// Unsatisfied preconditions of the frontier point
    pub blocking: Vec<PathPrecondition>,

    /// Set when a robot this one waits for is itself stalled waiting on it
    pub mutual_wait: bool,
}

#[derive(Debug, Clone, Default)]
struct StallState {
    waiting_for: u32,
    report: Option<StallReport>,
}

/// Per-robot consecutive-wait counters
#[derive(Debug, Clone)]
pub struct StallMonitor {
    threshold: u32,
    states: Vec<StallState>,
}

impl StallMonitor {
    pub fn new(fleet_size: usize, threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            states: vec![StallState::default(); fleet_size],
        }
    }

    /// Count one waiting observation for `robot`
    ///
    /// Returns true exactly when the threshold is reached, so each stall is
    /// reported once until [`StallMonitor::clear`] is called.
    pub fn observe_waiting(&mut self, robot: RobotIndex) -> bool {
        let Some(state) = self.states.get_mut(robot) else {
            return false;
        };
        state.waiting_for = state.waiting_for.saturating_add(1);
        state.waiting_for == self.threshold
    }

    /// Forget any wait recorded for `robot`
    pub fn clear(&mut self, robot: RobotIndex) {
        if let Some(state) = self.states.get_mut(robot) {
            *state = StallState::default();
        }
    }

    pub(crate) fn record(&mut self, report: StallReport) {
        if let Some(state) = self.states.get_mut(report.robot) {
            state.report = Some(report);
        }
    }

    /// Tag the outstanding report of `robot` as a mutual wait
    ///
    /// Returns true only when the tag is new.
    pub(crate) fn mark_mutual(&mut self, robot: RobotIndex) -> bool {
        match self
            .states
            .get_mut(robot)
            .and_then(|state| state.report.as_mut())
        {
            Some(report) if !report.mutual_wait => {
                report.mutual_wait = true;
                true
            }
            _ => false,
        }
    }

    pub fn waiting_for(&self, robot: RobotIndex) -> u32 {
        self.states
            .get(robot)
            .map(|state| state.waiting_for)
            .unwrap_or(0)
    }

    pub fn report(&self, robot: RobotIndex) -> Option<&StallReport> {
        self.states.get(robot).and_then(|state| state.report.as_ref())
    }

    pub fn is_stalled(&self, robot: RobotIndex) -> bool {
        self.report(robot).is_some()
    }

    /// Robots with an outstanding stall report, ascending
    pub fn stalled_robots(&self) -> Vec<RobotIndex> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.report.is_some())
            .map(|(robot, _)| robot)
            .collect()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
