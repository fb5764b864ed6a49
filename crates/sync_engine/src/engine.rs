//! Synchronization engine: per-robot trackers and gates plus the global
//! recomputation pass.

use contracts::{
    EngineConfig, PathReady, PathSegment, Point2, Pose3, RobotIndex, RobotPlan, RouteEvent,
    RouteSegment, SyncedPathPoint,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{EngineError, Result};
use crate::gate::SyncGate;
use crate::stall::{StallMonitor, StallReport};
use crate::step_vector::StepVector;
use crate::tracker::SegmentProgressTracker;

/// Arena slot owning one robot's state
#[derive(Debug, Clone, Default)]
struct RobotSlot {
    tracker: SegmentProgressTracker,
    gate: SyncGate,
}

/// Multi-robot route synchronization engine
///
/// Events must be fed one at a time; each call runs to completion, including
/// any recomputation pass it triggers, before returning the paths to publish.
#[derive(Debug)]
pub struct SynchronizationEngine {
    config: EngineConfig,
    slots: Vec<RobotSlot>,
    steps: StepVector,
    stalls: StallMonitor,
    pass_count: u64,
}

impl SynchronizationEngine {
    /// Create an engine for robots `0..fleet_size`
    pub fn new(fleet_size: usize, config: EngineConfig) -> Self {
        let slots = (0..fleet_size)
            .map(|_| RobotSlot {
                tracker: SegmentProgressTracker::new(config.advance_policy),
                gate: SyncGate::new(),
            })
            .collect();

        Self {
            slots,
            steps: StepVector::new(fleet_size),
            stalls: StallMonitor::new(fleet_size, config.stall_pass_threshold),
            pass_count: 0,
            config,
        }
    }

    /// Feed a position sample for `robot`
    ///
    /// Runs a recomputation pass over the whole fleet when the robot's step
    /// changed.
    #[instrument(
        level = "trace",
        name = "sync_engine_position",
        skip(self, position),
        fields(x = position.x, y = position.y)
    )]
    pub fn on_position_update(
        &mut self,
        robot: RobotIndex,
        position: Point2,
    ) -> Result<Vec<PathReady>> {
        let fleet_size = self.fleet_size();
        let slot = self
            .slots
            .get_mut(robot)
            .ok_or(EngineError::UnknownRobot { robot, fleet_size })?;

        let update = slot.tracker.update(position);
        if !update.changed {
            self.observe_idle(robot);
            return Ok(Vec::new());
        }

        debug!(robot, step = update.step, "step advanced");
        metrics::counter!("route_sync_step_advances_total").increment(1);
        self.steps.set(robot, update.step);
        Ok(self.recompute_pass())
    }

    /// Assign a new plan to `robot` from paired segments and points
    ///
    /// Malformed input is rejected and the robot keeps its prior plan, step
    /// and cursor.
    #[instrument(
        level = "debug",
        name = "sync_engine_plan_assigned",
        skip(self, segments, points),
        fields(segments = segments.len(), points = points.len())
    )]
    pub fn on_plan_assigned(
        &mut self,
        robot: RobotIndex,
        segments: Vec<PathSegment>,
        points: Vec<SyncedPathPoint>,
    ) -> Result<Vec<PathReady>> {
        self.check_robot(robot)?;
        let plan = RobotPlan::new(segments, points)
            .map_err(|reason| EngineError::MalformedPlan { robot, reason })?;
        self.assign_plan(robot, plan)
    }

    /// Assign a new plan to `robot` from planner route segments
    #[instrument(
        level = "debug",
        name = "sync_engine_route_assigned",
        skip(self, route),
        fields(segments = route.len())
    )]
    pub fn on_route_assigned(
        &mut self,
        robot: RobotIndex,
        route: &[RouteSegment],
    ) -> Result<Vec<PathReady>> {
        self.check_robot(robot)?;
        let plan = RobotPlan::from_route(route)
            .map_err(|reason| EngineError::MalformedPlan { robot, reason })?;
        self.assign_plan(robot, plan)
    }

    /// Install an already validated plan
    pub fn assign_plan(&mut self, robot: RobotIndex, plan: RobotPlan) -> Result<Vec<PathReady>> {
        let fleet_size = self.fleet_size();
        let slot = self
            .slots
            .get_mut(robot)
            .ok_or(EngineError::UnknownRobot { robot, fleet_size })?;

        let (segments, points) = plan.into_parts();
        info!(robot, len = segments.len(), "plan assigned");

        slot.tracker.init(segments);
        slot.gate.init(points);
        self.steps.set(robot, 0);
        self.stalls.clear(robot);
        metrics::counter!("route_sync_plans_assigned_total").increment(1);

        Ok(self.recompute_pass())
    }

    /// Apply one event, logging instead of returning errors
    pub fn handle(&mut self, event: RouteEvent) -> Vec<PathReady> {
        let robot = event.robot();
        let kind = event.kind();

        let result = match event {
            RouteEvent::Position { robot, position } => self.on_position_update(robot, position),
            RouteEvent::Plan { robot, segments } => self.on_route_assigned(robot, &segments),
        };

        match result {
            Ok(ready) => ready,
            Err(err) => {
                warn!(robot, kind, error = %err, "event rejected");
                metrics::counter!("route_sync_events_rejected_total", "reason" => err.kind())
                    .increment(1);
                Vec::new()
            }
        }
    }

    /// Evaluate every robot's gate against the current step vector
    ///
    /// Robots are visited in ascending index order. Each robot whose frontier
    /// moved yields one `PathReady` carrying its whole released prefix.
    #[instrument(level = "debug", name = "sync_engine_recompute_pass", skip(self))]
    pub fn recompute_pass(&mut self) -> Vec<PathReady> {
        self.pass_count += 1;
        let pass_id = self.pass_count;

        let mut ready = Vec::new();
        let mut idle = Vec::new();

        for (robot, slot) in self.slots.iter_mut().enumerate() {
            if slot.gate.is_empty() {
                continue;
            }

            let delta = slot.gate.compute_unlocked_path(slot.gate.cursor(), &self.steps);
            if delta.is_empty() {
                idle.push(robot);
                continue;
            }

            slot.gate.advance(delta.len());
            self.stalls.clear(robot);

            let frontier = slot.gate.cursor();
            debug!(robot, newly_unlocked = delta.len(), frontier, "frontier moved");
            ready.push(PathReady {
                robot,
                path: slot.gate.released_path(),
                newly_unlocked: delta.len(),
                frontier,
                pass_id,
            });
        }

        for robot in idle {
            self.observe_idle(robot);
        }

        ready
    }

    /// Whether `robot` has consumed its released path and is held at a
    /// locked frontier
    pub fn is_waiting(&self, robot: RobotIndex) -> bool {
        match (self.slots.get(robot), self.steps.get(robot)) {
            (Some(slot), Some(step)) => {
                let cursor = slot.gate.cursor();
                cursor < slot.gate.len() && step >= cursor
            }
            _ => false,
        }
    }

    fn observe_idle(&mut self, robot: RobotIndex) {
        if !self.is_waiting(robot) {
            self.stalls.clear(robot);
            return;
        }
        if self.stalls.observe_waiting(robot) {
            self.report_stall(robot);
        }
    }

    fn report_stall(&mut self, robot: RobotIndex) {
        let Some(slot) = self.slots.get(robot) else {
            return;
        };
        let frontier = slot.gate.cursor();
        let blocking = slot.gate.blocking_preconditions(frontier, &self.steps);

        let partners: Vec<RobotIndex> = blocking
            .iter()
            .map(|precondition| precondition.robot_id)
            .filter(|&other| other != robot && self.blocks_on(other, robot))
            .collect();
        for &other in &partners {
            if self.stalls.mark_mutual(other) {
                metrics::counter!("route_sync_mutual_stalls_total").increment(1);
            }
        }

        let report = StallReport {
            robot,
            frontier,
            observations: self.stalls.waiting_for(robot),
            blocking,
            mutual_wait: !partners.is_empty(),
        };
        warn!(
            robot,
            frontier,
            observations = report.observations,
            blocking = ?report.blocking,
            mutual_wait = report.mutual_wait,
            "robot stalled at locked frontier"
        );
        metrics::counter!("route_sync_stalls_total").increment(1);
        if report.mutual_wait {
            metrics::counter!("route_sync_mutual_stalls_total").increment(1);
        }
        self.stalls.record(report);
    }

    /// Whether stalled robot `robot` waits on a precondition naming `on`
    fn blocks_on(&self, robot: RobotIndex, on: RobotIndex) -> bool {
        if !self.stalls.is_stalled(robot) {
            return false;
        }
        self.slots.get(robot).is_some_and(|slot| {
            slot.gate
                .blocking_preconditions(slot.gate.cursor(), &self.steps)
                .iter()
                .any(|precondition| precondition.robot_id == on)
        })
    }

    fn check_robot(&self, robot: RobotIndex) -> Result<()> {
        if robot < self.slots.len() {
            Ok(())
        } else {
            Err(EngineError::UnknownRobot {
                robot,
                fleet_size: self.slots.len(),
            })
        }
    }

    pub fn fleet_size(&self) -> usize {
        self.slots.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn step(&self, robot: RobotIndex) -> Option<usize> {
        self.steps.get(robot)
    }

    pub fn steps(&self) -> &StepVector {
        &self.steps
    }

    /// Number of released points of the robot's current plan
    pub fn cursor(&self, robot: RobotIndex) -> Option<usize> {
        self.slots.get(robot).map(|slot| slot.gate.cursor())
    }

    /// Length of the robot's current plan, `Some(0)` before any assignment
    pub fn plan_len(&self, robot: RobotIndex) -> Option<usize> {
        self.slots.get(robot).map(|slot| slot.gate.len())
    }

    pub fn released_path(&self, robot: RobotIndex) -> Option<Vec<Pose3>> {
        self.slots.get(robot).map(|slot| slot.gate.released_path())
    }

    pub fn pass_count(&self) -> u64 {
        self.pass_count
    }

    pub fn stalled_robots(&self) -> Vec<RobotIndex> {
        self.stalls.stalled_robots()
    }

    pub fn stall_report(&self, robot: RobotIndex) -> Option<&StallReport> {
        self.stalls.report(robot)
    }
}
