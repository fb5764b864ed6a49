//! Position-to-step progress tracking.
//!
//! A robot's step is the index of the segment whose goal it is heading for.
//! Reaching that goal (within the segment width) moves it to the next one.

use contracts::{AdvancePolicy, PathSegment, Point2};
use nalgebra::Vector2;

/// Result of feeding one position sample to a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepUpdate {
    pub step: usize,
    pub changed: bool,
}

/// Per-robot segment progress tracker
#[derive(Debug, Clone, Default)]
pub struct SegmentProgressTracker {
    segments: Vec<PathSegment>,
    current_step: usize,
    policy: AdvancePolicy,
}

impl SegmentProgressTracker {
    pub fn new(policy: AdvancePolicy) -> Self {
        Self {
            segments: Vec::new(),
            current_step: 0,
            policy,
        }
    }

    /// Replace the segment sequence and restart at step 0
    ///
    /// An empty sequence is ignored.
    pub fn init(&mut self, segments: Vec<PathSegment>) {
        if segments.is_empty() {
            return;
        }
        self.segments = segments;
        self.current_step = 0;
    }

    /// Feed one position sample
    pub fn update(&mut self, position: Point2) -> StepUpdate {
        if self.segments.is_empty() {
            return StepUpdate {
                step: 0,
                changed: false,
            };
        }

        let before = self.current_step;
        while self.current_step + 1 < self.segments.len()
            && within_goal(&self.segments[self.current_step], position)
        {
            self.current_step += 1;
            if self.policy == AdvancePolicy::SingleStep {
                break;
            }
        }

        StepUpdate {
            step: self.current_step,
            changed: self.current_step != before,
        }
    }

    #[inline]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.policy
    }
}

fn within_goal(segment: &PathSegment, position: Point2) -> bool {
    let offset = Vector2::new(position.x - segment.goal.x, position.y - segment.goal.y);
    offset.norm() <= segment.width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(len: usize, width: f64) -> Vec<PathSegment> {
        (0..len)
            .map(|i| {
                PathSegment::new(
                    Point2::new(i as f64, 0.0),
                    Point2::new(i as f64 + 1.0, 0.0),
                    width,
                )
            })
            .collect()
    }

    #[test]
    fn test_advances_one_step_per_goal() {
        let mut tracker = SegmentProgressTracker::new(AdvancePolicy::SingleStep);
        tracker.init(straight(3, 0.5));

        let update = tracker.update(Point2::new(0.2, 0.0));
        assert_eq!(update, StepUpdate { step: 0, changed: false });

        let update = tracker.update(Point2::new(1.0, 0.0));
        assert_eq!(update, StepUpdate { step: 1, changed: true });

        let update = tracker.update(Point2::new(2.3, 0.1));
        assert_eq!(update, StepUpdate { step: 2, changed: true });
    }

    #[test]
    fn test_stops_at_last_index() {
        let mut tracker = SegmentProgressTracker::new(AdvancePolicy::SingleStep);
        tracker.init(straight(2, 0.5));

        assert!(tracker.update(Point2::new(1.0, 0.0)).changed);
        let update = tracker.update(Point2::new(2.0, 0.0));
        assert_eq!(update, StepUpdate { step: 1, changed: false });
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let mut tracker = SegmentProgressTracker::new(AdvancePolicy::SingleStep);
        tracker.init(straight(2, 0.5));
        assert!(tracker.update(Point2::new(1.0, 0.5)).changed);
    }

    #[test]
    fn test_later_goal_does_not_skip() {
        let mut tracker = SegmentProgressTracker::new(AdvancePolicy::MultiStep);
        tracker.init(straight(4, 0.5));

        // Sitting on goal 2 while still heading for goal 0
        let update = tracker.update(Point2::new(3.0, 0.0));
        assert_eq!(update, StepUpdate { step: 0, changed: false });
    }

    #[test]
    fn test_multi_step_policy_chains_overlapping_goals() {
        let segments = vec![
            PathSegment::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), 0.6),
            PathSegment::new(Point2::new(1.0, 0.0), Point2::new(1.5, 0.0), 0.6),
            PathSegment::new(Point2::new(1.5, 0.0), Point2::new(5.0, 0.0), 0.6),
            PathSegment::new(Point2::new(5.0, 0.0), Point2::new(6.0, 0.0), 0.6),
        ];

        let mut single = SegmentProgressTracker::new(AdvancePolicy::SingleStep);
        single.init(segments.clone());
        assert_eq!(single.update(Point2::new(1.2, 0.0)).step, 1);

        let mut multi = SegmentProgressTracker::new(AdvancePolicy::MultiStep);
        multi.init(segments);
        assert_eq!(multi.update(Point2::new(1.2, 0.0)).step, 2);
    }

    #[test]
    fn test_empty_plan() {
        let mut tracker = SegmentProgressTracker::default();
        assert_eq!(
            tracker.update(Point2::new(1.0, 0.0)),
            StepUpdate { step: 0, changed: false }
        );

        tracker.init(straight(2, 0.5));
        tracker.update(Point2::new(1.0, 0.0));
        tracker.init(Vec::new());
        assert_eq!(tracker.current_step(), 1);
        assert_eq!(tracker.segment_count(), 2);
    }

    #[test]
    fn test_init_resets_step() {
        let mut tracker = SegmentProgressTracker::default();
        tracker.init(straight(3, 0.5));
        tracker.update(Point2::new(1.0, 0.0));
        assert_eq!(tracker.current_step(), 1);

        tracker.init(straight(3, 0.5));
        assert_eq!(tracker.current_step(), 0);
    }

    #[test]
    fn test_step_never_decreases() {
        let mut tracker = SegmentProgressTracker::new(AdvancePolicy::MultiStep);
        tracker.init(straight(5, 0.4));

        let samples = [
            (1.0, 0.0),
            (0.0, 0.0),
            (2.1, 0.2),
            (-3.0, 9.0),
            (1.0, 0.0),
            (3.0, 0.0),
            (4.0, 0.0),
            (5.0, 0.0),
            (0.0, 0.0),
        ];
        let mut last = tracker.current_step();
        for (x, y) in samples {
            let update = tracker.update(Point2::new(x, y));
            assert!(update.step >= last);
            assert!(update.step < 5);
            last = update.step;
        }
        assert_eq!(last, 4);
    }
}
