use mission_lib::{Pose, Waypoint};
use std::time::Instant;
use tracing::{debug, info};

/// Progress through the active waypoint list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionProgress {
    pub current_waypoint_index: usize,
    pub reached: bool,
    pub reached_at: Option<Instant>,
}

/// Outcome of one navigator update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStatus {
    /// Current waypoint not reached yet
    EnRoute,
    /// Waypoint reached, waiting out its holdtime
    Dwelling,
    /// Waypoint completed, moved on to the next one
    Advanced,
    /// Every waypoint completed
    Complete,
}

/// Waypoint list traversal with reached detection and dwell timing.
///
/// Relative waypoints are resolved against the starting pose each time a
/// target is read, so a starting pose recorded after the list was loaded is
/// still honored.
#[derive(Debug)]
pub struct Navigator {
    waypoints: Vec<Waypoint>,
    relative: bool,
    index: usize,
    reached_at: Option<Instant>,
    position_threshold: f64,
    yaw_threshold: f64,
}

impl Navigator {
    pub fn new(position_threshold: f64, yaw_threshold: f64) -> Self {
        Self {
            waypoints: Vec::new(),
            relative: false,
            index: 0,
            reached_at: None,
            position_threshold,
            yaw_threshold,
        }
    }

    pub fn load(&mut self, waypoints: Vec<Waypoint>, relative: bool) {
        info!(
            "Loaded {} {} waypoint(s)",
            waypoints.len(),
            if relative { "relative" } else { "absolute" }
        );
        self.waypoints = waypoints;
        self.relative = relative;
        self.index = 0;
        self.reached_at = None;
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.index = 0;
        self.reached_at = None;
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    pub fn progress(&self) -> MissionProgress {
        MissionProgress {
            current_waypoint_index: self.index,
            reached: self.reached_at.is_some(),
            reached_at: self.reached_at,
        }
    }

    pub fn current_target(&self, start: &Pose) -> Option<Pose> {
        self.waypoints
            .get(self.index)
            .map(|waypoint| waypoint.target(start, self.relative))
    }

    /// Whether `current` is within both thresholds of the current target.
    /// Pure: calling it never changes navigation state.
    pub fn is_reached(&self, current: &Pose, start: &Pose) -> bool {
        match self.current_target(start) {
            Some(target) => {
                current.distance_to(&target) <= self.position_threshold
                    && current.yaw_error_to(&target) <= self.yaw_threshold
            }
            None => false,
        }
    }

    pub fn update(&mut self, current: &Pose, start: &Pose, now: Instant) -> NavigationStatus {
        let Some(waypoint) = self.waypoints.get(self.index).copied() else {
            return NavigationStatus::Complete;
        };

        let reached_at = match self.reached_at {
            Some(at) => at,
            None if self.is_reached(current, start) => {
                info!(
                    "Reached waypoint {}/{}, holding for {:.1} s",
                    self.index + 1,
                    self.waypoints.len(),
                    waypoint.holdtime
                );
                self.reached_at = Some(now);
                now
            }
            None => return NavigationStatus::EnRoute,
        };

        let dwell = now.saturating_duration_since(reached_at).as_secs_f64();
        if dwell < waypoint.holdtime {
            return NavigationStatus::Dwelling;
        }

        debug!("Waypoint {} completed after {:.2} s", self.index + 1, dwell);
        self.index += 1;
        self.reached_at = None;

        if self.is_complete() {
            NavigationStatus::Complete
        } else {
            info!("Next waypoint {}/{}", self.index + 1, self.waypoints.len());
            NavigationStatus::Advanced
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn navigator(waypoints: Vec<Waypoint>, relative: bool) -> Navigator {
        let mut nav = Navigator::new(0.3, 0.1);
        nav.load(waypoints, relative);
        nav
    }

    #[test]
    fn test_relative_resolution_adds_offsets_to_start() {
        let nav = navigator(vec![Waypoint::new(1.0, 2.0, 0.0, 0.0, 0.0)], true);
        let target = nav.current_target(&Pose::origin()).unwrap();
        assert_eq!(target, Pose::new(1.0, 2.0, 0.0, 0.0));

        let moved_start = Pose::new(10.0, -5.0, 1.0, 0.5);
        let target = nav.current_target(&moved_start).unwrap();
        assert_eq!(target.position, [11.0, -3.0, 1.0]);
        assert!((target.yaw - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_absolute_resolution_ignores_start() {
        let nav = navigator(vec![Waypoint::new(1.0, 2.0, 3.0, 0.2, 0.0)], false);
        let target = nav.current_target(&Pose::new(10.0, 10.0, 10.0, 1.0)).unwrap();
        assert_eq!(target, Pose::new(1.0, 2.0, 3.0, 0.2));
    }

    #[test]
    fn test_reached_requires_position_and_yaw() {
        let nav = navigator(vec![Waypoint::new(0.0, 0.0, 1.0, 0.0, 0.0)], false);
        let start = Pose::origin();

        assert!(nav.is_reached(&Pose::new(0.1, 0.1, 1.1, 0.05), &start));
        assert!(!nav.is_reached(&Pose::new(0.5, 0.0, 1.0, 0.0), &start));
        assert!(!nav.is_reached(&Pose::new(0.0, 0.0, 1.0, 0.5), &start));
    }

    #[test]
    fn test_yaw_error_is_wrapped() {
        let nav = navigator(vec![Waypoint::new(0.0, 0.0, 0.0, 3.1, 0.0)], false);
        // -3.1 rad is only ~0.08 rad away from 3.1 rad going through ±π
        assert!(nav.is_reached(&Pose::new(0.0, 0.0, 0.0, -3.1), &Pose::origin()));
    }

    #[test]
    fn test_dwell_before_completion() {
        let mut nav = navigator(vec![Waypoint::new(0.0, 0.0, 1.0, 0.0, 2.0)], false);
        let start = Pose::origin();
        let at_target = Pose::new(0.0, 0.0, 1.0, 0.0);
        let t0 = Instant::now();

        assert_eq!(nav.update(&start, &start, t0), NavigationStatus::EnRoute);
        assert_eq!(nav.update(&at_target, &start, t0), NavigationStatus::Dwelling);
        assert_eq!(nav.progress().reached_at, Some(t0));

        let t1 = t0 + Duration::from_millis(1500);
        assert_eq!(nav.update(&at_target, &start, t1), NavigationStatus::Dwelling);
        assert_eq!(nav.progress().current_waypoint_index, 0);

        let t2 = t0 + Duration::from_secs(2);
        assert_eq!(nav.update(&at_target, &start, t2), NavigationStatus::Complete);
        assert!(nav.is_complete());
    }

    #[test]
    fn test_reached_is_idempotent_while_dwelling() {
        let mut nav = navigator(
            vec![
                Waypoint::new(0.0, 0.0, 1.0, 0.0, 5.0),
                Waypoint::new(1.0, 0.0, 1.0, 0.0, 0.0),
            ],
            false,
        );
        let start = Pose::origin();
        let at_target = Pose::new(0.0, 0.0, 1.0, 0.0);
        let t0 = Instant::now();

        nav.update(&at_target, &start, t0);
        for i in 1..5 {
            assert!(nav.is_reached(&at_target, &start));
            let now = t0 + Duration::from_secs(i);
            assert_eq!(nav.update(&at_target, &start, now), NavigationStatus::Dwelling);
            assert_eq!(nav.progress().current_waypoint_index, 0);
            assert_eq!(nav.progress().reached_at, Some(t0));
        }

        let t5 = t0 + Duration::from_secs(5);
        assert_eq!(nav.update(&at_target, &start, t5), NavigationStatus::Advanced);
        assert_eq!(nav.progress().current_waypoint_index, 1);
        assert!(!nav.progress().reached);
    }

    #[test]
    fn test_zero_holdtime_completes_on_reach() {
        let mut nav = navigator(vec![Waypoint::new(0.0, 0.0, 0.0, 0.0, 0.0)], true);
        let start = Pose::origin();
        assert_eq!(nav.update(&start, &start, Instant::now()), NavigationStatus::Complete);
    }

    #[test]
    fn test_empty_list_is_complete() {
        let mut nav = navigator(Vec::new(), false);
        assert!(nav.is_complete());
        assert_eq!(nav.current_target(&Pose::origin()), None);
        assert_eq!(
            nav.update(&Pose::origin(), &Pose::origin(), Instant::now()),
            NavigationStatus::Complete
        );
    }

    #[test]
    fn test_clear_resets_progress() {
        let mut nav = navigator(vec![Waypoint::new(0.0, 0.0, 0.0, 0.0, 10.0)], false);
        nav.update(&Pose::origin(), &Pose::origin(), Instant::now());
        assert!(nav.progress().reached);

        nav.clear();
        assert_eq!(nav.len(), 0);
        assert_eq!(nav.progress().current_waypoint_index, 0);
        assert!(!nav.progress().reached);
    }
}
