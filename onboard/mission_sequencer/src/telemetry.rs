//! Telemetry ingestion.
//!
//! Samples arrive between ticks and land in latest-value cells; the tick
//! loop drains them into the [`TelemetryTracker`], which owns the snapshot
//! and the per-feed validity flags.

use mission_lib::{ExtendedVehicleState, LandedState, MissionRequest, Pose, VehicleState};
use tracing::{debug, info};

/// Latest-value cell: a write replaces the previous sample, a take empties it
#[derive(Debug)]
pub struct Latest<T> {
    value: Option<T>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Latest<T> {
    /// Store a sample. Returns true if an unread sample was overwritten.
    pub fn put(&mut self, value: T) -> bool {
        self.value.replace(value).is_some()
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }
}

/// Everything received since the previous tick
#[derive(Debug, Default)]
pub struct Inbox {
    pub vehicle_state: Latest<VehicleState>,
    pub extended_state: Latest<ExtendedVehicleState>,
    pub pose: Latest<Pose>,
    pub requests: Vec<MissionRequest>,
}

/// Latest validated vehicle snapshot.
///
/// A feed becomes valid on its first sample and stays valid.
#[derive(Debug)]
pub struct TelemetryTracker {
    vehicle_state: Option<VehicleState>,
    extended_state: Option<ExtendedVehicleState>,
    current_pose: Option<Pose>,
    starting_pose: Option<Pose>,
    capture_pending: bool,
}

impl Default for TelemetryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTracker {
    pub fn new() -> Self {
        Self {
            vehicle_state: None,
            extended_state: None,
            current_pose: None,
            starting_pose: None,
            // the very first pose also serves as starting pose
            capture_pending: true,
        }
    }

    /// Drain pending samples from the inbox. Requests are left in place.
    pub fn apply(&mut self, inbox: &mut Inbox) {
        if let Some(state) = inbox.vehicle_state.take() {
            self.apply_vehicle_state(state);
        }
        if let Some(state) = inbox.extended_state.take() {
            self.apply_extended_state(state);
        }
        if let Some(pose) = inbox.pose.take() {
            self.apply_pose(pose);
        }
    }

    pub fn apply_vehicle_state(&mut self, state: VehicleState) {
        if self.vehicle_state.is_none() {
            info!("First vehicle state received (mode {})", state.mode);
        }
        self.vehicle_state = Some(state);
    }

    pub fn apply_extended_state(&mut self, state: ExtendedVehicleState) {
        if self.extended_state.is_none() {
            info!("First extended vehicle state received ({:?})", state.landed_state);
        }
        self.extended_state = Some(state);
    }

    pub fn apply_pose(&mut self, pose: Pose) {
        if self.capture_pending {
            info!(
                "Starting pose recorded: ({:.2}, {:.2}, {:.2}), yaw {:.2} rad",
                pose.position[0], pose.position[1], pose.position[2], pose.yaw
            );
            self.starting_pose = Some(pose);
            self.capture_pending = false;
        }
        self.current_pose = Some(pose);
    }

    /// Forget the starting pose; the next pose sample replaces it.
    pub fn begin_mission_capture(&mut self) {
        debug!("Waiting for next pose sample to record starting pose");
        self.starting_pose = None;
        self.capture_pending = true;
    }

    pub fn state_valid(&self) -> bool {
        self.vehicle_state.is_some()
    }

    pub fn extended_state_valid(&self) -> bool {
        self.extended_state.is_some()
    }

    pub fn pose_valid(&self) -> bool {
        self.current_pose.is_some()
    }

    pub fn armed(&self) -> bool {
        self.vehicle_state.as_ref().is_some_and(|s| s.armed)
    }

    /// False only when a valid state explicitly reports a lost link
    pub fn connected(&self) -> bool {
        self.vehicle_state.as_ref().map_or(true, |s| s.connected)
    }

    pub fn mode(&self) -> Option<&str> {
        self.vehicle_state.as_ref().map(|s| s.mode.as_str())
    }

    pub fn landed_state(&self) -> Option<LandedState> {
        self.extended_state.as_ref().map(|s| s.landed_state)
    }

    pub fn current_pose(&self) -> Option<Pose> {
        self.current_pose
    }

    pub fn starting_pose(&self) -> Option<Pose> {
        self.starting_pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_keeps_only_newest_sample() {
        let mut cell = Latest::default();
        assert!(!cell.put(1));
        assert!(cell.put(2));
        assert_eq!(cell.take(), Some(2));
        assert_eq!(cell.take(), None);
    }

    #[test]
    fn test_feeds_become_valid_independently() {
        let mut tracker = TelemetryTracker::new();
        assert!(!tracker.state_valid());
        assert!(!tracker.extended_state_valid());
        assert!(!tracker.pose_valid());

        tracker.apply_pose(Pose::origin());
        assert!(tracker.pose_valid());
        assert!(!tracker.state_valid());
        assert!(!tracker.armed());

        tracker.apply_vehicle_state(VehicleState::new(true, "OFFBOARD", true));
        assert!(tracker.state_valid());
        assert!(tracker.armed());
        assert_eq!(tracker.mode(), Some("OFFBOARD"));
        assert_eq!(tracker.landed_state(), None);
    }

    #[test]
    fn test_starting_pose_captured_once_per_mission() {
        let mut tracker = TelemetryTracker::new();
        tracker.apply_pose(Pose::new(1.0, 0.0, 0.0, 0.0));
        tracker.apply_pose(Pose::new(2.0, 0.0, 0.0, 0.0));
        assert_eq!(tracker.starting_pose(), Some(Pose::new(1.0, 0.0, 0.0, 0.0)));

        tracker.begin_mission_capture();
        assert_eq!(tracker.starting_pose(), None);
        tracker.apply_pose(Pose::new(3.0, 0.0, 0.0, 0.0));
        tracker.apply_pose(Pose::new(4.0, 0.0, 0.0, 0.0));
        assert_eq!(tracker.starting_pose(), Some(Pose::new(3.0, 0.0, 0.0, 0.0)));
        assert_eq!(tracker.current_pose(), Some(Pose::new(4.0, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_apply_drains_samples_but_not_requests() {
        let mut tracker = TelemetryTracker::new();
        let mut inbox = Inbox::default();
        inbox.pose.put(Pose::origin());
        inbox.pose.put(Pose::new(0.5, 0.0, 0.0, 0.0));
        inbox
            .extended_state
            .put(ExtendedVehicleState::new(LandedState::OnGround));
        inbox.requests.push(MissionRequest::new(1, 1, mission_lib::RequestType::Arm));

        tracker.apply(&mut inbox);

        assert_eq!(tracker.current_pose(), Some(Pose::new(0.5, 0.0, 0.0, 0.0)));
        assert_eq!(tracker.landed_state(), Some(LandedState::OnGround));
        assert!(inbox.pose.take().is_none());
        assert_eq!(inbox.requests.len(), 1);
    }

    #[test]
    fn test_connected_defaults_to_true_until_reported() {
        let mut tracker = TelemetryTracker::new();
        assert!(tracker.connected());
        tracker.apply_vehicle_state(VehicleState::new(false, "MANUAL", false));
        assert!(!tracker.connected());
    }
}
