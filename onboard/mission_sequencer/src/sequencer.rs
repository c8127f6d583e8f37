//! Mission sequencer state machine.
//!
//! | Phase     | Tick behavior                                   | Leaves to                          |
//! |-----------|-------------------------------------------------|------------------------------------|
//! | `Idle`    | nothing; waits for ARM with valid telemetry      | `Prearm`                           |
//! | `Prearm`  | request offboard mode, then arm                  | `Arm`, `Idle` on timeout           |
//! | `Arm`     | hold the starting pose                           | `Mission`, `Disarm`                |
//! | `Mission` | follow waypoints                                 | `Hold`, `Land`, `Disarm`           |
//! | `Hold`    | keep the setpoint fixed                          | `Mission`, `Land`, `Disarm`        |
//! | `Land`    | land, wait for touchdown                         | `Disarm`                           |
//! | `Disarm`  | disarm, wait for confirmation                    | `Idle`                             |
//!
//! The sequencer owns every piece of mission state and is driven only by
//! [`MissionSequencer::tick`], which turns the samples and requests received
//! since the previous tick into the outputs to publish.

use mission_lib::{
    CommandClass, LandedState, MissionRequest, MissionResponse, Phase, Pose, PoseSetpoint,
    RequestType, SequencerConfig, VehicleCommand, Waypoint,
};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::dispatcher::CommandDispatcher;
use crate::navigator::{MissionProgress, NavigationStatus, Navigator};
use crate::publisher::TickOutput;
use crate::telemetry::{Inbox, TelemetryTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissionKind {
    Takeoff,
    Waypoints,
}

pub struct MissionSequencer {
    config: SequencerConfig,
    phase: Phase,
    telemetry: TelemetryTracker,
    navigator: Navigator,
    dispatcher: CommandDispatcher,
    setpoint: Option<Pose>,
    /// Accepted request whose terminal response is still owed
    active: Option<MissionRequest>,
    /// ARM request waiting for pose and state feeds to become valid, and when it arrived
    held_arm: Option<(MissionRequest, Instant)>,
    mission_kind: MissionKind,
    force_disarm: bool,
}

impl MissionSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        let navigator = Navigator::new(config.position_threshold, config.yaw_threshold);
        Self {
            config,
            phase: Phase::Idle,
            telemetry: TelemetryTracker::new(),
            navigator,
            dispatcher: CommandDispatcher::new(),
            setpoint: None,
            active: None,
            held_arm: None,
            mission_kind: MissionKind::Waypoints,
            force_disarm: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn setpoint(&self) -> Option<Pose> {
        self.setpoint
    }

    pub fn progress(&self) -> MissionProgress {
        self.navigator.progress()
    }

    /// Run one control-loop tick.
    pub fn tick(&mut self, inbox: &mut Inbox, now: Instant) -> TickOutput {
        let mut out = TickOutput::default();

        self.telemetry.apply(inbox);
        self.dispatcher.confirm(&self.telemetry, &self.config.offboard_mode);

        // ABORT wins over anything else queued for this tick
        let mut requests = std::mem::take(&mut inbox.requests);
        requests.sort_by_key(|r| r.request != RequestType::Abort);

        let phase_before = self.phase;
        for request in requests {
            self.handle_request(request, now, &mut out);
        }

        // A phase entered by a request this tick already ran its entry actions
        if self.phase == phase_before {
            self.execute(now, &mut out);
        }

        if self.phase.commands_setpoint() {
            out.setpoint = self.setpoint.map(PoseSetpoint::new);
        }
        out.commands = self.dispatcher.drain();
        out
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    fn handle_request(&mut self, request: MissionRequest, now: Instant, out: &mut TickOutput) {
        info!(
            "Request #{} for mission {}: {:?} (phase {})",
            request.request_number, request.mission_id, request.request, self.phase
        );

        match (self.phase, request.request) {
            (Phase::Idle | Phase::Disarm, RequestType::Abort) => {
                self.reject(request, "nothing to abort", out);
            }
            (_, RequestType::Abort) => {
                self.supersede_active("aborted", out);
                out.responses.push(MissionResponse::accepted(&request));
                self.active = Some(request);
                self.force_disarm = true;
                self.transition(Phase::Disarm, now);
            }
            (Phase::Idle, RequestType::Arm) => {
                if self.telemetry_ready() {
                    self.start_arming(request, now, out);
                } else {
                    info!("Telemetry not ready, holding ARM request until it is");
                    if let Some((previous, _)) = self.held_arm.replace((request, now)) {
                        self.reject(previous, "superseded by a newer ARM request", out);
                    }
                }
            }
            (Phase::Arm, RequestType::Takeoff) => match request.waypoints.clone() {
                Some(waypoints) => {
                    let relative = self.config.relative_waypoints;
                    self.start_mission(request, waypoints, relative, MissionKind::Waypoints, now, out);
                }
                None => {
                    let climb = Waypoint::new(0.0, 0.0, self.config.takeoff_height, 0.0, 0.0);
                    self.start_mission(request, vec![climb], true, MissionKind::Takeoff, now, out);
                }
            },
            (Phase::Arm | Phase::Hold, RequestType::StartMission) => {
                let waypoints = request.waypoints.clone().unwrap_or_default();
                let relative = self.config.relative_waypoints;
                self.start_mission(request, waypoints, relative, MissionKind::Waypoints, now, out);
            }
            (Phase::Mission, RequestType::Hold) => {
                out.responses.push(MissionResponse::completed(&request));
                self.transition(Phase::Hold, now);
            }
            (Phase::Hold, RequestType::Resume) => {
                if self.navigator.is_complete() {
                    self.reject(request, "no remaining waypoints to resume", out);
                } else {
                    out.responses.push(MissionResponse::completed(&request));
                    self.transition(Phase::Mission, now);
                }
            }
            (Phase::Mission | Phase::Hold, RequestType::Land) => {
                self.supersede_active("interrupted by LAND", out);
                out.responses.push(MissionResponse::accepted(&request));
                self.active = Some(request);
                self.transition(Phase::Land, now);
            }
            (Phase::Arm, RequestType::Disarm) => {
                self.supersede_active("interrupted by DISARM", out);
                out.responses.push(MissionResponse::accepted(&request));
                self.active = Some(request);
                self.force_disarm = false;
                self.transition(Phase::Disarm, now);
            }
            (phase, kind) => {
                let reason = format!("{:?} not allowed in {}", kind, phase);
                self.reject(request, reason, out);
            }
        }
    }

    fn reject(&mut self, request: MissionRequest, reason: impl Into<String>, out: &mut TickOutput) {
        let reason = reason.into();
        warn!(
            "Rejected request #{} ({:?}): {}",
            request.request_number, request.request, reason
        );
        out.responses.push(MissionResponse::rejected(&request, reason));
    }

    /// Close out the in-progress request with a failure before replacing it
    fn supersede_active(&mut self, reason: &str, out: &mut TickOutput) {
        if let Some(previous) = self.active.take() {
            warn!(
                "Request #{} ({:?}) {}",
                previous.request_number, previous.request, reason
            );
            out.responses.push(MissionResponse::failed(&previous, reason));
        }
    }

    fn telemetry_ready(&self) -> bool {
        self.telemetry.pose_valid() && self.telemetry.state_valid()
    }

    fn start_arming(&mut self, request: MissionRequest, now: Instant, out: &mut TickOutput) {
        out.responses.push(MissionResponse::accepted(&request));
        self.active = Some(request);
        self.transition(Phase::Prearm, now);
    }

    fn start_mission(
        &mut self,
        request: MissionRequest,
        waypoints: Vec<Waypoint>,
        relative: bool,
        kind: MissionKind,
        now: Instant,
        out: &mut TickOutput,
    ) {
        if waypoints.is_empty() {
            info!("Empty waypoint list, nothing to fly");
            out.responses.push(MissionResponse::completed(&request));
            return;
        }

        self.supersede_active("replaced by a new mission", out);
        self.navigator.load(waypoints, relative);
        self.mission_kind = kind;
        out.responses.push(MissionResponse::accepted(&request));
        self.active = Some(request);
        self.transition(Phase::Mission, now);
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    /// Pose relative waypoints are resolved against
    fn reference_pose(&self) -> Pose {
        self.telemetry
            .starting_pose()
            .or(self.telemetry.current_pose())
            .unwrap_or_else(Pose::origin)
    }

    fn transition(&mut self, next: Phase, now: Instant) {
        info!("Phase {} -> {}", self.phase, next);
        self.phase = next;

        match next {
            Phase::Idle => {
                self.navigator.clear();
                self.dispatcher.reset();
                self.setpoint = None;
                self.force_disarm = false;
            }
            Phase::Prearm => {
                self.navigator.clear();
                self.telemetry.begin_mission_capture();
                self.setpoint = self.telemetry.current_pose();
                self.request_offboard_or_arm(now);
            }
            Phase::Arm => {
                if let Some(start) = self.telemetry.starting_pose() {
                    self.setpoint = Some(start);
                }
            }
            Phase::Mission => {
                let start = self.reference_pose();
                if let Some(target) = self.navigator.current_target(&start) {
                    self.setpoint = Some(target);
                }
            }
            Phase::Hold => {
                if self.setpoint.is_none() {
                    self.setpoint = self.telemetry.current_pose();
                }
            }
            Phase::Land => {
                self.dispatcher.issue(VehicleCommand::new_land(), now);
            }
            Phase::Disarm => {
                self.dispatcher
                    .issue(VehicleCommand::new_disarm(self.force_disarm), now);
            }
        }
    }

    fn execute(&mut self, now: Instant, out: &mut TickOutput) {
        match self.phase {
            Phase::Idle => self.execute_idle(now, out),
            Phase::Prearm => self.execute_prearm(now, out),
            Phase::Arm => self.execute_arm(now),
            Phase::Mission => self.execute_mission(now, out),
            Phase::Hold => {}
            Phase::Land => self.execute_land(now, out),
            Phase::Disarm => self.execute_disarm(now, out),
        }
    }

    fn execute_idle(&mut self, now: Instant, out: &mut TickOutput) {
        let Some(held_at) = self.held_arm.as_ref().map(|(_, at)| *at) else {
            return;
        };

        // A stale ARM must not arm the vehicle long after it was asked for
        if now.saturating_duration_since(held_at) >= self.config.arm_timeout() {
            if let Some((request, _)) = self.held_arm.take() {
                self.reject(request, "telemetry not ready within the arm timeout", out);
            }
        } else if self.telemetry_ready() {
            if let Some((request, _)) = self.held_arm.take() {
                info!("Telemetry ready, acting on held ARM request");
                self.start_arming(request, now, out);
            }
        }
    }

    fn request_offboard_or_arm(&mut self, now: Instant) {
        let offboard = self.config.offboard_mode.as_str();
        if self.telemetry.mode() != Some(offboard) {
            self.dispatcher.issue(VehicleCommand::new_set_mode(offboard), now);
        } else if !self.telemetry.armed() {
            self.dispatcher.issue(VehicleCommand::new_arm(), now);
        }
    }

    fn execute_prearm(&mut self, now: Instant, out: &mut TickOutput) {
        if let Some(start) = self.telemetry.starting_pose() {
            self.setpoint = Some(start);
        }

        let offboard = self.telemetry.mode() == Some(self.config.offboard_mode.as_str());
        if offboard && self.telemetry.armed() {
            info!("Vehicle armed in {}", self.config.offboard_mode);
            self.dispatcher.resolve(CommandClass::SetMode);
            self.dispatcher.resolve(CommandClass::Arm);
            if let Some(request) = self.active.take() {
                out.responses.push(MissionResponse::completed(&request));
            }
            self.transition(Phase::Arm, now);
            return;
        }

        if self
            .dispatcher
            .has_timed_out(CommandClass::SetMode, now, self.config.mode_timeout())
        {
            self.fail_arming("offboard mode request timed out", now, out);
            return;
        }
        if self
            .dispatcher
            .has_timed_out(CommandClass::Arm, now, self.config.arm_timeout())
        {
            self.fail_arming("arm request timed out", now, out);
            return;
        }

        self.request_offboard_or_arm(now);
    }

    fn fail_arming(&mut self, reason: &str, now: Instant, out: &mut TickOutput) {
        warn!("Arming failed: {}", reason);
        if let Some(request) = self.active.take() {
            out.responses.push(MissionResponse::failed(&request, reason));
        }
        self.transition(Phase::Idle, now);
    }

    fn execute_arm(&mut self, now: Instant) {
        if !self.telemetry.armed() && !self.dispatcher.is_outstanding(CommandClass::Arm) {
            warn!("Vehicle reports disarmed while in ARM, returning to IDLE");
            self.transition(Phase::Idle, now);
            return;
        }
        if let Some(start) = self.telemetry.starting_pose() {
            self.setpoint = Some(start);
        }
    }

    fn execute_mission(&mut self, now: Instant, out: &mut TickOutput) {
        if !self.telemetry.connected() {
            warn!("Vehicle connection lost during mission, holding");
            self.transition(Phase::Hold, now);
            return;
        }

        let Some(current) = self.telemetry.current_pose() else {
            return;
        };
        let start = self.reference_pose();

        match self.navigator.update(&current, &start, now) {
            NavigationStatus::Complete => {
                self.finish_mission(now, out);
                return;
            }
            NavigationStatus::Advanced => {
                debug!("Progress: {:?}", self.navigator.progress());
            }
            NavigationStatus::EnRoute | NavigationStatus::Dwelling => {}
        }

        if let Some(target) = self.navigator.current_target(&start) {
            self.setpoint = Some(target);
        }
    }

    fn finish_mission(&mut self, now: Instant, out: &mut TickOutput) {
        info!("Mission complete ({} waypoint(s))", self.navigator.len());
        if let Some(request) = self.active.take() {
            out.responses.push(MissionResponse::completed(&request));
        }

        if self.config.auto_land && self.mission_kind == MissionKind::Waypoints {
            self.transition(Phase::Land, now);
        } else {
            self.transition(Phase::Hold, now);
        }
    }

    fn execute_land(&mut self, now: Instant, out: &mut TickOutput) {
        if !self.telemetry.extended_state_valid() {
            debug!("No landed state yet, relying on the land timeout");
        }
        if self.telemetry.landed_state() == Some(LandedState::OnGround) {
            info!("Landed");
            self.dispatcher.resolve(CommandClass::Land);
            if let Some(request) = self.active.take() {
                out.responses.push(MissionResponse::completed(&request));
            }
            self.force_disarm = false;
            self.transition(Phase::Disarm, now);
            return;
        }

        if self
            .dispatcher
            .has_timed_out(CommandClass::Land, now, self.config.land_timeout())
        {
            warn!("Landing not confirmed in time, disarming anyway");
            self.dispatcher.resolve(CommandClass::Land);
            if let Some(request) = self.active.take() {
                out.responses.push(MissionResponse::completed_with_warning(
                    &request,
                    "land request timed out",
                ));
            }
            self.force_disarm = false;
            self.transition(Phase::Disarm, now);
        }
    }

    fn execute_disarm(&mut self, now: Instant, out: &mut TickOutput) {
        if self.telemetry.state_valid() && !self.telemetry.armed() {
            info!("Vehicle disarmed");
            self.dispatcher.resolve(CommandClass::Disarm);
            if let Some(request) = self.active.take() {
                out.responses.push(MissionResponse::completed(&request));
            }
            self.transition(Phase::Idle, now);
            return;
        }

        if self
            .dispatcher
            .has_timed_out(CommandClass::Disarm, now, self.config.disarm_timeout())
        {
            warn!("Disarm not confirmed in time, returning to IDLE anyway");
            if let Some(request) = self.active.take() {
                out.responses.push(MissionResponse::completed_with_warning(
                    &request,
                    "disarm request timed out",
                ));
            }
            self.transition(Phase::Idle, now);
        }
    }
}
