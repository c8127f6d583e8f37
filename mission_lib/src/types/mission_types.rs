use serde::{Deserialize, Serialize};
use std::fmt;

use crate::now_millis;

/// Mission phase; exactly one is active at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Idle,
    Prearm,
    Arm,
    Mission,
    Hold,
    Land,
    Disarm,
}

impl Phase {
    /// Phases in which the sequencer streams a position setpoint.
    /// The others are commanded directly through vehicle commands.
    pub fn commands_setpoint(self) -> bool {
        matches!(self, Phase::Prearm | Phase::Arm | Phase::Mission | Phase::Hold)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Prearm => "PREARM",
            Phase::Arm => "ARM",
            Phase::Mission => "MISSION",
            Phase::Hold => "HOLD",
            Phase::Land => "LAND",
            Phase::Disarm => "DISARM",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    Arm,
    Takeoff,
    StartMission,
    Hold,
    Resume,
    Land,
    Abort,
    Disarm,
}

/// Single mission waypoint.
///
/// Either absolute in the navigation frame or an offset from the starting
/// pose, depending on how the list is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,      // rad
    #[serde(default)]
    pub holdtime: f64, // seconds to dwell once reached
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64, yaw: f64, holdtime: f64) -> Self {
        Self { x, y, z, yaw, holdtime }
    }
}

/// High-level request from the mission client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRequest {
    pub mission_id: u32,
    pub request_number: u32,
    pub request: RequestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<Waypoint>>,
    #[serde(default)]
    pub timestamp: u64,
}

impl MissionRequest {
    pub fn new(mission_id: u32, request_number: u32, request: RequestType) -> Self {
        Self {
            mission_id,
            request_number,
            request,
            waypoints: None,
            timestamp: now_millis(),
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.waypoints = Some(waypoints);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseLevel {
    Info,
    Warning,
    Error,
}

/// Acknowledgement of a mission request.
///
/// `response` tells whether the request was accepted, `completed` whether the
/// transition it asked for has concluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionResponse {
    pub mission_id: u32,
    pub request_number: u32,
    pub request: RequestType,
    pub response: bool,
    pub completed: bool,
    pub level: ResponseLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: u64,
}

impl MissionResponse {
    fn for_request(
        request: &MissionRequest,
        response: bool,
        completed: bool,
        level: ResponseLevel,
        reason: Option<String>,
    ) -> Self {
        Self {
            mission_id: request.mission_id,
            request_number: request.request_number,
            request: request.request,
            response,
            completed,
            level,
            reason,
            timestamp: now_millis(),
        }
    }

    pub fn accepted(request: &MissionRequest) -> Self {
        Self::for_request(request, true, false, ResponseLevel::Info, None)
    }

    pub fn completed(request: &MissionRequest) -> Self {
        Self::for_request(request, true, true, ResponseLevel::Info, None)
    }

    /// Completed, but only because a timeout forced the transition.
    pub fn completed_with_warning(request: &MissionRequest, reason: impl Into<String>) -> Self {
        Self::for_request(request, true, true, ResponseLevel::Warning, Some(reason.into()))
    }

    pub fn rejected(request: &MissionRequest, reason: impl Into<String>) -> Self {
        Self::for_request(request, false, false, ResponseLevel::Error, Some(reason.into()))
    }

    /// Accepted earlier, but failed or was superseded before completing.
    pub fn failed(request: &MissionRequest, reason: impl Into<String>) -> Self {
        Self::for_request(request, false, false, ResponseLevel::Error, Some(reason.into()))
    }

    /// Terminal responses close out a request: nothing else will follow.
    pub fn is_terminal(&self) -> bool {
        self.completed || !self.response
    }
}
