use serde::{Deserialize, Serialize};

use crate::now_millis;

/// Vehicle state reported by the flight controller bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub armed: bool,
    pub mode: String,
    pub connected: bool,
    #[serde(default)]
    pub timestamp: u64,
}

impl VehicleState {
    pub fn new(armed: bool, mode: impl Into<String>, connected: bool) -> Self {
        Self {
            armed,
            mode: mode.into(),
            connected,
            timestamp: now_millis(),
        }
    }
}

/// Landed state as reported in the extended vehicle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LandedState {
    #[default]
    Unknown,
    OnGround,
    InAir,
    Takeoff,
    Landing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedVehicleState {
    pub landed_state: LandedState,
    #[serde(default)]
    pub timestamp: u64,
}

impl ExtendedVehicleState {
    pub fn new(landed_state: LandedState) -> Self {
        Self {
            landed_state,
            timestamp: now_millis(),
        }
    }
}

/// Vehicle pose in the fixed navigation frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f64; 3], // x, y, z in meters
    pub yaw: f64,           // rotation about z-axis (rad)
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            position: [x, y, z],
            yaw,
        }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Position/yaw target streamed to the flight controller while the
/// sequencer commands position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSetpoint {
    pub pose: Pose,
    pub timestamp: u64,
}

impl PoseSetpoint {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            timestamp: now_millis(),
        }
    }
}

/// Actuation request sent to the flight controller bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VehicleCommand {
    Arm {
        value: bool,
        command_id: String,
        timestamp: u64,
    },
    Disarm {
        force: bool,
        command_id: String,
        timestamp: u64,
    },
    SetMode {
        mode: String,
        command_id: String,
        timestamp: u64,
    },
    Land {
        command_id: String,
        timestamp: u64,
    },
}

/// Command classes tracked independently by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    Arm,
    Disarm,
    SetMode,
    Land,
}

impl VehicleCommand {
    pub fn new_arm() -> Self {
        Self::Arm {
            value: true,
            command_id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn new_disarm(force: bool) -> Self {
        Self::Disarm {
            force,
            command_id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn new_set_mode(mode: impl Into<String>) -> Self {
        Self::SetMode {
            mode: mode.into(),
            command_id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn new_land() -> Self {
        Self::Land {
            command_id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn class(&self) -> CommandClass {
        match self {
            Self::Arm { .. } => CommandClass::Arm,
            Self::Disarm { .. } => CommandClass::Disarm,
            Self::SetMode { .. } => CommandClass::SetMode,
            Self::Land { .. } => CommandClass::Land,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_command_is_tagged() {
        let json = serde_json::to_value(VehicleCommand::new_disarm(true)).unwrap();
        assert_eq!(json["type"], "Disarm");
        assert_eq!(json["force"], true);
        assert!(json["command_id"].as_str().is_some());
    }

    #[test]
    fn test_landed_state_wire_names() {
        let state: ExtendedVehicleState =
            serde_json::from_str(r#"{"landed_state":"ON_GROUND"}"#).unwrap();
        assert_eq!(state.landed_state, LandedState::OnGround);
        assert_eq!(state.timestamp, 0);
    }

    #[test]
    fn test_command_ids_are_unique() {
        let a = VehicleCommand::new_arm();
        let b = VehicleCommand::new_arm();
        assert_ne!(a, b);
        assert_eq!(a.class(), CommandClass::Arm);
    }
}
