use dora_node_api::{arrow::array::BinaryArray, dora_core::config::DataId, DoraNode};
use eyre::Result;
use mission_lib::{MissionResponse, PoseSetpoint, VehicleCommand};
use serde::Serialize;
use tracing::debug;

/// Everything a single tick wants published
#[derive(Debug, Default)]
pub struct TickOutput {
    pub setpoint: Option<PoseSetpoint>,
    pub responses: Vec<MissionResponse>,
    pub commands: Vec<VehicleCommand>,
}

impl TickOutput {
    pub fn is_empty(&self) -> bool {
        self.setpoint.is_none() && self.responses.is_empty() && self.commands.is_empty()
    }
}

/// Serialize a message into the single-row binary array carried on dora outputs
pub fn encode<T: Serialize>(message: &T) -> Result<BinaryArray> {
    let serialized = serde_json::to_vec(message)?;
    Ok(BinaryArray::from_vec(vec![serialized.as_slice()]))
}

/// Sends tick output on the node's dora outputs
pub struct Publisher {
    setpoint_output: DataId,
    response_output: DataId,
    command_output: DataId,
}

impl Publisher {
    pub fn new() -> Self {
        Self {
            setpoint_output: DataId::from("pose_setpoint".to_owned()),
            response_output: DataId::from("mission_response".to_owned()),
            command_output: DataId::from("vehicle_command".to_owned()),
        }
    }

    /// Vehicle commands first, then responses, then the setpoint.
    pub fn publish(&self, node: &mut DoraNode, output: TickOutput) -> Result<()> {
        for command in &output.commands {
            node.send_output(self.command_output.clone(), Default::default(), encode(command)?)?;
        }

        for response in &output.responses {
            debug!(
                "Response mission {} request #{} ({:?}): response={}, completed={}",
                response.mission_id,
                response.request_number,
                response.request,
                response.response,
                response.completed
            );
            node.send_output(self.response_output.clone(), Default::default(), encode(response)?)?;
        }

        if let Some(setpoint) = &output.setpoint {
            node.send_output(self.setpoint_output.clone(), Default::default(), encode(setpoint)?)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dora_node_api::arrow::array::Array;
    use mission_lib::{MissionRequest, Pose, RequestType};

    #[test]
    fn test_encode_produces_single_json_row() {
        let request = MissionRequest::new(4, 9, RequestType::Land);
        let array = encode(&MissionResponse::accepted(&request)).unwrap();
        assert_eq!(array.len(), 1);

        let json: serde_json::Value = serde_json::from_slice(array.value(0)).unwrap();
        assert_eq!(json["mission_id"], 4);
        assert_eq!(json["request_number"], 9);
        assert_eq!(json["request"], "LAND");
        assert_eq!(json["response"], true);
        assert_eq!(json["completed"], false);
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn test_empty_tick_output() {
        let mut output = TickOutput::default();
        assert!(output.is_empty());
        output.setpoint = Some(PoseSetpoint::new(Pose::origin()));
        assert!(!output.is_empty());
    }
}
