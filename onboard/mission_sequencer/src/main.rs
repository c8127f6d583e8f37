mod dispatcher;
mod navigator;
mod publisher;
mod sequencer;
mod telemetry;
mod waypoints;

use dora_node_api::arrow::array::{Array, BinaryArray, StringArray};
use dora_node_api::{DoraNode, Event};
use eyre::Result;
use mission_lib::{
    init_tracing, ExtendedVehicleState, MissionRequest, Pose, SequencerConfig, VehicleState,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use publisher::Publisher;
use sequencer::MissionSequencer;
use telemetry::Inbox;
use waypoints::WaypointProvider;

fn main() -> Result<()> {
    let _guard = init_tracing();

    info!("Starting mission sequencer node...");

    let config = load_config()?;
    info!("Sequencer configuration:");
    info!(
        "  Thresholds: {:.2} m, {:.3} rad",
        config.position_threshold, config.yaw_threshold
    );
    info!(
        "  Timeouts: arm {:.1} s, disarm {:.1} s, mode {:.1} s, land {:.1} s",
        config.arm_timeout_s, config.disarm_timeout_s, config.mode_timeout_s, config.land_timeout_s
    );
    info!(
        "  Auto land: {}, relative waypoints: {}, tick rate: {:.1} Hz",
        config.auto_land, config.relative_waypoints, config.tick_rate_hz
    );
    info!("  Waypoint files: {:?}", config.waypoint_files);

    let (mut node, mut events) = DoraNode::init_from_env()?;

    let publisher = Publisher::new();
    let mut provider = WaypointProvider::from_config(&config);
    let tick_period = config.tick_period();
    let mut sequencer = MissionSequencer::new(config);
    let mut inbox = Inbox::default();

    let mut last_tick: Option<Instant> = None;
    let mut tick_count: u64 = 0;
    let mut input_stats: HashMap<String, usize> = HashMap::new();

    info!("Mission sequencer ready, waiting for telemetry and requests");

    while let Some(event) = events.recv() {
        match event {
            Event::Input {
                id,
                metadata: _,
                data,
            } => {
                *input_stats.entry(id.as_str().to_string()).or_insert(0) += 1;

                match id.as_str() {
                    "tick" => {
                        let now = Instant::now();
                        if let Some(last) = last_tick {
                            let gap = now.saturating_duration_since(last);
                            if gap > tick_period * 3 {
                                warn!(
                                    "Tick overrun: {:.0} ms since previous tick (period {:.0} ms)",
                                    gap.as_secs_f64() * 1000.0,
                                    tick_period.as_secs_f64() * 1000.0
                                );
                            }
                        }
                        last_tick = Some(now);
                        tick_count += 1;

                        let output = sequencer.tick(&mut inbox, now);
                        if !output.is_empty() {
                            if let Err(e) = publisher.publish(&mut node, output) {
                                warn!("Failed to publish tick output: {}", e);
                            }
                        }
                    }

                    "vehicle_state" => {
                        if let Some(state) =
                            decode::<VehicleState>("vehicle_state", data.as_any().downcast_ref())
                        {
                            if inbox.vehicle_state.put(state) {
                                debug!("Unread vehicle state replaced");
                            }
                        }
                    }

                    "extended_state" => {
                        if let Some(state) = decode::<ExtendedVehicleState>(
                            "extended_state",
                            data.as_any().downcast_ref(),
                        ) {
                            inbox.extended_state.put(state);
                        }
                    }

                    "pose" => {
                        if let Some(pose) = decode::<Pose>("pose", data.as_any().downcast_ref()) {
                            inbox.pose.put(pose);
                        }
                    }

                    "mission_request" => {
                        if let Some(request) = decode::<MissionRequest>(
                            "mission_request",
                            data.as_any().downcast_ref(),
                        ) {
                            debug!(
                                "Queued request #{} ({:?}) for mission {}",
                                request.request_number, request.request, request.mission_id
                            );
                            inbox.requests.push(provider.resolve(request));
                        }
                    }

                    "waypoint_filename" => {
                        let filename = if let Some(array) =
                            data.as_any().downcast_ref::<StringArray>()
                        {
                            (array.len() > 0).then(|| array.value(0).to_string())
                        } else if let Some(array) = data.as_any().downcast_ref::<BinaryArray>() {
                            if array.len() > 0 {
                                parse_filename(array.value(0))
                            } else {
                                None
                            }
                        } else {
                            None
                        };

                        match filename {
                            Some(filename) => provider.set_filename(&filename),
                            None => warn!("Ignoring malformed waypoint filename"),
                        }
                    }

                    other => {
                        debug!("Unknown input ID: '{}'", other);
                    }
                }
            }

            Event::Stop(_) => {
                info!("STOP EVENT RECEIVED");
                info!("Final statistics:");
                info!("   Ticks processed: {}", tick_count);
                info!("   Final phase: {}", sequencer.phase());
                info!(
                    "   Waypoint index: {}",
                    sequencer.progress().current_waypoint_index
                );
                if let Some(setpoint) = sequencer.setpoint() {
                    info!(
                        "   Last setpoint: ({:.2}, {:.2}, {:.2}), yaw {:.2}",
                        setpoint.position[0], setpoint.position[1], setpoint.position[2], setpoint.yaw
                    );
                }
                info!("   Input breakdown:");
                for (input_id, count) in &input_stats {
                    info!("      {}: {} events", input_id, count);
                }
                break;
            }

            other_event => {
                debug!("Other event type: {:?}", other_event);
            }
        }
    }

    info!("Mission sequencer finished after {} ticks", tick_count);
    Ok(())
}

/// Config file from `SEQUENCER_CONFIG` (or defaults) with environment overrides
fn load_config() -> Result<SequencerConfig> {
    let config = match std::env::var("SEQUENCER_CONFIG") {
        Ok(path) => {
            info!("Loading sequencer configuration from {}", path);
            SequencerConfig::load_from_file(&path)?.with_env_overrides()
        }
        Err(_) => {
            info!("SEQUENCER_CONFIG not set, using defaults");
            SequencerConfig::from_env()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Deserialize the JSON message carried in the first row of a binary input.
/// Malformed payloads are logged and dropped.
fn decode<T: DeserializeOwned>(input: &str, array: Option<&BinaryArray>) -> Option<T> {
    let array = match array {
        Some(array) if array.len() > 0 => array,
        _ => {
            warn!("Input {} is not a non-empty binary array", input);
            return None;
        }
    };

    match serde_json::from_slice(array.value(0)) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Failed to parse {}: {}", input, e);
            None
        }
    }
}

/// Accepts a JSON string or plain UTF-8 text
fn parse_filename(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    serde_json::from_str::<String>(text)
        .ok()
        .or_else(|| Some(text.to_string()))
}
