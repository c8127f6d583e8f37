use mission_lib::{MissionRequest, RequestType, SequencerConfig, Waypoint, WaypointList};
use tracing::{info, warn};

/// Supplies waypoint lists for START_MISSION requests that carry none.
///
/// Lookup order: the file named on the `waypoint_filename` input, then the
/// file configured for the request's mission id.
#[derive(Debug, Default)]
pub struct WaypointProvider {
    config: SequencerConfig,
    selected: Option<String>,
}

impl WaypointProvider {
    pub fn from_config(config: &SequencerConfig) -> Self {
        Self {
            config: config.clone(),
            selected: None,
        }
    }

    pub fn set_filename(&mut self, filename: &str) {
        let filename = filename.trim();
        if filename.is_empty() {
            info!("Cleared selected waypoint file");
            self.selected = None;
        } else {
            info!("Selected waypoint file {}", filename);
            self.selected = Some(filename.to_string());
        }
    }

    fn file_for(&self, mission_id: u32) -> Option<&str> {
        self.selected
            .as_deref()
            .or_else(|| self.config.waypoint_file_for(mission_id))
    }

    fn load(path: &str) -> Vec<Waypoint> {
        match WaypointList::load_from_file(path) {
            Ok(list) => {
                info!("Loaded {} waypoint(s) from {}", list.len(), path);
                list.into_waypoints()
            }
            Err(e) => {
                warn!("Failed to load waypoints from {}: {}", path, e);
                Vec::new()
            }
        }
    }

    /// Fill in the waypoint list of a START_MISSION request that has none.
    /// Any other request passes through untouched.
    pub fn resolve(&self, mut request: MissionRequest) -> MissionRequest {
        if request.request != RequestType::StartMission || request.waypoints.is_some() {
            return request;
        }

        let waypoints = match self.file_for(request.mission_id) {
            Some(path) => Self::load(path),
            None => {
                warn!(
                    "No waypoint file available for mission {}",
                    request.mission_id
                );
                Vec::new()
            }
        };
        request.waypoints = Some(waypoints);
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "mission_sequencer_{}_{}.toml",
            std::process::id(),
            name
        ));
        fs::write(&path, content).unwrap();
        path
    }

    const SQUARE: &str = r#"
        [[waypoints]]
        x = 1.0
        y = 0.0
        z = 1.0
        yaw = 0.0
        holdtime = 1.0

        [[waypoints]]
        x = 1.0
        y = 1.0
        z = 1.0
        yaw = 0.0
        holdtime = 1.0
    "#;

    #[test]
    fn test_request_waypoints_take_priority() {
        let provider = WaypointProvider::default();
        let request = MissionRequest::new(1, 1, RequestType::StartMission)
            .with_waypoints(vec![Waypoint::new(0.0, 0.0, 2.0, 0.0, 0.0)]);
        let resolved = provider.resolve(request.clone());
        assert_eq!(resolved, request);
    }

    #[test]
    fn test_explicit_empty_list_is_kept() {
        let path = write_temp("explicit_empty", SQUARE);
        let mut provider = WaypointProvider::default();
        provider.set_filename(path.to_str().unwrap());

        let request = MissionRequest::new(1, 1, RequestType::StartMission).with_waypoints(vec![]);
        assert_eq!(provider.resolve(request).waypoints, Some(vec![]));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_selected_file_beats_configured_file() {
        let selected = write_temp("selected", SQUARE);
        let configured = write_temp("configured", "");
        let config = SequencerConfig {
            waypoint_files: vec![configured.to_string_lossy().into_owned()],
            ..Default::default()
        };

        let mut provider = WaypointProvider::from_config(&config);
        let request = MissionRequest::new(1, 1, RequestType::StartMission);
        assert_eq!(provider.resolve(request.clone()).waypoints, Some(vec![]));

        provider.set_filename(selected.to_str().unwrap());
        let waypoints = provider.resolve(request).waypoints.unwrap();
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[1], Waypoint::new(1.0, 1.0, 1.0, 0.0, 1.0));

        fs::remove_file(selected).ok();
        fs::remove_file(configured).ok();
    }

    #[test]
    fn test_missing_file_resolves_to_empty_list() {
        let mut provider = WaypointProvider::default();
        provider.set_filename("/nonexistent/mission.toml");
        let request = MissionRequest::new(2, 1, RequestType::StartMission);
        assert_eq!(provider.resolve(request).waypoints, Some(vec![]));
    }

    #[test]
    fn test_other_requests_pass_through() {
        let provider = WaypointProvider::default();
        let request = MissionRequest::new(1, 1, RequestType::Takeoff);
        assert_eq!(provider.resolve(request).waypoints, None);
    }
}
