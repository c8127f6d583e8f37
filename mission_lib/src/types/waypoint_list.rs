use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::Waypoint;

/// Waypoint list file.
///
/// ```toml
/// [[waypoints]]
/// x = 0.0
/// y = 0.0
/// z = 1.5
/// yaw = 0.0
/// holdtime = 2.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaypointList {
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

impl WaypointList {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let list: WaypointList = toml::from_str(&content)?;
        list.validate()?;
        Ok(list)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, wp) in self.waypoints.iter().enumerate() {
            if ![wp.x, wp.y, wp.z, wp.yaw, wp.holdtime]
                .iter()
                .all(|v| v.is_finite())
            {
                return Err(eyre::eyre!("Waypoint {} contains a non-finite value", i));
            }
            if wp.holdtime < 0.0 {
                return Err(eyre::eyre!(
                    "Waypoint {} has negative holdtime ({:.2} s)",
                    i,
                    wp.holdtime
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn into_waypoints(self) -> Vec<Waypoint> {
        self.waypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_waypoint_list() {
        let list: WaypointList = toml::from_str(
            r#"
            [[waypoints]]
            x = 1.0
            y = 2.0
            z = 1.5
            yaw = 0.0
            holdtime = 2.0

            [[waypoints]]
            x = -1.0
            y = 0.0
            z = 1.5
            yaw = 1.57
            "#,
        )
        .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.waypoints[0], Waypoint::new(1.0, 2.0, 1.5, 0.0, 2.0));
        assert_eq!(list.waypoints[1].holdtime, 0.0);
        assert!(list.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_an_empty_list() {
        let list: WaypointList = toml::from_str("").unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_negative_holdtime_is_rejected() {
        let list = WaypointList {
            waypoints: vec![Waypoint::new(0.0, 0.0, 1.0, 0.0, -1.0)],
        };
        assert!(list.validate().is_err());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let list = WaypointList {
            waypoints: vec![Waypoint::new(f64::NAN, 0.0, 1.0, 0.0, 0.0)],
        };
        assert!(list.validate().is_err());
    }
}
