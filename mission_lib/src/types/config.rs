use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Tuning and behavior of the mission sequencer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub position_threshold: f64, // meters
    pub yaw_threshold: f64,      // radians
    pub arm_timeout_s: f64,
    pub disarm_timeout_s: f64,
    pub mode_timeout_s: f64,
    pub land_timeout_s: f64,
    pub auto_land: bool,
    pub relative_waypoints: bool,
    pub tick_rate_hz: f64,
    pub takeoff_height: f64, // meters above the starting pose
    pub offboard_mode: String,
    pub waypoint_files: Vec<String>, // indexed by mission id, starting at 1
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            position_threshold: 0.3,
            yaw_threshold: 0.1,
            arm_timeout_s: 5.0,
            disarm_timeout_s: 5.0,
            mode_timeout_s: 5.0,
            land_timeout_s: 60.0,
            auto_land: false,
            relative_waypoints: true,
            tick_rate_hz: 20.0,
            takeoff_height: 1.0,
            offboard_mode: "OFFBOARD".to_string(),
            waypoint_files: Vec::new(),
        }
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, value: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse() {
            Ok(parsed) => *value = parsed,
            Err(_) => tracing::warn!("Ignoring unparsable {}={}", key, raw),
        }
    }
}

impl SequencerConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SequencerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of the current values
    pub fn with_env_overrides(mut self) -> Self {
        override_from_env("POSITION_THRESHOLD", &mut self.position_threshold);
        override_from_env("YAW_THRESHOLD", &mut self.yaw_threshold);
        override_from_env("ARM_TIMEOUT_S", &mut self.arm_timeout_s);
        override_from_env("DISARM_TIMEOUT_S", &mut self.disarm_timeout_s);
        override_from_env("MODE_TIMEOUT_S", &mut self.mode_timeout_s);
        override_from_env("LAND_TIMEOUT_S", &mut self.land_timeout_s);
        override_from_env("AUTO_LAND", &mut self.auto_land);
        override_from_env("RELATIVE_WAYPOINTS", &mut self.relative_waypoints);
        override_from_env("TICK_RATE_HZ", &mut self.tick_rate_hz);
        override_from_env("TAKEOFF_HEIGHT", &mut self.takeoff_height);
        override_from_env("OFFBOARD_MODE", &mut self.offboard_mode);
        self
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("position_threshold", self.position_threshold),
            ("yaw_threshold", self.yaw_threshold),
            ("arm_timeout_s", self.arm_timeout_s),
            ("disarm_timeout_s", self.disarm_timeout_s),
            ("mode_timeout_s", self.mode_timeout_s),
            ("land_timeout_s", self.land_timeout_s),
            ("tick_rate_hz", self.tick_rate_hz),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(eyre::eyre!("{} must be positive, got {}", name, value));
            }
        }

        // The Duration getters convert these on every tick
        let durations = [
            ("arm_timeout_s", self.arm_timeout_s),
            ("disarm_timeout_s", self.disarm_timeout_s),
            ("mode_timeout_s", self.mode_timeout_s),
            ("land_timeout_s", self.land_timeout_s),
            ("tick period", 1.0 / self.tick_rate_hz),
        ];
        for (name, seconds) in durations {
            if Duration::try_from_secs_f64(seconds).is_err() {
                return Err(eyre::eyre!("{} of {} s is out of range", name, seconds));
            }
        }

        if self.yaw_threshold > std::f64::consts::PI {
            return Err(eyre::eyre!(
                "yaw_threshold ({:.3} rad) exceeds π and would accept any heading",
                self.yaw_threshold
            ));
        }

        if !self.takeoff_height.is_finite() || self.takeoff_height < 0.0 {
            return Err(eyre::eyre!(
                "takeoff_height must be non-negative, got {}",
                self.takeoff_height
            ));
        }

        if self.offboard_mode.trim().is_empty() {
            return Err(eyre::eyre!("offboard_mode must not be empty"));
        }

        Ok(())
    }

    pub fn arm_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.arm_timeout_s)
    }

    pub fn disarm_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.disarm_timeout_s)
    }

    pub fn mode_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.mode_timeout_s)
    }

    pub fn land_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.land_timeout_s)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    /// Waypoint file configured for a mission id (ids start at 1)
    pub fn waypoint_file_for(&self, mission_id: u32) -> Option<&str> {
        let index = (mission_id as usize).checked_sub(1)?;
        self.waypoint_files.get(index).map(String::as_str)
    }
}
