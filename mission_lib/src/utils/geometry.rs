// Pose helpers for waypoint navigation

use nalgebra::Vector3;
use std::f64::consts::PI;

use crate::{Pose, Waypoint};

/// Wrap an angle into [-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    // rem_euclid maps +π onto -π; keep the sign of the input at the boundary
    if wrapped == -PI && angle > 0.0 {
        PI
    } else {
        wrapped
    }
}

/// Signed yaw difference `target - current`, wrapped into [-π, π].
pub fn yaw_difference(target: f64, current: f64) -> f64 {
    wrap_angle(target - current)
}

impl Pose {
    pub fn position_vector(&self) -> Vector3<f64> {
        Vector3::new(self.position[0], self.position[1], self.position[2])
    }

    /// Euclidean (horizontal + vertical) distance between two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (self.position_vector() - other.position_vector()).norm()
    }

    /// Absolute wrapped yaw error between two poses.
    pub fn yaw_error_to(&self, other: &Pose) -> f64 {
        yaw_difference(other.yaw, self.yaw).abs()
    }

    /// Pose shifted by a position offset and a yaw offset.
    ///
    /// Offsets are added in the navigation frame; the result yaw is wrapped.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64, dyaw: f64) -> Pose {
        let position = self.position_vector() + Vector3::new(dx, dy, dz);
        Pose::new(position.x, position.y, position.z, wrap_angle(self.yaw + dyaw))
    }
}

impl Waypoint {
    /// Target pose of this waypoint. Relative waypoints are offsets from `start`.
    pub fn target(&self, start: &Pose, relative: bool) -> Pose {
        if relative {
            start.offset(self.x, self.y, self.z, self.yaw)
        } else {
            Pose::new(self.x, self.y, self.z, self.yaw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_wrap_angle_inside_range_is_unchanged() {
        assert!((wrap_angle(0.5) - 0.5).abs() < EPS);
        assert!((wrap_angle(-3.0) + 3.0).abs() < EPS);
    }

    #[test]
    fn test_wrap_angle_outside_range() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < EPS);
        assert!((wrap_angle(4.0 * PI)).abs() < EPS);
        assert!((wrap_angle(PI) - PI).abs() < EPS);
    }

    #[test]
    fn test_yaw_difference_takes_short_way_round() {
        // 170° to -170° is a 20° turn, not 340°
        let diff = yaw_difference((-170.0_f64).to_radians(), 170.0_f64.to_radians());
        assert!((diff - 20.0_f64.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_distance_includes_vertical_error() {
        let a = Pose::new(0.0, 0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 0.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_offset_wraps_yaw() {
        let start = Pose::new(1.0, 1.0, 0.0, 3.0);
        let shifted = start.offset(1.0, -1.0, 2.0, 1.0);
        assert_eq!(shifted.position, [2.0, 0.0, 2.0]);
        assert!((shifted.yaw - wrap_angle(4.0)).abs() < EPS);
        assert!(shifted.yaw < 0.0);
    }

    #[test]
    fn test_waypoint_target() {
        let start = Pose::new(2.0, 3.0, 0.0, 0.0);
        let waypoint = Waypoint::new(1.0, 0.0, 1.5, 0.2, 0.0);
        assert_eq!(waypoint.target(&start, true).position, [3.0, 3.0, 1.5]);
        assert_eq!(waypoint.target(&start, false), Pose::new(1.0, 0.0, 1.5, 0.2));
    }
}
