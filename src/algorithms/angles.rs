//! Angle helpers in degrees.
//!
//! Radian conversion uses `f32::to_radians`/`f64::to_degrees` directly; the
//! helpers here cover the normalization and wraparound rules used by the
//! heading estimators.

use nalgebra::Vector3;

/// Normalize an angle to [0, 360)
pub fn normalize_360(degrees: f32) -> f32 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Add one turn to a negative angle. Values above 360 are left untouched.
pub fn to_positive(degrees: f32) -> f32 {
    if degrees < 0.0 {
        degrees + 360.0
    } else {
        degrees
    }
}

/// Mirror a heading between clockwise and counter-clockwise conventions
pub fn flip_direction(degrees: f32) -> f32 {
    360.0 - to_positive(degrees)
}

/// Difference `raw - reference` folded into (-180, 180].
///
/// Every running window compares its samples against a reference with this
/// rule so that 359° vs 1° reads as -2° and not 358°.
pub fn wrap_delta(raw: f32, reference: f32) -> f32 {
    let delta = raw - reference;
    if delta > 180.0 {
        delta - 360.0
    } else if delta <= -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

/// Shortest signed difference from `current` to `target`, in (-180, 180]
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Interpolate from `a` towards `b` along the shortest angular path. `t` is clamped to [0, 1].
pub fn shortest_angle_lerp(a: f32, b: f32, t: f32) -> f32 {
    a + delta_angle(a, b) * t.clamp(0.0, 1.0)
}

/// Signed angle in degrees between the world forward axis (+Z) and `v`, around +Y.
///
/// Positive angles turn towards +X. The vertical component of `v` contributes
/// to the magnitude of the angle but not its sign.
pub fn signed_angle_from_forward(v: &Vector3<f32>) -> f32 {
    let length = v.norm();
    if length <= f32::EPSILON {
        return 0.0;
    }

    let angle = (v.z / length).clamp(-1.0, 1.0).acos().to_degrees();
    if v.x < 0.0 {
        -angle
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalize_360() {
        assert_abs_diff_eq!(normalize_360(370.0), 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(normalize_360(-10.0), 350.0, epsilon = 1e-4);
        assert_abs_diff_eq!(normalize_360(720.0), 0.0, epsilon = 1e-4);
        assert!(normalize_360(-1e-9) < 360.0);
    }

    #[test]
    fn test_to_positive() {
        assert_eq!(to_positive(-10.0), 350.0);
        assert_eq!(to_positive(10.0), 10.0);
        // Only adds a single turn
        assert_eq!(to_positive(370.0), 370.0);
    }

    #[test]
    fn test_flip_direction() {
        assert_eq!(flip_direction(90.0), 270.0);
        assert_eq!(flip_direction(-90.0), 90.0);
    }

    #[test]
    fn test_wrap_delta_crosses_north() {
        assert_eq!(wrap_delta(359.0, 1.0), -2.0);
        assert_eq!(wrap_delta(1.0, 359.0), 2.0);
        assert_eq!(wrap_delta(180.0, 0.0), 180.0);
        assert_eq!(wrap_delta(0.0, 180.0), 180.0);
    }

    #[test]
    fn test_wrap_delta_range() {
        let mut raw = 0.0f32;
        while raw < 360.0 {
            let mut reference = 0.0f32;
            while reference < 360.0 {
                let delta = wrap_delta(raw, reference);
                assert!(delta > -180.0 && delta <= 180.0, "{} - {} = {}", raw, reference, delta);
                reference += 7.5;
            }
            raw += 5.0;
        }
    }

    #[test]
    fn test_shortest_angle_lerp() {
        assert_abs_diff_eq!(shortest_angle_lerp(20.0, 10.0, 0.5), 15.0, epsilon = 1e-4);
        assert_abs_diff_eq!(normalize_360(shortest_angle_lerp(350.0, 10.0, 0.5)), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(shortest_angle_lerp(10.0, 350.0, 0.5), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(shortest_angle_lerp(0.0, 90.0, 2.0), 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_signed_angle_from_forward() {
        assert_abs_diff_eq!(signed_angle_from_forward(&Vector3::new(0.0, 0.0, 1.0)), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(signed_angle_from_forward(&Vector3::new(1.0, 0.0, 0.0)), 90.0, epsilon = 1e-4);
        assert_abs_diff_eq!(signed_angle_from_forward(&Vector3::new(-1.0, 0.0, 0.0)), -90.0, epsilon = 1e-4);
        assert_abs_diff_eq!(signed_angle_from_forward(&Vector3::new(0.0, 0.0, -1.0)), 180.0, epsilon = 1e-4);
        assert_eq!(signed_angle_from_forward(&Vector3::zeros()), 0.0);
    }
}
