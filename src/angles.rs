//! Angular arithmetic on the unit circle.
//!
//! The controller works in a non-standard frame where 0 points to the
//! robot's right, π/2 straight ahead, π behind and 3π/2 to the left.
//! These helpers keep all comparisons on the shortest arc so the frame
//! wraps cleanly at 2π.

use std::f32::consts::PI;

/// Full turn in radians.
pub const TWO_PI: f32 = 2.0 * PI;

/// Normalize an angle to [-π, π].
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle;
    while a > PI {
        a -= TWO_PI;
    }
    while a < -PI {
        a += TWO_PI;
    }
    a
}

/// Normalize an angle to [0, 2π).
#[inline]
pub fn normalize_angle_positive(angle: f32) -> f32 {
    let mut a = angle % TWO_PI;
    if a < 0.0 {
        a += TWO_PI;
    }
    a
}

/// Signed shortest-arc difference `to - from`, in (-π, π].
///
/// Positive means `to` lies counter-clockwise of `from`.
#[inline]
pub fn delta_angle(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}
