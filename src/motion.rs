//! Mapping of the picked heading into motion commands.
//!
//! Linear velocity follows an acceleration-limited ramp toward the
//! picked candidate's speed cap; the heading maps piecewise onto a
//! turn rate bounded by the speed-dependent maximum.

use std::f32::consts::{FRAC_PI_2, PI};

use crate::angles::TWO_PI;

/// Forward-cone scaling: a heading 75° off straight-ahead commands
/// the full turn rate.
const TURN_SCALE: f32 = 1.3089969; // 75 deg

/// Acceleration increment for one tick.
///
/// `dt` is the elapsed time since the previous tick, `None` on the
/// first. Stale or backwards clocks (dt outside [0, 0.3] s) fall back
/// to a small fixed increment rather than a burst of acceleration;
/// the magnitude is floored at 1e-4 so ramps always make progress.
pub fn speed_increment(dt: Option<f32>, max_acceleration: f32) -> f32 {
    let incr = match dt {
        Some(dt) if (0.0..=0.3).contains(&dt) => max_acceleration * dt,
        _ => 1e-2,
    };
    if incr.abs() <= 1e-4 {
        1e-4
    } else {
        incr
    }
}

/// Whether the goal sits inside either blocked turning circle.
///
/// At the current speed the robot sweeps a circle of
/// `blocked_circle_radius` on each side; a goal inside one cannot be
/// reached by turning and the robot must slow down first.
pub fn cannot_turn_to_goal(
    desired_direction: f32,
    goal_distance: f32,
    goal_tolerance: f32,
    blocked_circle_radius: f32,
) -> bool {
    let goal_x = goal_distance * desired_direction.cos();
    let goal_y = goal_distance * desired_direction.sin();
    let to_right_center = (goal_x - blocked_circle_radius).hypot(goal_y);
    if to_right_center + goal_tolerance < blocked_circle_radius {
        return true;
    }
    let to_left_center = (-goal_x - blocked_circle_radius).hypot(goal_y);
    to_left_center + goal_tolerance < blocked_circle_radius
}

/// Convert the picked heading and ramped linear velocity into the
/// commanded (linear, turnrate) pair.
///
/// A non-positive linear velocity means all directions are blocked:
/// spin in place at the full turn rate. Headings in the rear
/// quadrants command a saturated turn toward that side; the forward
/// cone scales linearly, rounded to whole rad/s and clamped.
pub fn map_motion(picked_direction: f32, target_linear: f32, max_turnrate: f32) -> (f32, f32) {
    if target_linear <= 0.0 {
        return (0.0, max_turnrate);
    }
    let turnrate = if picked_direction >= 1.5 * PI && picked_direction < TWO_PI {
        -max_turnrate
    } else if picked_direction >= PI && picked_direction < 1.5 * PI {
        max_turnrate
    } else {
        let t = (((picked_direction - FRAC_PI_2) / TURN_SCALE) * max_turnrate).round();
        if t.abs() > max_turnrate {
            max_turnrate.copysign(t)
        } else {
            t
        }
    };
    (target_linear, turnrate)
}
