//! Test utilities for avoidance scenarios.
//!
//! Builders for synthetic range scans and goals shared by the
//! integration tests.

#![allow(dead_code)]

use parihara_nav::{Goal, RangeScan, SCAN_SAMPLES};

/// Open field: every sample reads 10 m.
pub fn clear_field() -> RangeScan {
    RangeScan::uniform(10.0)
}

/// Clear field with a wall at `range` covering the given samples.
pub fn wall(from_sample: usize, to_sample: usize, range: f32) -> RangeScan {
    let mut ranges = [10.0f32; SCAN_SAMPLES];
    for r in &mut ranges[from_sample..=to_sample] {
        *r = range;
    }
    RangeScan::new(ranges)
}

/// Corridor along the forward axis with walls `half_width` meters to
/// each side. Symmetric about the straight-ahead sample.
pub fn corridor(half_width: f32) -> RangeScan {
    let mut ranges = [10.0f32; SCAN_SAMPLES];
    for (i, r) in ranges.iter_mut().enumerate() {
        let angle = (i as f32 * 0.5).to_radians();
        let cos = angle.cos().abs();
        if cos > 1e-3 {
            *r = (half_width / cos).min(10.0);
        }
    }
    RangeScan::new(ranges)
}

/// Goal straight ahead of the robot at the given distance.
pub fn goal_ahead(distance: f32) -> Goal {
    Goal {
        direction: 0.0,
        distance,
        distance_tolerance: 0.1,
    }
}

/// Goal directly to the robot's right at the given distance.
pub fn goal_right(distance: f32, tolerance: f32) -> Goal {
    Goal {
        direction: -std::f32::consts::FRAC_PI_2,
        distance,
        distance_tolerance: tolerance,
    }
}
