//! Polar obstacle histogram passes.
//!
//! One control tick runs three passes over the same histogram buffer:
//!
//! 1. **Primary**: project the range scan onto the cell window and
//!    sum distance-weighted obstacle magnitudes per angular sector.
//! 2. **Binary**: threshold with hysteresis against the previous
//!    tick's classification.
//! 3. **Masked**: block sectors the robot cannot reach at its current
//!    speed because the minimum turning arc would clip an obstacle.
//!
//! All passes operate on caller-owned slices so the controller can
//! reuse its scratch buffers across ticks.

use crate::angles::delta_angle;
use crate::grid::GeometryTables;
use crate::scan::RangeScan;
use std::f32::consts::{FRAC_PI_2, PI};

/// Forward-arc limits produced by the masking pass.
#[derive(Clone, Copy, Debug)]
pub struct MaskLimits {
    /// Counter-clockwise (left) limit of the reachable arc (radians)
    pub phi_left: f32,
    /// Clockwise (right) limit of the reachable arc (radians)
    pub phi_right: f32,
}

/// Compute per-cell obstacle magnitudes for the forward half-window.
///
/// A cell is occupied when it sits in front of the obstacle its ray
/// reports, i.e. `cell_distance + cell_width/2 > range`. Occupied
/// cells take their precomputed distance-decaying weight.
///
/// Returns `false` when an occupied cell lies inside `safety_reach`
/// (robot radius plus safety margin): something is inside the safety
/// envelope and the tick must degrade to brake-and-spin.
pub fn compute_cell_magnitudes(
    tables: &GeometryTables,
    scan: &RangeScan,
    safety_reach: f32,
    cell_mag: &mut [f32],
) -> bool {
    let half_cell = tables.cell_width() / 2.0;
    for x in 0..tables.diameter() {
        for y in 0..tables.forward_rows() {
            let idx = tables.cell_index(x, y);
            let Some(direction) = tables.cell_direction(x, y) else {
                cell_mag[idx] = 0.0;
                continue;
            };
            // sample i covers i * 0.5 deg; forward directions land in [0, 360]
            let sample = (direction.to_degrees() * 2.0).round().max(0.0) as usize;
            let distance = tables.cell_distance(x, y);
            if distance + half_cell > scan.range_at(sample) {
                if distance < safety_reach {
                    return false;
                }
                cell_mag[idx] = tables.cell_base_mag(x, y);
            } else {
                cell_mag[idx] = 0.0;
            }
        }
    }
    true
}

/// Build the primary polar histogram from cell magnitudes.
///
/// Every occupied forward cell contributes its magnitude to each
/// sector its enlarged angular footprint overlaps; contributions from
/// distinct cells sum.
pub fn build_primary(
    tables: &GeometryTables,
    bucket: usize,
    cell_mag: &[f32],
    histogram: &mut [f32],
) {
    histogram.fill(0.0);
    for y in 0..tables.forward_rows() {
        for x in 0..tables.diameter() {
            let mag = cell_mag[tables.cell_index(x, y)];
            if mag > 0.0 {
                for &sector in tables.cell_sectors(bucket, x, y) {
                    histogram[sector as usize] += mag;
                }
            }
        }
    }
}

/// Threshold the primary histogram into binary occupancy with
/// hysteresis, then record the result as the prior for the next tick.
///
/// Sectors above `obs_cutoff` become 1, below `free_cutoff` become 0,
/// and anything in between keeps its previous classification.
pub fn binarize_with_hysteresis(
    histogram: &mut [f32],
    prior: &mut [f32],
    free_cutoff: f32,
    obs_cutoff: f32,
) {
    for (h, last) in histogram.iter_mut().zip(prior.iter()) {
        *h = if *h > obs_cutoff {
            1.0
        } else if *h < free_cutoff {
            0.0
        } else {
            *last
        };
    }
    prior.copy_from_slice(histogram);
}

/// Mask sectors the robot cannot turn into at its current speed.
///
/// Virtual rotation centers sit `min_turning_radius` to either side
/// of the robot. Occupied cells inside `blocked_circle_radius` of a
/// rotation center tighten the reachable arc on that side; everything
/// outside the `[phi_right, phi_left]` arc around straight-ahead is
/// then blocked.
pub fn mask_unreachable(
    tables: &GeometryTables,
    cell_mag: &[f32],
    histogram: &mut [f32],
    min_turning_radius: f32,
    blocked_circle_radius: f32,
) -> MaskLimits {
    let center = tables.center() as f32;
    let radius_cells = min_turning_radius / tables.cell_width();
    let center_x_right = center + radius_cells;
    let center_x_left = center - radius_cells;
    let angle_ahead = FRAC_PI_2;

    let mut phi_left = PI;
    let mut phi_right = 0.0f32;
    for y in 0..tables.forward_rows() {
        for x in 0..tables.diameter() {
            if cell_mag[tables.cell_index(x, y)] <= 0.0 {
                continue;
            }
            let Some(direction) = tables.cell_direction(x, y) else {
                continue;
            };
            if delta_angle(direction, angle_ahead) > 0.0
                && delta_angle(direction, phi_right) <= 0.0
            {
                // between phi_right and straight ahead
                let dist = (center_x_right - x as f32).hypot(center - y as f32)
                    * tables.cell_width();
                if dist < blocked_circle_radius {
                    phi_right = direction;
                }
            } else if delta_angle(direction, angle_ahead) <= 0.0
                && delta_angle(direction, phi_left) > 0.0
            {
                // between straight ahead and phi_left
                let dist = (center_x_left - x as f32).hypot(center - y as f32)
                    * tables.cell_width();
                if dist < blocked_circle_radius {
                    phi_left = direction;
                }
            }
        }
    }

    for (sector, h) in histogram.iter_mut().enumerate() {
        let angle = sector as f32 * tables.sector_angle();
        let reachable = (delta_angle(angle, phi_right) <= 0.0
            && delta_angle(angle, angle_ahead) >= 0.0)
            || (delta_angle(angle, phi_left) >= 0.0 && delta_angle(angle, angle_ahead) <= 0.0);
        *h = if *h <= 0.5 && reachable { 0.0 } else { 1.0 };
    }

    MaskLimits {
        phi_left,
        phi_right,
    }
}
