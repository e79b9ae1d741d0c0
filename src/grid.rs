//! Precomputed tables over the local obstacle window.
//!
//! The controller never touches trigonometry in its per-tick loops:
//! everything that depends only on the window geometry and the
//! parameter bundle is computed once here.
//!
//! ## Window layout
//!
//! The window is a `window_diameter × window_diameter` cell grid
//! centered on the robot. `(0, 0)` is to the robot's front-left,
//! `(max, 0)` to the front-right; rows with `y` below the center row
//! are in front of the robot. Cell directions use the internal
//! angular frame (0 = right, π/2 = ahead, 3π/2 = left).
//!
//! ## Speed buckets
//!
//! Obstacle enlargement depends on the speed-dependent safety margin,
//! so sector membership is tabulated per speed bucket. With a fixed
//! safety margin a single bucket suffices; otherwise 20 buckets span
//! `(0, max_speed]`.

use crate::angles::{delta_angle, TWO_PI};
use crate::config::VfhConfig;
use std::f32::consts::{FRAC_PI_2, PI};
use tracing::debug;

/// Speed buckets used when the safety margin varies with speed.
const SPEED_BUCKETS: usize = 20;

/// Per-cell geometry and per-bucket sector membership tables.
#[derive(Clone, Debug)]
pub struct GeometryTables {
    diameter: usize,
    center: usize,
    cell_width: f32,
    sector_angle: f32,
    histogram_size: usize,
    bucket_count: usize,
    /// Euclidean distance from the window center to each cell (m)
    distance: Vec<f32>,
    /// Direction from the robot to each cell; `None` at the center
    direction: Vec<Option<f32>>,
    /// Distance-decaying obstacle weight baseline per cell
    base_mag: Vec<f32>,
    /// Per (bucket, cell): span into `sector_index`
    sector_spans: Vec<(u32, u32)>,
    /// Flat storage for all sector membership lists
    sector_index: Vec<u16>,
}

impl GeometryTables {
    /// Build all tables for a validated parameter bundle.
    pub fn build(config: &VfhConfig) -> Self {
        let diameter = config.window_diameter;
        let center = diameter / 2;
        let histogram_size = (TWO_PI / config.sector_angle).round() as usize;
        let bucket_count =
            if (config.zero_safety_distance - config.max_safety_distance).abs() < f32::EPSILON {
                1
            } else {
                SPEED_BUCKETS
            };

        let cells = diameter * diameter;
        let mut distance = vec![0.0; cells];
        let mut direction = vec![None; cells];
        let mut base_mag = vec![0.0; cells];

        for x in 0..diameter {
            for y in 0..diameter {
                let idx = x * diameter + y;
                let dx = center as f32 - x as f32;
                let dy = center as f32 - y as f32;
                let dist = (dx * dx + dy * dy).sqrt() * config.cell_width;
                distance[idx] = dist;
                base_mag[idx] = (3e3 - dist * 1e3).powi(4) / 1e8;
                direction[idx] = cell_direction(x, y, center);
            }
        }

        // Sector membership per speed bucket. A sector belongs to a
        // cell when its angular interval overlaps the cell direction
        // widened by the enlargement angle, modulo 2pi.
        let mut sector_spans = Vec::with_capacity(bucket_count * cells);
        let mut sector_index: Vec<u16> = Vec::new();
        for bucket in 0..bucket_count {
            let bucket_speed =
                ((bucket + 1) as f32 / bucket_count as f32) * config.max_speed;
            let reach = config.robot_radius + config.safety_distance(bucket_speed);
            for cell in 0..cells {
                let offset = sector_index.len() as u32;
                if let Some(dir) = direction[cell] {
                    let enlarge = enlargement(distance[cell], reach);
                    let half_width = enlarge + config.sector_angle / 2.0;
                    for sector in 0..histogram_size {
                        let sector_center = (sector as f32 + 0.5) * config.sector_angle;
                        if delta_angle(dir, sector_center).abs() <= half_width {
                            sector_index.push(sector as u16);
                        }
                    }
                }
                let len = sector_index.len() as u32 - offset;
                sector_spans.push((offset, len));
            }
        }

        debug!(
            "geometry tables: {}x{} cells, {} sectors, {} buckets, {} memberships",
            diameter,
            diameter,
            histogram_size,
            bucket_count,
            sector_index.len()
        );

        Self {
            diameter,
            center,
            cell_width: config.cell_width,
            sector_angle: config.sector_angle,
            histogram_size,
            bucket_count,
            distance,
            direction,
            base_mag,
            sector_spans,
            sector_index,
        }
    }

    /// Window side length in cells.
    #[inline]
    pub fn diameter(&self) -> usize {
        self.diameter
    }

    /// Center cell index on both axes.
    #[inline]
    pub fn center(&self) -> usize {
        self.center
    }

    /// Cell edge length (meters).
    #[inline]
    pub fn cell_width(&self) -> f32 {
        self.cell_width
    }

    /// Angular width of one histogram sector (radians).
    #[inline]
    pub fn sector_angle(&self) -> f32 {
        self.sector_angle
    }

    /// Number of histogram sectors.
    #[inline]
    pub fn histogram_size(&self) -> usize {
        self.histogram_size
    }

    /// Number of speed buckets tabulated.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Rows `y < forward_rows()` lie in front of the robot.
    #[inline]
    pub fn forward_rows(&self) -> usize {
        self.diameter.div_ceil(2)
    }

    /// Total cell count of the window.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.diameter * self.diameter
    }

    /// Flat index of cell `(x, y)`.
    #[inline]
    pub fn cell_index(&self, x: usize, y: usize) -> usize {
        x * self.diameter + y
    }

    /// Distance from the window center to cell `(x, y)` (meters).
    #[inline]
    pub fn cell_distance(&self, x: usize, y: usize) -> f32 {
        self.distance[self.cell_index(x, y)]
    }

    /// Direction to cell `(x, y)`; `None` for the center cell.
    #[inline]
    pub fn cell_direction(&self, x: usize, y: usize) -> Option<f32> {
        self.direction[self.cell_index(x, y)]
    }

    /// Obstacle weight baseline of cell `(x, y)`.
    #[inline]
    pub fn cell_base_mag(&self, x: usize, y: usize) -> f32 {
        self.base_mag[self.cell_index(x, y)]
    }

    /// Histogram sectors covered by cell `(x, y)` at a speed bucket.
    #[inline]
    pub fn cell_sectors(&self, bucket: usize, x: usize, y: usize) -> &[u16] {
        let (offset, len) = self.sector_spans[bucket * self.cell_count() + self.cell_index(x, y)];
        &self.sector_index[offset as usize..(offset + len) as usize]
    }

    /// Speed bucket for the given speed under the given ceiling.
    pub fn speed_bucket(&self, speed: f32, current_max_speed: f32) -> usize {
        if self.bucket_count == 1 {
            return 0;
        }
        if current_max_speed <= 0.0 {
            return self.bucket_count - 1;
        }
        let idx = ((speed * 1e3 / current_max_speed) * self.bucket_count as f32).floor() as usize;
        idx.min(self.bucket_count - 1)
    }
}

/// Angular half-width by which an obstacle in a cell must be widened
/// to account for the robot footprint plus safety margin.
///
/// Saturates at π/2 when the cell is closer than the widened
/// footprint itself.
#[inline]
pub fn enlargement(distance: f32, reach: f32) -> f32 {
    if distance > 0.0 {
        (reach / distance).clamp(-1.0, 1.0).asin()
    } else {
        0.0
    }
}

/// Direction from the window center to cell `(x, y)` in the internal
/// frame, by quadrant. Axial cells get exact multiples of π/2; the
/// center cell has no direction.
fn cell_direction(x: usize, y: usize, center: usize) -> Option<f32> {
    let fx = x as f32;
    let fy = y as f32;
    let fc = center as f32;
    if x < center {
        Some(match y.cmp(&center) {
            std::cmp::Ordering::Less => PI - (fc - fy).atan2(fc - fx),
            std::cmp::Ordering::Equal => PI,
            std::cmp::Ordering::Greater => PI + (fy - fc).atan2(fc - fx),
        })
    } else if x == center {
        match y.cmp(&center) {
            std::cmp::Ordering::Less => Some(FRAC_PI_2),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(3.0 * FRAC_PI_2),
        }
    } else {
        Some(match y.cmp(&center) {
            std::cmp::Ordering::Less => (fc - fy).atan2(fx - fc),
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Greater => TWO_PI - (fy - fc).atan2(fx - fc),
        })
    }
}

/// Minimum-turning-radius lookup, rebuilt whenever the speed ceiling
/// changes.
#[derive(Clone, Debug)]
pub struct KinematicTables {
    current_max_speed: f32,
    /// Turning radius indexed by speed in integer mm/s (meters)
    min_turning_radius: Vec<f32>,
}

impl KinematicTables {
    /// Build the turning-radius table for a speed ceiling.
    ///
    /// The ceiling is clamped to `[0, config.max_speed]`. Entry `k`
    /// holds the radius at `k` mm/s, with the turn rate evaluated at
    /// the raw index `k`; where the rate reaches zero the radius is
    /// unbounded and stored as infinity.
    pub fn build(config: &VfhConfig, ceiling: f32) -> Self {
        let current_max_speed = ceiling.clamp(0.0, config.max_speed);
        let entries = (current_max_speed * 1e3) as usize + 1;
        let mut min_turning_radius = Vec::with_capacity(entries);
        for k in 0..entries {
            let speed = k as f32 / 1e3;
            let turnrate = config.max_turnrate(k as f32);
            let tangent = turnrate.tan();
            let radius = if tangent > f32::EPSILON {
                (speed / tangent) * config.min_turn_radius_safety_factor
            } else {
                f32::INFINITY
            };
            min_turning_radius.push(radius);
        }
        debug!(
            "kinematic tables: ceiling {:.3} m/s, {} radius entries",
            current_max_speed, entries
        );
        Self {
            current_max_speed,
            min_turning_radius,
        }
    }

    /// Active ceiling on commanded linear velocity (m/s).
    #[inline]
    pub fn current_max_speed(&self) -> f32 {
        self.current_max_speed
    }

    /// Minimum turning radius at the given speed (meters).
    #[inline]
    pub fn min_turning_radius(&self, speed: f32) -> f32 {
        let k = (speed.max(0.0) * 1e3) as usize;
        self.min_turning_radius[k.min(self.min_turning_radius.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> GeometryTables {
        GeometryTables::build(&VfhConfig::default())
    }

    #[test]
    fn test_distance_zero_only_at_center() {
        let t = tables();
        let c = t.center();
        assert_eq!(t.cell_distance(c, c), 0.0);
        for x in 0..t.diameter() {
            for y in 0..t.diameter() {
                if x != c || y != c {
                    assert!(t.cell_distance(x, y) > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_axial_directions_exact() {
        let t = tables();
        let c = t.center();
        assert_eq!(t.cell_direction(c, c), None);
        assert_eq!(t.cell_direction(c, 0), Some(FRAC_PI_2));
        assert_eq!(t.cell_direction(c, t.diameter() - 1), Some(3.0 * FRAC_PI_2));
        assert_eq!(t.cell_direction(0, c), Some(PI));
        assert_eq!(t.cell_direction(t.diameter() - 1, c), Some(0.0));
    }

    #[test]
    fn test_quadrant_directions() {
        let t = tables();
        let c = t.center();
        // front-left diagonal points into the second quadrant
        let d = t.cell_direction(c - 10, c - 10).unwrap();
        assert!((d - 3.0 * PI / 4.0).abs() < 1e-5);
        // front-right diagonal into the first
        let d = t.cell_direction(c + 10, c - 10).unwrap();
        assert!((d - PI / 4.0).abs() < 1e-5);
        // rear diagonals mirror into the fourth quadrant
        let d = t.cell_direction(c + 10, c + 10).unwrap();
        assert!((d - 7.0 * PI / 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_histogram_covers_full_circle() {
        let t = tables();
        let cfg = VfhConfig::default();
        let covered = t.histogram_size() as f32 * cfg.sector_angle;
        assert!((covered - TWO_PI).abs() <= cfg.sector_angle);
        assert_eq!(t.histogram_size(), 72);
    }

    #[test]
    fn test_base_mag_decays_with_distance() {
        let t = tables();
        let c = t.center();
        // straight-ahead ray, one cell per 0.1 m
        let near = t.cell_base_mag(c, c - 1);
        let far = t.cell_base_mag(c, 0);
        assert!(near > far);
        // weight at 0.1 m matches the published curve
        assert!((near - (3e3f32 - 100.0).powi(4) / 1e8).abs() < 1.0);
    }

    #[test]
    fn test_sector_membership_matches_enlargement() {
        let cfg = VfhConfig::default();
        let t = tables();
        let c = t.center();
        // one membership per sector the enlarged cell overlaps
        for &(x, y) in &[(c, 5usize), (c + 10, 10usize), (c - 7, 3usize)] {
            let reach = cfg.robot_radius + cfg.safety_distance(cfg.max_speed);
            let enlarge = enlargement(t.cell_distance(x, y), reach);
            let expected = 2.0 * enlarge / cfg.sector_angle;
            let got = t.cell_sectors(t.bucket_count() - 1, x, y).len() as f32;
            assert!(
                (got - expected).abs() <= 2.0,
                "cell ({x},{y}): {got} sectors vs expected {expected:.1}"
            );
        }
    }

    #[test]
    fn test_center_cell_has_no_sectors() {
        let t = tables();
        let c = t.center();
        for bucket in 0..t.bucket_count() {
            assert!(t.cell_sectors(bucket, c, c).is_empty());
        }
    }

    #[test]
    fn test_single_bucket_for_fixed_safety_distance() {
        let mut cfg = VfhConfig::default();
        cfg.max_safety_distance = cfg.zero_safety_distance;
        let t = GeometryTables::build(&cfg);
        assert_eq!(t.bucket_count(), 1);
    }

    #[test]
    fn test_speed_bucket_saturates() {
        let t = tables();
        assert_eq!(t.speed_bucket(0.0, 0.4), 0);
        // the mm/s scaling saturates almost immediately
        assert_eq!(t.speed_bucket(0.2, 0.4), t.bucket_count() - 1);
        assert_eq!(t.speed_bucket(0.4, 0.4), t.bucket_count() - 1);
    }

    #[test]
    fn test_turning_radius_table() {
        let cfg = VfhConfig::default();
        let k = KinematicTables::build(&cfg, cfg.max_speed);
        assert_eq!(k.min_turning_radius(0.0), 0.0);
        // index 1 still sees a positive turn rate
        let crawl = k.min_turning_radius(0.001);
        assert!(crawl > 0.0 && crawl.is_finite());
        // the rate is evaluated at the raw index, so it saturates to
        // zero from index 2 upward and the radius becomes unbounded
        assert_eq!(k.min_turning_radius(0.002), f32::INFINITY);
        assert_eq!(k.min_turning_radius(0.4), f32::INFINITY);
    }

    #[test]
    fn test_turning_radius_index_clamps() {
        let cfg = VfhConfig::default();
        let k = KinematicTables::build(&cfg, cfg.max_speed);
        // speeds past the ceiling reuse the last entry
        assert_eq!(k.min_turning_radius(5.0), k.min_turning_radius(0.4));
    }

    #[test]
    fn test_ceiling_clamped_to_max_speed() {
        let cfg = VfhConfig::default();
        let k = KinematicTables::build(&cfg, 10.0);
        assert!((k.current_max_speed() - cfg.max_speed).abs() < 1e-6);
    }

    #[test]
    fn test_enlargement_saturates_inside_reach() {
        assert_eq!(enlargement(0.0, 0.3), 0.0);
        assert!((enlargement(0.1, 0.3) - FRAC_PI_2).abs() < 1e-6);
        let e = enlargement(2.0, 0.3);
        assert!(e > 0.0 && e < 0.2);
    }
}
