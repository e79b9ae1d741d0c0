//! Stateful avoidance controller driven once per control tick.

use std::f32::consts::FRAC_PI_2;
use std::time::Instant;

use tracing::{debug, warn};

use crate::angles::{normalize_angle, normalize_angle_positive};
use crate::config::VfhConfig;
use crate::error::Result;
use crate::grid::{GeometryTables, KinematicTables};
use crate::histogram;
use crate::motion;
use crate::scan::RangeScan;
use crate::steering::{self, Candidate, Opening};

/// Target relative to the robot for one control tick.
#[derive(Clone, Copy, Debug)]
pub struct Goal {
    /// Relative direction (radians): 0 = straight ahead, counter-
    /// clockwise positive (toward the robot's left)
    pub direction: f32,
    /// Distance to the target (meters)
    pub distance: f32,
    /// Arrival tolerance around the target (meters)
    pub distance_tolerance: f32,
}

/// Motion command produced by one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityCommand {
    /// Commanded linear velocity, in [0, current max speed] (m/s)
    pub linear: f32,
    /// Commanded angular velocity in (-π, π] (rad/s)
    pub angular: f32,
}

/// Reactive local obstacle-avoidance controller.
///
/// Construct once from a [`VfhConfig`] (this builds all precomputed
/// tables), then call [`update`](Self::update) once per control tick.
/// The controller owns all per-tick scratch and is single-threaded by
/// design; it never allocates after construction.
pub struct VfhController {
    config: VfhConfig,
    tables: GeometryTables,
    kinematics: KinematicTables,

    // per-tick scratch, reused across ticks
    cell_mag: Vec<f32>,
    histogram: Vec<f32>,
    last_binary: Vec<f32>,
    openings: Vec<Opening>,
    candidates: Vec<Candidate>,

    // state carried between ticks
    picked_direction: f32,
    last_picked_direction: f32,
    max_speed_for_picked: f32,
    blocked_circle_radius: f32,
    last_chosen_linear: f32,
    last_update: Option<Instant>,
}

impl VfhController {
    /// Create a controller, validating the bundle and building the
    /// geometry and kinematic tables.
    pub fn new(config: VfhConfig) -> Result<Self> {
        config.validate()?;
        let tables = GeometryTables::build(&config);
        let kinematics = KinematicTables::build(&config, config.max_speed);
        let cells = tables.cell_count();
        let sectors = tables.histogram_size();
        Ok(Self {
            config,
            tables,
            kinematics,
            cell_mag: vec![0.0; cells],
            histogram: vec![0.0; sectors],
            // everything starts classified as blocked until a scan
            // proves otherwise
            last_binary: vec![1.0; sectors],
            openings: Vec::with_capacity(8),
            candidates: Vec::with_capacity(16),
            picked_direction: FRAC_PI_2,
            last_picked_direction: FRAC_PI_2,
            max_speed_for_picked: 0.0,
            blocked_circle_radius: 0.0,
            last_chosen_linear: 0.0,
            last_update: None,
        })
    }

    /// Lower (or restore) the ceiling on commanded linear velocity.
    ///
    /// Rebuilds the turning-radius table; the ceiling is clamped to
    /// the configured `max_speed`.
    pub fn set_current_max_speed(&mut self, ceiling: f32) {
        self.kinematics = KinematicTables::build(&self.config, ceiling);
    }

    /// Active ceiling on commanded linear velocity (m/s).
    pub fn current_max_speed(&self) -> f32 {
        self.kinematics.current_max_speed()
    }

    /// The parameter bundle this controller was built from.
    pub fn config(&self) -> &VfhConfig {
        &self.config
    }

    /// Run one control tick.
    ///
    /// `current_linear_x` is the measured linear velocity (negative
    /// values are treated as zero); the effective speed used for all
    /// speed-dependent lookups is the maximum of the measurement and
    /// the previous commanded speed, so an optimistic set point never
    /// relaxes the safety margins.
    pub fn update(
        &mut self,
        scan: &RangeScan,
        current_linear_x: f32,
        goal: Goal,
    ) -> VelocityCommand {
        let now = Instant::now();
        let dt = self
            .last_update
            .map(|last| now.duration_since(last).as_secs_f32());
        self.last_update = Some(now);

        // goal direction arrives with 0 = ahead; the histogram frame
        // puts straight-ahead at pi/2
        let desired = normalize_angle_positive(goal.direction + FRAC_PI_2);
        let speed = current_linear_x.max(0.0).max(self.last_chosen_linear);

        let safety_reach = self.config.robot_radius + self.config.safety_distance(speed);
        let safe =
            histogram::compute_cell_magnitudes(&self.tables, scan, safety_reach, &mut self.cell_mag);
        if safe {
            let bucket = self
                .tables
                .speed_bucket(speed, self.kinematics.current_max_speed());
            histogram::build_primary(&self.tables, bucket, &self.cell_mag, &mut self.histogram);
            histogram::binarize_with_hysteresis(
                &mut self.histogram,
                &mut self.last_binary,
                self.config.free_cutoff(speed),
                self.config.obs_cutoff(speed),
            );
            let turning_radius = self.kinematics.min_turning_radius(speed);
            self.blocked_circle_radius =
                turning_radius + self.config.robot_radius + self.config.safety_distance(speed);
            let limits = histogram::mask_unreachable(
                &self.tables,
                &self.cell_mag,
                &mut self.histogram,
                turning_radius,
                self.blocked_circle_radius,
            );
            debug!(
                "reachable arc [{:.3}, {:.3}] rad, blocked circle {:.3} m",
                limits.phi_right, limits.phi_left, self.blocked_circle_radius
            );
            self.select_direction(desired);
        } else {
            // something is inside the safety envelope: brake hard and
            // turn on the spot
            warn!("obstacle inside safety envelope, braking");
            self.histogram.fill(1.0);
            self.picked_direction = self.last_picked_direction;
            self.max_speed_for_picked = 0.0;
        }

        let mut increment = motion::speed_increment(dt, self.config.max_acceleration);
        if motion::cannot_turn_to_goal(
            desired,
            goal.distance,
            goal.distance_tolerance,
            self.blocked_circle_radius,
        ) {
            // the goal is too close to turn into at this speed
            increment = -increment;
        }
        let target = (self.last_chosen_linear + increment).min(self.max_speed_for_picked);
        let max_turnrate = self.config.max_turnrate(speed);
        let (linear, turnrate) = motion::map_motion(self.picked_direction, target, max_turnrate);
        self.last_chosen_linear = linear;

        let command = VelocityCommand {
            linear,
            angular: normalize_angle(turnrate),
        };
        debug!(
            "tick: desired {:.3}, picked {:.3}, cap {:.2}, cmd ({:.3} m/s, {:.3} rad/s)",
            desired,
            self.picked_direction,
            self.max_speed_for_picked,
            command.linear,
            command.angular
        );
        command
    }

    /// Pick the heading for this tick from the masked histogram.
    fn select_direction(&mut self, desired: f32) {
        match steering::first_blocked_forward(&self.histogram) {
            None => {
                // nothing ahead: head straight for the goal
                self.picked_direction = desired;
                self.max_speed_for_picked = self.kinematics.current_max_speed();
                debug!("forward arc clear, full speed toward goal");
            }
            Some(start) => {
                steering::extract_openings(
                    &self.histogram,
                    start,
                    self.tables.sector_angle(),
                    &mut self.openings,
                );
                steering::collect_candidates(
                    &self.openings,
                    desired,
                    self.kinematics.current_max_speed(),
                    self.config.max_speed_narrow_opening,
                    self.config.max_speed_wide_opening,
                    &mut self.candidates,
                );
                match steering::select_candidate(
                    &self.candidates,
                    desired,
                    self.last_picked_direction,
                    self.config.desired_direction_weight,
                    self.config.current_direction_weight,
                ) {
                    Some(candidate) => {
                        self.picked_direction = candidate.angle;
                        self.max_speed_for_picked = candidate.max_speed;
                    }
                    None => {
                        // hemmed in on all sides: hold the heading and
                        // brake to a spin
                        self.picked_direction = self.last_picked_direction;
                        self.max_speed_for_picked = 0.0;
                        debug!("no viable opening, braking to turn in place");
                    }
                }
            }
        }
        self.last_picked_direction = self.picked_direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_validates_config() {
        let mut config = VfhConfig::default();
        config.cell_width = -1.0;
        assert!(VfhController::new(config).is_err());
        assert!(VfhController::new(VfhConfig::default()).is_ok());
    }

    #[test]
    fn test_speed_ceiling_clamps_to_max_speed() {
        let mut controller = VfhController::new(VfhConfig::default()).unwrap();
        controller.set_current_max_speed(10.0);
        assert!((controller.current_max_speed() - 0.4).abs() < 1e-6);
        controller.set_current_max_speed(0.1);
        assert!((controller.current_max_speed() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_first_tick_clear_field() {
        let mut controller = VfhController::new(VfhConfig::default()).unwrap();
        let goal = Goal {
            direction: 0.0, // shifts to straight ahead internally
            distance: 5.0,
            distance_tolerance: 0.1,
        };
        let cmd = controller.update(&RangeScan::uniform(10.0), 0.0, goal);
        assert!((cmd.linear - 0.01).abs() < 1e-6);
        assert_eq!(cmd.angular, 0.0);
    }
}
