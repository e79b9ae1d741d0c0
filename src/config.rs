//! Configuration for the avoidance controller

use crate::error::{PariharaError, Result};
use serde::Deserialize;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

/// Parameter bundle for [`VfhController`](crate::VfhController).
///
/// All angles are radians, all distances meters, all speeds m/s.
/// Every field has a working default matching a small indoor
/// differential-drive robot, so `VfhConfig::default()` is a usable
/// starting point and TOML files only need to override what differs.
#[derive(Clone, Debug, Deserialize)]
pub struct VfhConfig {
    /// Cell edge length of the local obstacle window (meters)
    #[serde(default = "default_cell_width")]
    pub cell_width: f32,

    /// Side length of the local window in cells (odd recommended)
    #[serde(default = "default_window_diameter")]
    pub window_diameter: usize,

    /// Angular resolution of the polar histogram (radians)
    #[serde(default = "default_sector_angle")]
    pub sector_angle: f32,

    /// Absolute ceiling on commanded linear velocity (m/s)
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,

    /// Speed cap when steering through a narrow opening (m/s)
    #[serde(default = "default_max_speed_narrow_opening")]
    pub max_speed_narrow_opening: f32,

    /// Speed cap for the border candidates of a wide opening (m/s)
    #[serde(default = "default_max_speed_wide_opening")]
    pub max_speed_wide_opening: f32,

    /// Safety margin at standstill (meters)
    #[serde(default = "default_zero_safety_distance")]
    pub zero_safety_distance: f32,

    /// Safety margin reached at 1 m/s (meters); linearly interpolated
    #[serde(default = "default_max_safety_distance")]
    pub max_safety_distance: f32,

    /// Maximum turn rate at standstill (rad/s)
    #[serde(default = "default_zero_max_turnrate")]
    pub zero_max_turnrate: f32,

    /// Turn-rate interpolation endpoint at 1 m/s (rad/s)
    #[serde(default = "default_max_max_turnrate")]
    pub max_max_turnrate: f32,

    /// Binary-histogram free (low) threshold at standstill
    #[serde(default = "default_zero_free_space_cutoff")]
    pub zero_free_space_cutoff: f32,

    /// Free-threshold interpolation endpoint at 1 m/s
    #[serde(default = "default_max_free_space_cutoff")]
    pub max_free_space_cutoff: f32,

    /// Binary-histogram obstacle (high) threshold at standstill
    #[serde(default = "default_zero_obs_cutoff")]
    pub zero_obs_cutoff: f32,

    /// Obstacle-threshold interpolation endpoint at 1 m/s
    #[serde(default = "default_max_obs_cutoff")]
    pub max_obs_cutoff: f32,

    /// Linear acceleration limit (m/s²)
    #[serde(default = "default_max_acceleration")]
    pub max_acceleration: f32,

    /// Cost weight for alignment with the goal direction
    #[serde(default = "default_desired_direction_weight")]
    pub desired_direction_weight: f32,

    /// Cost weight for commitment to the previously picked heading
    #[serde(default = "default_current_direction_weight")]
    pub current_direction_weight: f32,

    /// Multiplier on the computed minimum turning radius
    #[serde(default = "default_min_turn_radius_safety_factor")]
    pub min_turn_radius_safety_factor: f32,

    /// Physical footprint radius of the robot (meters)
    #[serde(default = "default_robot_radius")]
    pub robot_radius: f32,
}

impl Default for VfhConfig {
    fn default() -> Self {
        Self {
            cell_width: default_cell_width(),
            window_diameter: default_window_diameter(),
            sector_angle: default_sector_angle(),
            max_speed: default_max_speed(),
            max_speed_narrow_opening: default_max_speed_narrow_opening(),
            max_speed_wide_opening: default_max_speed_wide_opening(),
            zero_safety_distance: default_zero_safety_distance(),
            max_safety_distance: default_max_safety_distance(),
            zero_max_turnrate: default_zero_max_turnrate(),
            max_max_turnrate: default_max_max_turnrate(),
            zero_free_space_cutoff: default_zero_free_space_cutoff(),
            max_free_space_cutoff: default_max_free_space_cutoff(),
            zero_obs_cutoff: default_zero_obs_cutoff(),
            max_obs_cutoff: default_max_obs_cutoff(),
            max_acceleration: default_max_acceleration(),
            desired_direction_weight: default_desired_direction_weight(),
            current_direction_weight: default_current_direction_weight(),
            min_turn_radius_safety_factor: default_min_turn_radius_safety_factor(),
            robot_radius: default_robot_radius(),
        }
    }
}

// Default value functions
fn default_cell_width() -> f32 {
    0.1
}
fn default_window_diameter() -> usize {
    60
}
fn default_sector_angle() -> f32 {
    5f32.to_radians()
}
fn default_max_speed() -> f32 {
    0.4
}
fn default_max_speed_narrow_opening() -> f32 {
    5e-2
}
fn default_max_speed_wide_opening() -> f32 {
    0.4
}
fn default_zero_safety_distance() -> f32 {
    1e-2
}
fn default_max_safety_distance() -> f32 {
    0.3
}
fn default_zero_max_turnrate() -> f32 {
    80f32.to_radians()
}
fn default_max_max_turnrate() -> f32 {
    40f32.to_radians()
}
fn default_zero_free_space_cutoff() -> f32 {
    4e6
}
fn default_max_free_space_cutoff() -> f32 {
    2e6
}
fn default_zero_obs_cutoff() -> f32 {
    4e6
}
fn default_max_obs_cutoff() -> f32 {
    2e6
}
fn default_max_acceleration() -> f32 {
    0.1
}
fn default_desired_direction_weight() -> f32 {
    5.0
}
fn default_current_direction_weight() -> f32 {
    1.0
}
fn default_min_turn_radius_safety_factor() -> f32 {
    1.0
}
fn default_robot_radius() -> f32 {
    0.2
}

impl VfhConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VfhConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the bundle describes a buildable controller.
    ///
    /// Rejects geometry the precomputed tables cannot represent and
    /// kinematic limits outside the turning-radius model's domain
    /// (`tan` of the turn rate must stay positive and finite).
    pub fn validate(&self) -> Result<()> {
        if self.cell_width <= 0.0 {
            return Err(PariharaError::Config(format!(
                "cell_width must be positive, got {}",
                self.cell_width
            )));
        }
        if self.window_diameter < 3 {
            return Err(PariharaError::Config(format!(
                "window_diameter must be at least 3 cells, got {}",
                self.window_diameter
            )));
        }
        if !(1e-3..=FRAC_PI_2).contains(&self.sector_angle) {
            return Err(PariharaError::Config(format!(
                "sector_angle must be in [0.001, pi/2] rad, got {}",
                self.sector_angle
            )));
        }
        if self.max_speed <= 0.0 {
            return Err(PariharaError::Config(format!(
                "max_speed must be positive, got {}",
                self.max_speed
            )));
        }
        if self.zero_max_turnrate <= 0.0 || self.zero_max_turnrate >= FRAC_PI_2 {
            return Err(PariharaError::Config(format!(
                "zero_max_turnrate must be in (0, pi/2) rad/s, got {}",
                self.zero_max_turnrate
            )));
        }
        if self.max_max_turnrate < 0.0 || self.max_max_turnrate > self.zero_max_turnrate {
            return Err(PariharaError::Config(format!(
                "max_max_turnrate must be in [0, zero_max_turnrate], got {}",
                self.max_max_turnrate
            )));
        }
        if self.max_acceleration <= 0.0 {
            return Err(PariharaError::Config(format!(
                "max_acceleration must be positive, got {}",
                self.max_acceleration
            )));
        }
        if self.robot_radius <= 0.0 {
            return Err(PariharaError::Config(format!(
                "robot_radius must be positive, got {}",
                self.robot_radius
            )));
        }
        if self.zero_safety_distance < 0.0 || self.max_safety_distance < self.zero_safety_distance {
            return Err(PariharaError::Config(format!(
                "safety distances must satisfy 0 <= zero ({}) <= max ({})",
                self.zero_safety_distance, self.max_safety_distance
            )));
        }
        if self.desired_direction_weight < 0.0 || self.current_direction_weight < 0.0 {
            return Err(PariharaError::Config(
                "direction weights must be non-negative".to_string(),
            ));
        }
        if self.min_turn_radius_safety_factor <= 0.0 {
            return Err(PariharaError::Config(format!(
                "min_turn_radius_safety_factor must be positive, got {}",
                self.min_turn_radius_safety_factor
            )));
        }
        Ok(())
    }

    /// Safety margin at the given speed (meters).
    ///
    /// Linear in speed between the standstill and 1 m/s endpoints,
    /// clamped below at zero.
    #[inline]
    pub fn safety_distance(&self, speed: f32) -> f32 {
        let d = self.zero_safety_distance
            + speed * (self.max_safety_distance - self.zero_safety_distance);
        d.max(0.0)
    }

    /// Maximum turn rate at the given speed (rad/s).
    ///
    /// Monotonically non-increasing in speed, clamped below at zero.
    #[inline]
    pub fn max_turnrate(&self, speed: f32) -> f32 {
        let t =
            self.zero_max_turnrate - speed * (self.zero_max_turnrate - self.max_max_turnrate);
        t.max(0.0)
    }

    /// Binary-histogram free (low) threshold at the given speed.
    #[inline]
    pub fn free_cutoff(&self, speed: f32) -> f32 {
        self.zero_free_space_cutoff
            - speed * (self.zero_free_space_cutoff - self.max_free_space_cutoff)
    }

    /// Binary-histogram obstacle (high) threshold at the given speed.
    #[inline]
    pub fn obs_cutoff(&self, speed: f32) -> f32 {
        self.zero_obs_cutoff - speed * (self.zero_obs_cutoff - self.max_obs_cutoff)
    }
}
