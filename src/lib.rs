//! # parihara-nav
//!
//! Reactive local obstacle avoidance for differentially-driven robots
//! with a planar range sensor, in the Vector Field Histogram (VFH+)
//! family.
//!
//! ## Overview
//!
//! Each control tick converts a 361-sample forward range scan into a
//! motion command through a fixed pipeline:
//!
//! 1. **Cell magnitudes** - project the scan onto a precomputed cell
//!    window and weight occupied cells by proximity
//! 2. **Primary histogram** - sum weights per angular sector,
//!    enlarging obstacles by the robot footprint and safety margin
//! 3. **Binary histogram** - threshold with hysteresis against the
//!    previous tick
//! 4. **Masked histogram** - block sectors outside the arc reachable
//!    at the current speed and minimum turning radius
//! 5. **Steering** - extract free openings, generate candidate
//!    headings with speed caps, pick the cheapest under a two-term
//!    goal/commitment cost
//! 6. **Motion** - ramp linear velocity under the acceleration limit
//!    and map the heading onto a bounded turn rate
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parihara_nav::{Goal, RangeScan, VfhConfig, VfhController};
//!
//! let mut controller = VfhController::new(VfhConfig::default())?;
//!
//! // once per control tick (typically 10-20 Hz)
//! let scan = RangeScan::new(ranges);
//! let goal = Goal { direction, distance, distance_tolerance: 0.1 };
//! let cmd = controller.update(&scan, measured_linear, goal);
//! drive(cmd.linear, cmd.angular);
//! ```
//!
//! ## Angular Convention
//!
//! The histogram pipeline works in a non-standard frame:
//!
//! ```text
//!          π/2 (ahead)
//!           ↑
//!           │
//!   π ──────┼────── 0 (robot's right)
//! (behind)  │
//!           ↓
//!          3π/2 (left)
//! ```
//!
//! Goal directions are supplied in the standard "0 = right,
//! counter-clockwise positive" frame and shifted internally. Scan
//! sample `i` covers the angle `i · 0.5°` from the robot's right
//! (sample 0) to its left (sample 360).
//!
//! The controller is single-threaded and synchronous: `update` is a
//! plain call returning one command pair, with the caller pacing the
//! ticks.

#![warn(missing_docs)]

pub mod angles;
pub mod config;
pub mod controller;
pub mod error;
pub mod grid;
pub mod histogram;
pub mod motion;
pub mod scan;
pub mod steering;

pub use config::VfhConfig;
pub use controller::{Goal, VelocityCommand, VfhController};
pub use error::{PariharaError, Result};
pub use scan::{RangeScan, SCAN_SAMPLES};
pub use steering::{Candidate, Opening};
