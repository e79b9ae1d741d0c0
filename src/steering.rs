//! Opening extraction and candidate heading selection.
//!
//! After masking, the binary histogram is a ring of free and blocked
//! sectors. Maximal free runs ("openings") yield candidate headings
//! with per-candidate speed caps; a two-term weighted cost picks the
//! winner among them.

use crate::angles::{delta_angle, normalize_angle_positive};
use tracing::debug;

/// Openings narrower than this are ignored entirely.
const VERY_NARROW_OPENING: f32 = 0.17453292; // 10 deg
/// Openings narrower than this get a single centered candidate.
const NARROW_OPENING: f32 = 1.3962634; // 80 deg
/// Border offset for the extra candidates of a wide opening.
const WIDE_BORDER_OFFSET: f32 = 0.6981317; // 40 deg

/// A maximal run of free sectors, walking counter-clockwise.
#[derive(Clone, Copy, Debug)]
pub struct Opening {
    /// Angle of the first free sector (clockwise border)
    pub start: f32,
    /// Angle of the last free sector (counter-clockwise border)
    pub end: f32,
}

impl Opening {
    /// Angular width of the opening.
    #[inline]
    pub fn width(&self) -> f32 {
        delta_angle(self.start, self.end).abs()
    }

    /// Heading through the middle of the opening.
    #[inline]
    pub fn midpoint(&self) -> f32 {
        normalize_angle_positive(self.start + delta_angle(self.start, self.end) / 2.0)
    }
}

/// A candidate heading with the speed cap it allows.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    /// Heading in the internal frame, normalized to [0, 2π)
    pub angle: f32,
    /// Speed cap when steering toward this heading (m/s)
    pub max_speed: f32,
}

/// Index of the first blocked sector in the forward 180°, if any.
///
/// `None` means the entire forward arc is free and the desired
/// direction can be taken directly.
pub fn first_blocked_forward(binary: &[f32]) -> Option<usize> {
    binary[..binary.len() / 2].iter().position(|&h| h > 0.5)
}

/// Collect openings by walking one full revolution from the first
/// blocked sector.
///
/// Starting on a blocked sector guarantees every free run is entered
/// and left within the walk, including runs that wrap past 2π.
pub fn extract_openings(binary: &[f32], start: usize, sector_angle: f32, out: &mut Vec<Opening>) {
    out.clear();
    let size = binary.len();
    let mut open_since: Option<f32> = None;
    for i in start..=start + size {
        let idx = i % size;
        let blocked = binary[idx] > 0.5;
        match open_since {
            None if !blocked => {
                open_since = Some(idx as f32 * sector_angle);
            }
            Some(opened) if blocked => {
                let end = normalize_angle_positive((idx as f32 - 1.0) * sector_angle);
                out.push(Opening { start: opened, end });
                open_since = None;
            }
            _ => {}
        }
    }
}

/// Expand openings into candidate headings.
///
/// Very narrow openings are discarded. Narrow openings yield their
/// midpoint under the narrow-opening cap. Wide openings yield the
/// midpoint at full speed, a candidate 40° inside each border under
/// the wide-opening cap, and the desired direction itself when it
/// falls strictly between the two border candidates.
pub fn collect_candidates(
    openings: &[Opening],
    desired_direction: f32,
    current_max_speed: f32,
    narrow_cap: f32,
    wide_cap: f32,
    out: &mut Vec<Candidate>,
) {
    out.clear();
    for opening in openings {
        let width = opening.width();
        if width < VERY_NARROW_OPENING {
            continue;
        }
        if width < NARROW_OPENING {
            out.push(Candidate {
                angle: opening.midpoint(),
                max_speed: current_max_speed.min(narrow_cap),
            });
        } else {
            out.push(Candidate {
                angle: opening.midpoint(),
                max_speed: current_max_speed,
            });
            let near_start = normalize_angle_positive(opening.start + WIDE_BORDER_OFFSET);
            let near_end = normalize_angle_positive(opening.end - WIDE_BORDER_OFFSET);
            let border_cap = current_max_speed.min(wide_cap);
            out.push(Candidate {
                angle: near_start,
                max_speed: border_cap,
            });
            out.push(Candidate {
                angle: near_end,
                max_speed: border_cap,
            });
            if delta_angle(desired_direction, near_start) < 0.0
                && delta_angle(desired_direction, near_end) > 0.0
            {
                out.push(Candidate {
                    angle: normalize_angle_positive(desired_direction),
                    max_speed: border_cap,
                });
            }
        }
    }
    debug!(
        "{} openings -> {} candidate headings",
        openings.len(),
        out.len()
    );
}

/// Pick the candidate minimizing the weighted two-term cost.
///
/// Cost is goal misalignment weighted by `desired_weight` plus
/// deviation from the previously picked heading weighted by
/// `current_weight`. Ties keep the first candidate encountered.
pub fn select_candidate(
    candidates: &[Candidate],
    desired_direction: f32,
    last_picked_direction: f32,
    desired_weight: f32,
    current_weight: f32,
) -> Option<Candidate> {
    let mut best: Option<(f32, Candidate)> = None;
    for &candidate in candidates {
        let cost = desired_weight * delta_angle(desired_direction, candidate.angle).abs()
            + current_weight * delta_angle(last_picked_direction, candidate.angle).abs();
        if best.map_or(true, |(c, _)| cost < c) {
            best = Some((cost, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const SECTOR: f32 = 0.087266462; // 5 deg
    const SIZE: usize = 72;

    fn binary_with_blocked(blocked: &[std::ops::Range<usize>]) -> Vec<f32> {
        let mut bins = vec![0.0; SIZE];
        for range in blocked {
            for i in range.clone() {
                bins[i] = 1.0;
            }
        }
        bins
    }

    #[test]
    fn test_first_blocked_scans_forward_half_only() {
        let bins = binary_with_blocked(&[40..50]);
        assert_eq!(first_blocked_forward(&bins), None);
        let bins = binary_with_blocked(&[10..12]);
        assert_eq!(first_blocked_forward(&bins), Some(10));
    }

    #[test]
    fn test_extract_single_opening() {
        // blocked everywhere except sectors 20..30
        let mut bins = vec![1.0; SIZE];
        for b in &mut bins[20..30] {
            *b = 0.0;
        }
        let mut openings = Vec::new();
        extract_openings(&bins, 0, SECTOR, &mut openings);
        assert_eq!(openings.len(), 1);
        assert!((openings[0].start - 20.0 * SECTOR).abs() < 1e-5);
        assert!((openings[0].end - 29.0 * SECTOR).abs() < 1e-5);
    }

    #[test]
    fn test_extract_wrapping_opening() {
        // free run wraps from sector 70 through 0 to 4
        let mut bins = vec![1.0; SIZE];
        for i in (70..72).chain(0..5) {
            bins[i] = 0.0;
        }
        let mut openings = Vec::new();
        extract_openings(&bins, 10, SECTOR, &mut openings);
        assert_eq!(openings.len(), 1);
        assert!((openings[0].start - 70.0 * SECTOR).abs() < 1e-5);
        assert!((openings[0].end - 4.0 * SECTOR).abs() < 1e-5);
    }

    #[test]
    fn test_very_narrow_opening_discarded() {
        let opening = Opening {
            start: FRAC_PI_2,
            end: FRAC_PI_2 + SECTOR, // 5 deg wide
        };
        let mut candidates = Vec::new();
        collect_candidates(&[opening], FRAC_PI_2, 0.4, 0.05, 0.4, &mut candidates);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_narrow_opening_single_midpoint() {
        let opening = Opening {
            start: 1.0,
            end: 1.0 + 0.5, // ~29 deg
        };
        let mut candidates = Vec::new();
        collect_candidates(&[opening], FRAC_PI_2, 0.4, 0.05, 0.4, &mut candidates);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].angle - 1.25).abs() < 1e-5);
        assert!((candidates[0].max_speed - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_wide_opening_candidates() {
        let opening = Opening {
            start: 0.0,
            end: std::f32::consts::PI, // 180 deg
        };
        let desired = FRAC_PI_2;
        let mut candidates = Vec::new();
        collect_candidates(&[opening], desired, 0.4, 0.05, 0.3, &mut candidates);
        // midpoint, both borders, and the goal direction inside them
        assert_eq!(candidates.len(), 4);
        assert!((candidates[0].angle - FRAC_PI_2).abs() < 1e-5);
        assert!((candidates[0].max_speed - 0.4).abs() < 1e-6);
        assert!((candidates[1].angle - WIDE_BORDER_OFFSET).abs() < 1e-5);
        assert!((candidates[1].max_speed - 0.3).abs() < 1e-6);
        assert!((candidates[3].angle - desired).abs() < 1e-5);
    }

    #[test]
    fn test_goal_outside_borders_not_added() {
        let opening = Opening {
            start: 0.0,
            end: std::f32::consts::PI,
        };
        // goal off to the left, outside the border candidates
        let desired = 3.0;
        let mut candidates = Vec::new();
        collect_candidates(&[opening], desired, 0.4, 0.05, 0.3, &mut candidates);
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_select_prefers_goal_alignment() {
        let candidates = [
            Candidate {
                angle: 0.5,
                max_speed: 0.4,
            },
            Candidate {
                angle: FRAC_PI_2,
                max_speed: 0.1,
            },
        ];
        let picked =
            select_candidate(&candidates, FRAC_PI_2, FRAC_PI_2, 5.0, 1.0).unwrap();
        assert!((picked.angle - FRAC_PI_2).abs() < 1e-6);
        assert!((picked.max_speed - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_select_ties_keep_first() {
        let candidates = [
            Candidate {
                angle: FRAC_PI_2 - 0.2,
                max_speed: 0.1,
            },
            Candidate {
                angle: FRAC_PI_2 + 0.2,
                max_speed: 0.4,
            },
        ];
        let picked =
            select_candidate(&candidates, FRAC_PI_2, FRAC_PI_2, 5.0, 1.0).unwrap();
        assert!((picked.angle - (FRAC_PI_2 - 0.2)).abs() < 1e-6);
    }

    #[test]
    fn test_select_empty_returns_none() {
        assert!(select_candidate(&[], FRAC_PI_2, FRAC_PI_2, 5.0, 1.0).is_none());
    }
}
