//! # Teleop input shaper
//!
//! Maps raw joystick axes into a chassis velocity command. Translation is
//! deadbanded, remapped so the deadband edge is zero, passed through an
//! optional response curve and optionally snapped to the nearest 45 degree
//! direction.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

pub use params::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;
use util::maths::{ang_dist, lin_map};

use crate::kinematics::ChassisSpeeds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw joystick input, each axis nominally in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TeleopInput {
    /// Forward
    pub x: f64,

    /// Left
    pub y: f64,

    /// Counter-clockwise
    pub rot: f64,

    /// Use the slow translation power
    #[serde(default)]
    pub slow: bool,
}

/// The teleop input shaper.
#[derive(Debug, Clone)]
pub struct InputShaper {
    params: TeleopParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputShaper {
    pub fn new(params: TeleopParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TeleopParams {
        &self.params
    }

    /// True if the shaped output is a field frame command.
    pub fn field_relative(&self) -> bool {
        self.params.field_relative
    }

    /// Shape the input into chassis speeds.
    ///
    /// The frame of the result is given by [`InputShaper::field_relative`].
    pub fn shape(&self, input: &TeleopInput) -> ChassisSpeeds {
        let p = &self.params;

        let (mut x, mut y) = match p.deadband_mode {
            DeadbandMode::Linear => (
                linear_deadband(input.x, p.deadband),
                linear_deadband(input.y, p.deadband),
            ),
            DeadbandMode::Circular => circular_deadband(input.x, input.y, p.deadband),
        };

        // Saturate the magnitude at 1 so diagonals aren't faster
        let mag = x.hypot(y);
        if mag > 1.0 {
            x /= mag;
            y /= mag;
        }

        // Response curve on the magnitude, keeping the direction
        let mag = x.hypot(y);
        if mag > 0.0 {
            let curved = response_curve(mag, p.exponent);
            x *= curved / mag;
            y *= curved / mag;
        }

        if p.snap_enabled {
            let snapped = snap_direction(x, y, p.snap_tolerance_rad);
            x = snapped.0;
            y = snapped.1;
        }

        let rot = response_curve(linear_deadband(input.rot, p.deadband), p.exponent);

        let drive_power = if input.slow {
            p.slow_power
        } else {
            p.drive_power
        };

        ChassisSpeeds::new(
            x * p.max_speed_ms * drive_power,
            y * p.max_speed_ms * drive_power,
            rot * p.max_angular_rate_rads * p.rotate_power,
        )
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply a deadband to a single axis.
///
/// Values inside the deadband give zero, the rest of the range is remapped
/// so the deadband edge maps to 0 and full scale to 1.
pub fn linear_deadband(value: f64, deadband: f64) -> f64 {
    let abs = value.abs().min(1.0);

    if abs <= deadband {
        0.0
    } else {
        value.signum() * lin_map((deadband, 1.0), (0.0, 1.0), abs)
    }
}

/// Apply a deadband to the magnitude of a 2D input, keeping its direction.
pub fn circular_deadband(x: f64, y: f64, deadband: f64) -> (f64, f64) {
    let mag = x.hypot(y);

    if mag <= deadband {
        return (0.0, 0.0);
    }

    let scaled = lin_map((deadband, 1.0), (0.0, 1.0), mag.min(1.0));
    (x / mag * scaled, y / mag * scaled)
}

/// Raise a magnitude in [0, 1] to `exponent`, keeping its sign.
pub fn response_curve(value: f64, exponent: f64) -> f64 {
    value.signum() * value.abs().powf(exponent)
}

/// Rotate a 2D input onto the nearest multiple of 45 degrees if it's within
/// `tolerance_rad` of it.
pub fn snap_direction(x: f64, y: f64, tolerance_rad: f64) -> (f64, f64) {
    let mag = x.hypot(y);
    if mag == 0.0 {
        return (x, y);
    }

    let angle = y.atan2(x);
    let nearest = (angle / FRAC_PI_4).round() * FRAC_PI_4;

    if ang_dist(angle, nearest).abs() <= tolerance_rad {
        (mag * nearest.cos(), mag * nearest.sin())
    } else {
        (x, y)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> TeleopParams {
        TeleopParams {
            deadband: 0.1,
            deadband_mode: DeadbandMode::Linear,
            exponent: 1.0,
            snap_enabled: false,
            snap_tolerance_rad: 5f64.to_radians(),
            max_speed_ms: 4.0,
            max_angular_rate_rads: 6.0,
            drive_power: 1.0,
            slow_power: 0.25,
            rotate_power: 0.5,
            field_relative: true,
        }
    }

    #[test]
    fn test_linear_deadband() {
        assert_eq!(linear_deadband(0.1, 0.1), 0.0);
        assert_eq!(linear_deadband(-0.05, 0.1), 0.0);
        assert_abs_diff_eq!(linear_deadband(1.0, 0.1), 1.0);
        assert_abs_diff_eq!(linear_deadband(-1.0, 0.1), -1.0);

        // Continuous at the edge
        assert!(linear_deadband(0.1 + 1e-9, 0.1) < 1e-8);
        assert_abs_diff_eq!(linear_deadband(0.55, 0.1), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_circular_deadband() {
        assert_eq!(circular_deadband(0.07, 0.07, 0.1), (0.0, 0.0));

        // Direction kept
        let (x, y) = circular_deadband(0.6, 0.8, 0.1);
        assert_abs_diff_eq!(x.hypot(y), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y.atan2(x), 0.8f64.atan2(0.6), epsilon = 1e-12);

        // A diagonal that linear deadband would remove on one axis
        let (x, y) = circular_deadband(0.05, 0.5, 0.1);
        assert!(x > 0.0 && y > 0.0);
    }

    #[test]
    fn test_snap() {
        let (x, y) = snap_direction(1.0, 0.05, 5f64.to_radians());
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x, 1.0f64.hypot(0.05), epsilon = 1e-12);

        // Too far from any multiple of 45 degrees
        let (x, y) = snap_direction(1.0, 0.4, 5f64.to_radians());
        assert_eq!((x, y), (1.0, 0.4));
    }

    #[test]
    fn test_shape() {
        let mut p = params();
        let shaper = InputShaper::new(p.clone());

        let out = shaper.shape(&TeleopInput {
            x: 1.0,
            y: 0.0,
            rot: -1.0,
            slow: false,
        });
        assert_abs_diff_eq!(out.vx_ms, 4.0);
        assert_abs_diff_eq!(out.vy_ms, 0.0);
        assert_abs_diff_eq!(out.omega_rads, -3.0);

        // Full diagonal saturates at the max speed
        let out = shaper.shape(&TeleopInput {
            x: 1.0,
            y: 1.0,
            rot: 0.0,
            slow: false,
        });
        assert_abs_diff_eq!(out.translation_ms(), 4.0, epsilon = 1e-12);

        // Slow mode
        let out = shaper.shape(&TeleopInput {
            x: 1.0,
            y: 0.0,
            rot: 0.0,
            slow: true,
        });
        assert_abs_diff_eq!(out.vx_ms, 1.0);

        // Squared response curve
        p.exponent = 2.0;
        let shaper = InputShaper::new(p);
        let out = shaper.shape(&TeleopInput {
            x: 0.55,
            y: 0.0,
            rot: 0.0,
            slow: false,
        });
        assert_abs_diff_eq!(out.vx_ms, 4.0 * 0.25, epsilon = 1e-12);
    }
}
