//! # Acceleration limiter
//!
//! Limits how quickly the commanded chassis speeds may change. Translation is
//! limited as a 2D vector, so a change of direction is limited by the
//! magnitude of the change rather than per axis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use crate::kinematics::ChassisSpeeds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AccelLimiter {
    /// Units: meters/second^2
    max_accel_mss: f64,

    /// Units: radians/second^2
    max_angular_accel_radss: f64,

    current: ChassisSpeeds,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AccelLimiter {
    pub fn new(max_accel_mss: f64, max_angular_accel_radss: f64) -> Self {
        Self {
            max_accel_mss,
            max_angular_accel_radss,
            current: ChassisSpeeds::default(),
        }
    }

    /// Move the output toward `request` by at most one cycle's worth of
    /// acceleration.
    ///
    /// Returns the limited speeds and whether any limiting occured.
    pub fn limit(&mut self, request: &ChassisSpeeds, dt_s: f64) -> (ChassisSpeeds, bool) {
        let mut limited = false;

        let current = Vector2::new(self.current.vx_ms, self.current.vy_ms);
        let target = Vector2::new(request.vx_ms, request.vy_ms);
        let delta = target - current;
        let max_step = self.max_accel_mss * dt_s;

        let next = if delta.norm() > max_step {
            limited = true;
            current + delta.normalize() * max_step
        } else {
            target
        };

        let d_omega = request.omega_rads - self.current.omega_rads;
        let max_omega_step = self.max_angular_accel_radss * dt_s;
        let omega = if d_omega.abs() > max_omega_step {
            limited = true;
            self.current.omega_rads + max_omega_step * d_omega.signum()
        } else {
            request.omega_rads
        };

        self.current = ChassisSpeeds::new(next[0], next[1], omega);

        (self.current, limited)
    }

    /// Set the output directly, bypassing the limit.
    pub fn reset(&mut self, speeds: ChassisSpeeds) {
        self.current = speeds;
    }

    pub fn current(&self) -> ChassisSpeeds {
        self.current
    }
}
