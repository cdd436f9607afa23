//! # Module controllers
//!
//! PID and feedforward controllers used by the module control loops.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::GainProfile;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Static, velocity and acceleration feedforward.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct SimpleFeedforward {
    pub k_s: f64,
    pub k_v: f64,
    pub k_a: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            prev_error: None,
            integral: 0f64,
        }
    }

    /// Create a new controller from the feedback part of a gain profile.
    pub fn from_gains(gains: &GainProfile) -> Self {
        Self::new(gains.k_p, gains.k_i, gains.k_d)
    }

    /// Get the value of the controller for the given error.
    ///
    /// `dt_s` is the time since the previous call. With no previous error, or
    /// a non-positive `dt_s`, the derivative is taken as zero and the integral
    /// does not accumulate.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        let valid_dt = dt_s > 0.0;

        if valid_dt {
            self.integral += error * dt_s;
        }

        let deriv = match (self.prev_error, valid_dt) {
            (Some(e), true) => (error - e) / dt_s,
            _ => 0f64,
        };

        self.prev_error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0f64;
    }
}

impl SimpleFeedforward {
    pub fn from_gains(gains: &GainProfile) -> Self {
        Self {
            k_s: gains.k_s,
            k_v: gains.k_v,
            k_a: gains.k_a,
        }
    }

    /// Voltage required to hold `velocity` while accelerating at `accel`.
    ///
    /// The static term is only applied when moving.
    pub fn calculate(&self, velocity: f64, accel: f64) -> f64 {
        let static_v = if velocity == 0.0 {
            0.0
        } else {
            self.k_s * velocity.signum()
        };

        static_v + self.k_v * velocity + self.k_a * accel
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(2.0, 1.0, 0.5);

        // First call: proportional only
        assert_abs_diff_eq!(pid.get(1.0, 0.02), 2.0 + 0.02);

        // Second call: integral of 2 samples, derivative of the change
        let out = pid.get(0.5, 0.02);
        assert_abs_diff_eq!(out, 1.0 + 1.0 * 0.03 + 0.5 * (-0.5 / 0.02), epsilon = 1e-12);

        pid.reset();
        assert_abs_diff_eq!(pid.get(1.0, 0.0), 2.0);
    }

    #[test]
    fn test_feedforward() {
        let ff = SimpleFeedforward {
            k_s: 0.2,
            k_v: 2.0,
            k_a: 0.5,
        };

        assert_eq!(ff.calculate(0.0, 0.0), 0.0);
        assert_abs_diff_eq!(ff.calculate(1.0, 2.0), 0.2 + 2.0 + 1.0);
        assert_abs_diff_eq!(ff.calculate(-1.0, 0.0), -0.2 - 2.0);
    }
}
