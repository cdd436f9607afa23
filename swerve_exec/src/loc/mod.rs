//! # Localisation module
//!
//! Provides the drivetrain's field pose. Wheel odometry and the heading
//! sensor are integrated every cycle, and asynchronous vision measurements
//! are fused against the pose history at their capture time.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

pub use params::LocParams;
pub use state::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use util::maths::wrap_pi;

use crate::kinematics::Twist;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the field frame) of the robot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the field frame
    ///
    /// Units: meters
    pub position_m_fm: Vector2<f64>,

    /// Angle from the field +x axis to the robot +x axis, counter-clockwise.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A pose measurement from an external (vision) source.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct VisionMeasurement {
    pub pose: Pose,

    /// Time at which the image was captured, on the control loop's clock.
    ///
    /// Units: seconds
    pub capture_time_s: f64,

    /// Standard deviations of the measurement in x, y and heading. `None`
    /// uses the default from the parameters.
    pub std_devs: Option<[f64; 3]>,
}

/// Cloneable handle used to submit vision measurements from another thread.
#[derive(Debug, Clone)]
pub struct VisionSender {
    tx: Sender<VisionMeasurement>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m_fm: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }

    /// Copy of this pose with the heading wrapped into (-pi, pi].
    pub fn wrapped(&self) -> Self {
        Self {
            position_m_fm: self.position_m_fm,
            heading_rad: wrap_pi(self.heading_rad),
        }
    }

    /// Transform a point in the robot frame into the field frame.
    pub fn transform_point(&self, point_m_rb: &Vector2<f64>) -> Vector2<f64> {
        self.position_m_fm + Rotation2::new(self.heading_rad) * point_m_rb
    }

    /// Apply a robot frame twist, moving along a constant curvature arc.
    pub fn exp(&self, twist: &Twist) -> Self {
        let dtheta = twist.dtheta_rad;

        let (s, c) = if dtheta.abs() < 1e-9 {
            (1.0 - dtheta * dtheta / 6.0, dtheta / 2.0)
        } else {
            (dtheta.sin() / dtheta, (1.0 - dtheta.cos()) / dtheta)
        };

        let local = Vector2::new(
            twist.dx_m * s - twist.dy_m * c,
            twist.dx_m * c + twist.dy_m * s,
        );

        Self {
            position_m_fm: self.position_m_fm + Rotation2::new(self.heading_rad) * local,
            heading_rad: self.heading_rad + dtheta,
        }
    }

    /// Linear interpolation between two poses, `t` in [0, 1].
    pub fn interpolate(&self, other: &Pose, t: f64) -> Self {
        Self {
            position_m_fm: self.position_m_fm + (other.position_m_fm - self.position_m_fm) * t,
            heading_rad: self.heading_rad + (other.heading_rad - self.heading_rad) * t,
        }
    }
}

impl VisionSender {
    pub(crate) fn new(tx: Sender<VisionMeasurement>) -> Self {
        Self { tx }
    }

    /// Submit a vision measurement, fused on the next control cycle.
    ///
    /// `trust` overrides the default standard deviations.
    pub fn add_vision_measurement(&self, pose: Pose, capture_time_s: f64, trust: Option<[f64; 3]>) {
        let m = VisionMeasurement {
            pose,
            capture_time_s,
            std_devs: trust,
        };

        if self.tx.send(m).is_err() {
            warn!("Pose estimator has gone away, vision measurement discarded");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_exp_straight() {
        let p = Pose::new(1.0, 2.0, FRAC_PI_2);
        let q = p.exp(&Twist {
            dx_m: 0.5,
            dy_m: 0.0,
            dtheta_rad: 0.0,
        });

        assert_abs_diff_eq!(q.position_m_fm[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.position_m_fm[1], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_arc() {
        // Quarter circle of radius 1
        let q = Pose::default().exp(&Twist {
            dx_m: FRAC_PI_2,
            dy_m: 0.0,
            dtheta_rad: FRAC_PI_2,
        });

        assert_abs_diff_eq!(q.position_m_fm[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.position_m_fm[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.heading_rad, FRAC_PI_2);
    }

    #[test]
    fn test_wrapped() {
        let p = Pose::new(0.0, 0.0, 3.0 * PI);
        assert_abs_diff_eq!(p.wrapped().heading_rad, PI, epsilon = 1e-12);
        assert_abs_diff_eq!(p.heading_rad, 3.0 * PI);
    }
}
