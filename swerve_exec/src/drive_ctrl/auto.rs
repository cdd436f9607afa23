//! # Pose-seeking controllers
//!
//! PID controllers which turn pose errors into field frame chassis speeds for
//! the go-to-pose, face-point and trajectory following commands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use util::maths::ang_dist;

use super::{AutoParams, TrajectorySample};
use crate::{kinematics::ChassisSpeeds, loc::Pose, swerve_module::PidController};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AutoControllers {
    params: AutoParams,
    x_ctrl: PidController,
    y_ctrl: PidController,
    heading_ctrl: PidController,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AutoControllers {
    pub fn new(params: &AutoParams) -> Self {
        Self {
            params: params.clone(),
            x_ctrl: PidController::from_gains(&params.move_gains),
            y_ctrl: PidController::from_gains(&params.move_gains),
            heading_ctrl: PidController::from_gains(&params.rotate_gains),
        }
    }

    /// Clear the controller history, call when the goal changes.
    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.heading_ctrl.reset();
    }

    /// Field frame speeds to drive from `pose` to `goal`, and whether the
    /// goal has been reached.
    pub fn go_to_pose(&mut self, pose: &Pose, goal: &Pose, dt_s: f64) -> (ChassisSpeeds, bool) {
        let err_m = goal.position_m_fm - pose.position_m_fm;
        let head_err_rad = ang_dist(pose.heading_rad, goal.heading_rad);

        let at_goal = err_m.norm() <= self.params.position_tolerance_m
            && head_err_rad.abs() <= self.params.heading_tolerance_rad;

        let vel = self.translation(err_m, dt_s);
        let omega = self.rotation(head_err_rad, dt_s);

        (ChassisSpeeds::new(vel[0], vel[1], omega), at_goal)
    }

    /// Field frame speeds which translate at the given velocity while turning
    /// to face `point_m_fm`.
    ///
    /// `offset_rad` is added to the facing direction, for example pi to face
    /// away from the point.
    pub fn face_point(
        &mut self,
        pose: &Pose,
        vx_ms: f64,
        vy_ms: f64,
        point_m_fm: &Vector2<f64>,
        offset_rad: f64,
        dt_s: f64,
    ) -> ChassisSpeeds {
        let to_point = point_m_fm - pose.position_m_fm;

        // Already on the point, nothing to face
        let omega = if to_point.norm() > 0.0 {
            let target_rad = to_point[1].atan2(to_point[0]) + offset_rad;
            self.rotation(ang_dist(pose.heading_rad, target_rad), dt_s)
        } else {
            0.0
        };

        ChassisSpeeds::new(vx_ms, vy_ms, omega)
    }

    /// Field frame speeds to track a trajectory sample: the sample's
    /// velocity plus feedback toward its pose.
    pub fn follow_sample(&mut self, pose: &Pose, sample: &TrajectorySample, dt_s: f64) -> ChassisSpeeds {
        let err_m = sample.pose.position_m_fm - pose.position_m_fm;
        let head_err_rad = ang_dist(pose.heading_rad, sample.pose.heading_rad);

        ChassisSpeeds::new(
            sample.velocity.vx_ms + self.x_ctrl.get(err_m[0], dt_s),
            sample.velocity.vy_ms + self.y_ctrl.get(err_m[1], dt_s),
            sample.velocity.omega_rads + self.heading_ctrl.get(head_err_rad, dt_s),
        )
    }

    /// Position error to a velocity no faster than the max speed.
    fn translation(&mut self, err_m: Vector2<f64>, dt_s: f64) -> Vector2<f64> {
        let vel = Vector2::new(
            self.x_ctrl.get(err_m[0], dt_s),
            self.y_ctrl.get(err_m[1], dt_s),
        );

        let speed = vel.norm();
        if speed > self.params.max_speed_ms {
            vel * (self.params.max_speed_ms / speed)
        } else {
            vel
        }
    }

    fn rotation(&mut self, err_rad: f64, dt_s: f64) -> f64 {
        let max = self.params.max_angular_rate_rads;
        self.heading_ctrl.get(err_rad, dt_s).clamp(-max, max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::swerve_module::GainProfile;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn params() -> AutoParams {
        AutoParams {
            move_gains: GainProfile {
                k_p: 3.5,
                ..Default::default()
            },
            rotate_gains: GainProfile {
                k_p: 4.0,
                ..Default::default()
            },
            max_speed_ms: 4.0,
            max_angular_rate_rads: 2.0 * PI,
            position_tolerance_m: 0.05,
            heading_tolerance_rad: 0.05,
        }
    }

    #[test]
    fn test_go_to_pose() {
        let mut auto = AutoControllers::new(&params());

        // Far away, speed saturates along the error direction
        let (v, at_goal) = auto.go_to_pose(&Pose::default(), &Pose::new(10.0, 10.0, 0.0), 0.02);
        assert!(!at_goal);
        assert_abs_diff_eq!(v.translation_ms(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vx_ms, v.vy_ms, epsilon = 1e-12);

        // Close, proportional
        auto.reset();
        let (v, _) = auto.go_to_pose(&Pose::default(), &Pose::new(0.1, 0.0, 0.1), 0.02);
        assert_abs_diff_eq!(v.vx_ms, 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(v.omega_rads, 0.4, epsilon = 1e-12);

        let (_, at_goal) = auto.go_to_pose(&Pose::new(0.1, 0.01, 0.0), &Pose::new(0.1, 0.0, 0.01), 0.02);
        assert!(at_goal);
    }

    #[test]
    fn test_face_point() {
        let mut auto = AutoControllers::new(&params());

        // Point directly to the left, heading error of +90 degrees
        let v = auto.face_point(
            &Pose::default(),
            1.0,
            0.0,
            &Vector2::new(0.0, 5.0),
            0.0,
            0.02,
        );
        assert_abs_diff_eq!(v.vx_ms, 1.0);
        assert_abs_diff_eq!(v.omega_rads, 4.0 * FRAC_PI_2, epsilon = 1e-12);

        // Facing away from the point it's already behind
        auto.reset();
        let v = auto.face_point(
            &Pose::new(0.0, 0.0, -FRAC_PI_2),
            0.0,
            0.0,
            &Vector2::new(0.0, 5.0),
            PI,
            0.02,
        );
        assert_abs_diff_eq!(v.omega_rads, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_follow_sample() {
        let mut auto = AutoControllers::new(&params());
        let sample = TrajectorySample {
            time_s: 1.0,
            pose: Pose::new(1.0, 0.0, 0.0),
            velocity: ChassisSpeeds::new(2.0, 0.0, 0.0),
        };

        // On the sample the output is the feedforward
        let v = auto.follow_sample(&Pose::new(1.0, 0.0, 0.0), &sample, 0.02);
        assert_abs_diff_eq!(v.vx_ms, 2.0);

        // Behind the sample, feedback adds speed
        auto.reset();
        let v = auto.follow_sample(&Pose::new(0.9, 0.0, 0.0), &sample, 0.02);
        assert_abs_diff_eq!(v.vx_ms, 2.0 + 0.35, epsilon = 1e-12);
    }
}
