//! Data types passed through the kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use util::maths::{ang_dist, wrap_pi};

use super::NUM_MODULES;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity of the chassis.
///
/// Whether this is in the field or the robot frame depends on the call that
/// produced it, the frame is not stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Forward velocity
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Leftward velocity
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Counter-clockwise angular velocity
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

/// The velocity and direction of a single module's wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Units: meters/second
    pub speed_ms: f64,

    /// Wheel direction in the robot frame, in (-pi, pi].
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// The cumulative distance travelled by a module's wheel and its current
/// direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulePosition {
    /// Units: meters
    pub distance_m: f64,

    /// Units: radians
    pub angle_rad: f64,
}

/// A small motion of the chassis, expressed in the robot frame at the start
/// of the motion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Twist {
    pub dx_m: f64,
    pub dy_m: f64,
    pub dtheta_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies one of the four modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleId {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisSpeeds {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    /// True if every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.vx_ms == 0.0 && self.vy_ms == 0.0 && self.omega_rads == 0.0
    }

    /// Convert field frame speeds into the robot frame given the robot's
    /// heading.
    pub fn field_to_robot(&self, heading_rad: f64) -> Self {
        let v = Rotation2::new(-heading_rad) * Vector2::new(self.vx_ms, self.vy_ms);
        Self::new(v[0], v[1], self.omega_rads)
    }

    /// Convert robot frame speeds into the field frame given the robot's
    /// heading.
    pub fn robot_to_field(&self, heading_rad: f64) -> Self {
        let v = Rotation2::new(heading_rad) * Vector2::new(self.vx_ms, self.vy_ms);
        Self::new(v[0], v[1], self.omega_rads)
    }

    /// Magnitude of the translational part.
    pub fn translation_ms(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }
}

impl ModuleState {
    /// Create a new state, normalising the angle into (-pi, pi].
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        Self {
            speed_ms,
            angle_rad: wrap_pi(angle_rad),
        }
    }

    /// Choose the shorter rotation to reach this state from the measured
    /// wheel angle.
    ///
    /// If the target is more than 90 degrees away from `measured_angle_rad`
    /// the speed is negated and the angle rotated by 180 degrees. Applying
    /// this twice against the same measurement gives the same result.
    pub fn optimise(&self, measured_angle_rad: f64) -> Self {
        let delta = ang_dist(measured_angle_rad, self.angle_rad);

        if delta.abs() > FRAC_PI_2 {
            Self::new(-self.speed_ms, self.angle_rad + PI)
        } else {
            Self::new(self.speed_ms, self.angle_rad)
        }
    }
}

impl ModuleId {
    /// All modules in array order.
    pub const ALL: [ModuleId; NUM_MODULES] = [
        ModuleId::FrontLeft,
        ModuleId::FrontRight,
        ModuleId::BackLeft,
        ModuleId::BackRight,
    ];

    /// Index of this module in module arrays.
    pub fn index(&self) -> usize {
        match self {
            ModuleId::FrontLeft => 0,
            ModuleId::FrontRight => 1,
            ModuleId::BackLeft => 2,
            ModuleId::BackRight => 3,
        }
    }

    /// Short name used in logs and file names.
    pub fn name(&self) -> &'static str {
        match self {
            ModuleId::FrontLeft => "FL",
            ModuleId::FrontRight => "FR",
            ModuleId::BackLeft => "BL",
            ModuleId::BackRight => "BR",
        }
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_optimise() {
        // 170 degrees from the measured angle flips to -10 with reversed speed
        let target = ModuleState::new(2.0, 170f64.to_radians());
        let opt = target.optimise(0.0);

        assert_abs_diff_eq!(opt.speed_ms, -2.0);
        assert_abs_diff_eq!(opt.angle_rad, (-10f64).to_radians(), epsilon = 1e-12);

        // Idempotent
        let opt2 = opt.optimise(0.0);
        assert_abs_diff_eq!(opt2.speed_ms, opt.speed_ms);
        assert_abs_diff_eq!(opt2.angle_rad, opt.angle_rad, epsilon = 1e-12);

        // Small errors are left alone
        let target = ModuleState::new(1.0, 0.5);
        assert_eq!(target.optimise(0.0), target);

        // Across the wrap boundary
        let target = ModuleState::new(1.0, -170f64.to_radians());
        let opt = target.optimise(170f64.to_radians());
        assert_abs_diff_eq!(opt.speed_ms, 1.0);
    }

    #[test]
    fn test_frame_conversion() {
        let field = ChassisSpeeds::new(1.0, 0.0, 0.3);

        // Facing +y the field +x direction is to the robot's right
        let robot = field.field_to_robot(FRAC_PI_2);
        assert_abs_diff_eq!(robot.vx_ms, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(robot.vy_ms, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(robot.omega_rads, 0.3);

        let back = robot.robot_to_field(FRAC_PI_2);
        assert_abs_diff_eq!(back.vx_ms, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(back.vy_ms, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_module_ids() {
        for (i, id) in ModuleId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
        assert_eq!(format!("{}", ModuleId::BackRight), "BR");
    }
}
