//! Forward and inverse swerve kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{MatrixMN, Vector2, Vector3, VectorN, U3, U8};
use serde::{Deserialize, Serialize};

use super::{
    ChassisSpeeds, KinematicsError, ModulePosition, ModuleState, Twist, NUM_MODULES,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Determinants of the normal matrix `M^T M` below this are treated as
/// singular.
const MIN_NORMAL_DET: f64 = 1e-9;

/// Singular values below this are zeroed when taking the pseudo-inverse.
const PINV_EPS: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position of each module's contact point relative to the rotation centre.
///
/// Units: meters,
/// Frame: Robot body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelGeometry {
    pub offsets_m: [[f64; 2]; NUM_MODULES],
}

/// Converts between chassis speeds and module states.
///
/// The pseudo-inverse of the 8x3 forward matrix is computed once on
/// construction and used for every least squares inverse.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    offsets_m: [Vector2<f64>; NUM_MODULES],

    /// Pseudo-inverse of the forward matrix `M`
    forward_pinv: MatrixMN<f64, U3, U8>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelGeometry {
    /// A rectangular layout with modules at the corners.
    pub fn rectangular(wheelbase_m: f64, trackwidth_m: f64) -> Self {
        let x = wheelbase_m / 2.0;
        let y = trackwidth_m / 2.0;

        Self {
            offsets_m: [[x, y], [x, -y], [-x, y], [-x, -y]],
        }
    }
}

impl SwerveKinematics {
    /// Build the kinematics for the given geometry.
    pub fn new(geometry: &WheelGeometry) -> Result<Self, KinematicsError> {
        let mut offsets_m = [Vector2::zeros(); NUM_MODULES];
        for (o, g) in offsets_m.iter_mut().zip(geometry.offsets_m.iter()) {
            *o = Vector2::new(g[0], g[1]);
        }

        let forward = forward_matrix(&offsets_m);

        // The pseudo-inverse exists for any matrix, so rank deficiency has to
        // be caught separately
        let normal = forward.transpose() * &forward;
        if normal.determinant().abs() < MIN_NORMAL_DET {
            return Err(KinematicsError::DegenerateGeometry(geometry.offsets_m));
        }

        let forward_pinv = forward
            .pseudo_inverse(PINV_EPS)
            .map_err(|_| KinematicsError::DegenerateGeometry(geometry.offsets_m))?;

        Ok(Self {
            offsets_m,
            forward_pinv,
        })
    }

    /// Module offsets from the rotation centre in the robot frame.
    pub fn offsets_m(&self) -> &[Vector2<f64>; NUM_MODULES] {
        &self.offsets_m
    }

    /// Calculate the module states which achieve the given robot frame
    /// chassis speeds.
    ///
    /// When `speeds` is exactly zero every module keeps its angle from
    /// `last` with zero speed, so the wheels don't snap back to zero.
    pub fn to_module_states(
        &self,
        speeds: &ChassisSpeeds,
        last: &[ModuleState; NUM_MODULES],
    ) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];

        if speeds.is_zero() {
            for (s, l) in states.iter_mut().zip(last.iter()) {
                *s = ModuleState::new(0.0, l.angle_rad);
            }
            return states;
        }

        for (s, o) in states.iter_mut().zip(self.offsets_m.iter()) {
            let vx = speeds.vx_ms - speeds.omega_rads * o[1];
            let vy = speeds.vy_ms + speeds.omega_rads * o[0];

            *s = ModuleState::new(vx.hypot(vy), vy.atan2(vx));
        }

        states
    }

    /// Least squares estimate of the robot frame chassis speeds from module
    /// states.
    pub fn to_chassis_speeds(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisSpeeds {
        let mut vels = [Vector2::zeros(); NUM_MODULES];
        for (v, s) in vels.iter_mut().zip(states.iter()) {
            *v = Vector2::new(
                s.speed_ms * s.angle_rad.cos(),
                s.speed_ms * s.angle_rad.sin(),
            );
        }

        let x = self.solve(&vels);
        ChassisSpeeds::new(x[0], x[1], x[2])
    }

    /// Least squares estimate of the chassis motion from the change in each
    /// module's position over one cycle.
    ///
    /// `deltas` holds the distance travelled this cycle and the wheel angle.
    pub fn to_twist(&self, deltas: &[ModulePosition; NUM_MODULES]) -> Twist {
        let mut disps = [Vector2::zeros(); NUM_MODULES];
        for (d, p) in disps.iter_mut().zip(deltas.iter()) {
            *d = Vector2::new(
                p.distance_m * p.angle_rad.cos(),
                p.distance_m * p.angle_rad.sin(),
            );
        }

        let x = self.solve(&disps);
        Twist {
            dx_m: x[0],
            dy_m: x[1],
            dtheta_rad: x[2],
        }
    }

    /// Solve `M x = v` in the least squares sense.
    fn solve(&self, v: &[Vector2<f64>; NUM_MODULES]) -> Vector3<f64> {
        let mut stacked = VectorN::<f64, U8>::zeros();
        for (i, vi) in v.iter().enumerate() {
            stacked[2 * i] = vi[0];
            stacked[2 * i + 1] = vi[1];
        }

        self.forward_pinv * stacked
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the forward matrix mapping `(vx, vy, omega)` to stacked module
/// velocities. Each module contributes rows `[1, 0, -y]` and `[0, 1, x]`.
fn forward_matrix(offsets_m: &[Vector2<f64>; NUM_MODULES]) -> MatrixMN<f64, U8, U3> {
    let mut m = MatrixMN::<f64, U8, U3>::zeros();
    for (i, o) in offsets_m.iter().enumerate() {
        m[(2 * i, 0)] = 1.0;
        m[(2 * i, 2)] = -o[1];
        m[(2 * i + 1, 1)] = 1.0;
        m[(2 * i + 1, 2)] = o[0];
    }
    m
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale every module speed by the same factor so that none exceeds
/// `max_speed_ms`.
///
/// Returns true if the states were scaled. Individual speeds are never
/// clamped, so the ratios between modules are preserved.
pub fn desaturate(states: &mut [ModuleState; NUM_MODULES], max_speed_ms: f64) -> bool {
    let max_abs = states
        .iter()
        .map(|s| s.speed_ms.abs())
        .fold(0.0, f64::max);

    if max_abs <= max_speed_ms || max_abs == 0.0 {
        return false;
    }

    let scale = max_speed_ms / max_abs;
    for s in states.iter_mut() {
        s.speed_ms *= scale;
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_4;

    fn kinematics() -> SwerveKinematics {
        SwerveKinematics::new(&WheelGeometry::rectangular(0.62865, 0.6477)).unwrap()
    }

    fn assert_speeds_eq(a: &ChassisSpeeds, b: &ChassisSpeeds) {
        assert_abs_diff_eq!(a.vx_ms, b.vx_ms, epsilon = 1e-9);
        assert_abs_diff_eq!(a.vy_ms, b.vy_ms, epsilon = 1e-9);
        assert_abs_diff_eq!(a.omega_rads, b.omega_rads, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let k = kinematics();
        let last = [ModuleState::default(); NUM_MODULES];

        for s in [
            ChassisSpeeds::new(1.0, 0.0, 0.0),
            ChassisSpeeds::new(0.0, -2.5, 0.0),
            ChassisSpeeds::new(0.0, 0.0, 3.0),
            ChassisSpeeds::new(1.2, 0.7, -1.9),
        ]
        .iter()
        {
            let states = k.to_module_states(s, &last);
            assert_speeds_eq(&k.to_chassis_speeds(&states), s);
        }
    }

    #[test]
    fn test_pure_rotation_angles() {
        let k = kinematics();
        let last = [ModuleState::default(); NUM_MODULES];

        // Square-ish chassis, wheels tangent to the rotation circle
        let states = k.to_module_states(&ChassisSpeeds::new(0.0, 0.0, 1.0), &last);
        let fl = states[0];
        let expected = 0.6477f64.atan2(0.62865) + std::f64::consts::FRAC_PI_2;
        assert_abs_diff_eq!(fl.angle_rad, expected, epsilon = 1e-9);

        // All modules at the same speed
        for s in states.iter() {
            assert_abs_diff_eq!(s.speed_ms, fl.speed_ms, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_speed_holds_angles() {
        let k = kinematics();
        let last = [
            ModuleState::new(1.0, 0.3),
            ModuleState::new(1.0, -0.3),
            ModuleState::new(1.0, FRAC_PI_4),
            ModuleState::new(1.0, -2.0),
        ];

        let states = k.to_module_states(&ChassisSpeeds::default(), &last);
        for (s, l) in states.iter().zip(last.iter()) {
            assert_eq!(s.speed_ms, 0.0);
            assert_eq!(s.angle_rad, l.angle_rad);
        }
    }

    #[test]
    fn test_desaturate() {
        let mut states = [
            ModuleState::new(6.0, 0.0),
            ModuleState::new(-3.0, 0.0),
            ModuleState::new(1.5, 0.0),
            ModuleState::new(4.0, 0.0),
        ];
        let before = states;

        assert!(desaturate(&mut states, 4.0));

        let scale = states[0].speed_ms / before[0].speed_ms;
        for (s, b) in states.iter().zip(before.iter()) {
            assert!(s.speed_ms.abs() <= 4.0 + 1e-12);
            assert_abs_diff_eq!(s.speed_ms, b.speed_ms * scale, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(states[0].speed_ms, 4.0);

        // Nothing to do under the limit
        let mut states = [ModuleState::new(1.0, 0.0); NUM_MODULES];
        assert!(!desaturate(&mut states, 4.0));
        assert_eq!(states[0].speed_ms, 1.0);
    }

    #[test]
    fn test_twist() {
        let k = kinematics();

        // Every wheel pointing forward and travelling 0.1 m
        let deltas = [ModulePosition {
            distance_m: 0.1,
            angle_rad: 0.0,
        }; NUM_MODULES];
        let t = k.to_twist(&deltas);
        assert_abs_diff_eq!(t.dx_m, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(t.dy_m, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.dtheta_rad, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_least_squares_on_inconsistent_states() {
        let k = kinematics();

        // One wheel disagreeing with the other three pulls the estimate by a
        // quarter of its error in x
        let mut states = [ModuleState::new(1.0, 0.0); NUM_MODULES];
        states[3] = ModuleState::new(2.0, 0.0);
        let s = k.to_chassis_speeds(&states);
        assert_abs_diff_eq!(s.vx_ms, 1.25, epsilon = 1e-9);
        assert_abs_diff_eq!(s.vy_ms, 0.0, epsilon = 1e-9);

        // Pseudo-inverse is a left inverse of the forward matrix
        let forward = forward_matrix(k.offsets_m());
        let ident = k.forward_pinv * forward;
        for r in 0..3 {
            for c in 0..3 {
                let e = if r == c { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(ident[(r, c)], e, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate_geometry() {
        let geom = WheelGeometry {
            offsets_m: [[0.0, 0.0]; NUM_MODULES],
        };
        assert!(matches!(
            SwerveKinematics::new(&geom),
            Err(KinematicsError::DegenerateGeometry(_))
        ));
    }
}
