//! Control modes of a swerve module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::ang_dist;

use super::{ModuleParams, PidController, SimpleFeedforward};
use crate::kinematics::ModuleState;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A control loop that can run a module for one cycle.
///
/// Normal closed loop control and calibration both implement this, the
/// module owns whichever is active.
pub trait ControlMode {
    /// Run one cycle, returning the demand to apply to the motors.
    fn step(&mut self, ctx: &ControlContext) -> ModuleDemand;

    /// True once the mode has nothing left to do.
    fn is_complete(&self) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Last known good measurements of a module.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Measurement {
    /// Units: meters
    pub drive_position_m: f64,

    /// Units: meters/second
    pub drive_velocity_ms: f64,

    /// Wheel angle in (-pi, pi].
    ///
    /// Units: radians
    pub steer_angle_rad: f64,

    /// Unwrapped wheel angle.
    ///
    /// Units: radians
    pub steer_position_rad: f64,

    /// Units: radians/second
    pub steer_rate_rads: f64,

    /// Units: amps
    pub drive_current_a: f64,

    /// Units: amps
    pub steer_current_a: f64,
}

/// Data made available to a control mode each cycle.
pub struct ControlContext<'a> {
    pub measurement: &'a Measurement,
    pub target: ModuleState,
    pub dt_s: f64,
}

/// Actuation demand for a single module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModuleDemand {
    /// Velocity setpoint the drive loop is tracking.
    ///
    /// Units: meters/second
    pub drive_velocity_ms: f64,

    /// Angle setpoint the steer loop is tracking.
    ///
    /// Units: radians
    pub steer_angle_rad: f64,

    /// Units: volts
    pub drive_volts: f64,

    /// Units: volts
    pub steer_volts: f64,
}

/// Normal closed loop control.
///
/// The drive motor runs feedforward plus a velocity PID, the steer motor a
/// position PID on the shortest signed angle error.
#[derive(Debug, Clone)]
pub struct NormalControl {
    drive_pid: PidController,
    steer_pid: PidController,
    drive_ff: SimpleFeedforward,
    max_volts: f64,

    /// Driven speed setpoint from the previous cycle, for the acceleration
    /// feedforward.
    prev_setpoint_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleDemand {
    /// Scale both voltages by `factor`, leaving the setpoints untouched.
    pub fn scale_volts(&mut self, factor: f64) {
        self.drive_volts *= factor;
        self.steer_volts *= factor;
    }

    /// True if neither motor is being driven.
    pub fn is_zero_actuation(&self) -> bool {
        self.drive_volts == 0.0 && self.steer_volts == 0.0
    }
}

impl NormalControl {
    pub fn new(params: &ModuleParams) -> Self {
        Self {
            drive_pid: PidController::from_gains(&params.drive_gains),
            steer_pid: PidController::from_gains(&params.steer_gains),
            drive_ff: SimpleFeedforward::from_gains(&params.drive_gains),
            max_volts: params.max_volts,
            prev_setpoint_ms: None,
        }
    }

    pub fn reset(&mut self) {
        self.drive_pid.reset();
        self.steer_pid.reset();
        self.prev_setpoint_ms = None;
    }
}

impl ControlMode for NormalControl {
    fn step(&mut self, ctx: &ControlContext) -> ModuleDemand {
        let meas = ctx.measurement;

        let angle_err_rad = ang_dist(meas.steer_angle_rad, ctx.target.angle_rad);

        // Cosine derating, so the wheel doesn't push sideways while it's
        // still turning
        let driven_ms = ctx.target.speed_ms * angle_err_rad.cos().max(0.0);

        let accel_mss = match self.prev_setpoint_ms {
            Some(p) if ctx.dt_s > 0.0 => (driven_ms - p) / ctx.dt_s,
            _ => 0.0,
        };
        self.prev_setpoint_ms = Some(driven_ms);

        let drive_volts = self.drive_ff.calculate(driven_ms, accel_mss)
            + self
                .drive_pid
                .get(driven_ms - meas.drive_velocity_ms, ctx.dt_s);
        let steer_volts = self.steer_pid.get(angle_err_rad, ctx.dt_s);

        ModuleDemand {
            drive_velocity_ms: driven_ms,
            steer_angle_rad: ctx.target.angle_rad,
            drive_volts: drive_volts.clamp(-self.max_volts, self.max_volts),
            steer_volts: steer_volts.clamp(-self.max_volts, self.max_volts),
        }
    }

    fn is_complete(&self) -> bool {
        false
    }
}
