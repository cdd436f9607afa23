//! # Motor calibration
//!
//! Characterises a module's drive or steer motor with an open loop
//! quasistatic voltage ramp followed by a dynamic voltage step. The recorded
//! samples are used offline to fit the k_s, k_v and k_a gains.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{CalibParams, ControlContext, ControlMode, ModuleDemand};
use crate::kinematics::ModuleId;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An in-progress calibration of one motor.
#[derive(Debug, Clone)]
pub struct Calibration {
    motor: CalibMotor,
    params: CalibParams,
    phase: CalibPhase,

    /// Time spent in the current phase
    phase_time_s: f64,

    /// Time since the calibration started
    elapsed_s: f64,

    samples: Vec<CalibSample>,
}

/// A single sample recorded during calibration.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalibSample {
    pub time_s: f64,
    pub phase: CalibPhase,
    pub volts: f64,

    /// Drive distance in meters or unwrapped steer angle in radians
    pub position: f64,

    /// Drive speed in meters/second or steer rate in radians/second
    pub velocity: f64,
}

/// The complete record of a finished calibration.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationLog {
    pub module: ModuleId,
    pub motor: CalibMotor,
    pub samples: Vec<CalibSample>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which motor of a module to calibrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibMotor {
    Drive,
    Steer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibPhase {
    Quasistatic,
    Rest,
    Dynamic,
    Done,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Calibration {
    pub fn new(motor: CalibMotor, params: CalibParams) -> Self {
        Self {
            motor,
            params,
            phase: CalibPhase::Quasistatic,
            phase_time_s: 0.0,
            elapsed_s: 0.0,
            samples: Vec::new(),
        }
    }

    pub fn motor(&self) -> CalibMotor {
        self.motor
    }

    pub fn phase(&self) -> CalibPhase {
        self.phase
    }

    pub fn samples(&self) -> &[CalibSample] {
        &self.samples
    }

    /// Consume the calibration into its log.
    pub fn into_log(self, module: ModuleId) -> CalibrationLog {
        CalibrationLog {
            module,
            motor: self.motor,
            samples: self.samples,
        }
    }

    /// Voltage for the current phase, advancing the phase when its time is
    /// up.
    fn phase_volts(&mut self) -> f64 {
        loop {
            let (duration_s, next) = match self.phase {
                CalibPhase::Quasistatic => {
                    (self.params.quasistatic_duration_s, CalibPhase::Rest)
                }
                CalibPhase::Rest => (self.params.rest_duration_s, CalibPhase::Dynamic),
                CalibPhase::Dynamic => (self.params.dynamic_duration_s, CalibPhase::Done),
                CalibPhase::Done => return 0.0,
            };

            if self.phase_time_s < duration_s {
                break;
            }

            self.phase_time_s -= duration_s;
            self.phase = next;
        }

        match self.phase {
            CalibPhase::Quasistatic => self.params.quasistatic_ramp_vps * self.phase_time_s,
            CalibPhase::Dynamic => self.params.dynamic_step_volts,
            CalibPhase::Rest | CalibPhase::Done => 0.0,
        }
    }
}

impl ControlMode for Calibration {
    fn step(&mut self, ctx: &ControlContext) -> ModuleDemand {
        let volts = self.phase_volts();
        let meas = ctx.measurement;

        if self.phase != CalibPhase::Done {
            let (position, velocity) = match self.motor {
                CalibMotor::Drive => (meas.drive_position_m, meas.drive_velocity_ms),
                CalibMotor::Steer => (meas.steer_position_rad, meas.steer_rate_rads),
            };

            self.samples.push(CalibSample {
                time_s: self.elapsed_s,
                phase: self.phase,
                volts,
                position,
                velocity,
            });
        }

        self.phase_time_s += ctx.dt_s;
        self.elapsed_s += ctx.dt_s;

        // The motor not under test is left unpowered
        let (drive_volts, steer_volts) = match self.motor {
            CalibMotor::Drive => (volts, 0.0),
            CalibMotor::Steer => (0.0, volts),
        };

        ModuleDemand {
            drive_velocity_ms: meas.drive_velocity_ms,
            steer_angle_rad: meas.steer_angle_rad,
            drive_volts,
            steer_volts,
        }
    }

    fn is_complete(&self) -> bool {
        self.phase == CalibPhase::Done
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::ModuleState;
    use crate::swerve_module::Measurement;
    use approx::assert_abs_diff_eq;

    fn params() -> CalibParams {
        CalibParams {
            quasistatic_ramp_vps: 1.0,
            quasistatic_duration_s: 0.1,
            rest_duration_s: 0.04,
            dynamic_step_volts: 6.0,
            dynamic_duration_s: 0.06,
        }
    }

    #[test]
    fn test_profile() {
        let mut calib = Calibration::new(CalibMotor::Steer, params());
        let meas = Measurement::default();
        let ctx = ControlContext {
            measurement: &meas,
            target: ModuleState::default(),
            dt_s: 0.02,
        };

        let mut volts = vec![];
        while !calib.is_complete() {
            let d = calib.step(&ctx);
            assert_eq!(d.drive_volts, 0.0);
            volts.push(d.steer_volts);
            assert!(volts.len() < 100, "calibration never completed");
        }

        // Ramp, rest then step
        assert_abs_diff_eq!(volts[0], 0.0);
        assert_abs_diff_eq!(volts[2], 0.04, epsilon = 1e-12);
        assert!(volts.iter().any(|v| *v == 6.0));

        let phases: Vec<CalibPhase> = calib.samples().iter().map(|s| s.phase).collect();
        assert_eq!(phases.first(), Some(&CalibPhase::Quasistatic));
        assert_eq!(phases.last(), Some(&CalibPhase::Dynamic));
        assert!(phases.contains(&CalibPhase::Rest));

        let log = calib.into_log(ModuleId::BackLeft);
        assert_eq!(log.module, ModuleId::BackLeft);
        assert_eq!(log.motor, CalibMotor::Steer);
    }
}
