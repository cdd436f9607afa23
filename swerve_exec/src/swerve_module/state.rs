//! Swerve module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use util::maths::{ang_dist, wrap_pi};

use super::{
    CalibMotor, Calibration, CalibrationLog, ControlContext, ControlMode, Measurement,
    ModuleDemand, ModuleParams, NormalControl, SwerveModuleError,
};
use crate::kinematics::{ModuleId, ModulePosition, ModuleState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single swerve module.
pub struct SwerveModule {
    id: ModuleId,
    params: ModuleParams,

    mode: Mode,
    normal: NormalControl,

    /// Optimised target state
    target: ModuleState,

    meas: Measurement,

    /// Raw incremental encoder reading, last known good
    steer_incremental_rad: f64,

    /// Offset added to the incremental reading to get the wheel angle. `None`
    /// until the first absolute reading arrives.
    steer_offset_rad: Option<f64>,

    report: ModuleReport,

    finished_calib: Option<CalibrationLog>,
}

/// Sensor readings for one module for one cycle.
///
/// Any reading may be missing, in which case the last known good value is
/// used and the module is reported unhealthy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModuleSensors {
    /// Units: meters
    pub drive_position_m: Option<f64>,

    /// Units: meters/second
    pub drive_velocity_ms: Option<f64>,

    /// Unwrapped reading of the fast relative steer encoder.
    ///
    /// Units: radians
    pub steer_incremental_rad: Option<f64>,

    /// Reading of the slow absolute steer encoder, `None` on cycles where
    /// there is no fresh sample.
    ///
    /// Units: radians
    pub steer_absolute_rad: Option<f64>,

    /// Units: amps
    pub drive_current_a: Option<f64>,

    /// Units: amps
    pub steer_current_a: Option<f64>,
}

/// Status of a module after a cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ModuleReport {
    /// False if any position or velocity reading was missing
    pub healthy: bool,

    /// True if a current reading was missing (counted as 0 A)
    pub current_fault: bool,

    /// True once the incremental encoder has been seeded
    pub seeded: bool,

    /// True if the incremental encoder was re-seeded this cycle
    pub reseeded: bool,

    pub drive_current_limited: bool,
    pub steer_current_limited: bool,

    pub mode: ModuleMode,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Externally visible mode of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModuleMode {
    Idle,
    Normal,
    Calibrating,
}

enum Mode {
    Idle,
    Normal,
    Calibrating(Calibration),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ModuleMode {
    fn default() -> Self {
        ModuleMode::Normal
    }
}

impl SwerveModule {
    /// Create a new module in normal mode.
    pub fn new(id: ModuleId, params: &ModuleParams) -> Self {
        Self {
            id,
            params: params.clone(),
            mode: Mode::Normal,
            normal: NormalControl::new(params),
            target: ModuleState::default(),
            meas: Measurement::default(),
            steer_incremental_rad: 0.0,
            steer_offset_rad: None,
            report: ModuleReport::default(),
            finished_calib: None,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Update the measurements from this cycle's sensor readings.
    pub fn update_sensors(&mut self, sensors: &ModuleSensors, dt_s: f64) {
        self.report.healthy = true;
        self.report.current_fault = false;
        self.report.reseeded = false;

        match sensors.drive_position_m {
            Some(p) => self.meas.drive_position_m = p,
            None => self.report.healthy = false,
        }
        match sensors.drive_velocity_ms {
            Some(v) => self.meas.drive_velocity_ms = v,
            None => self.report.healthy = false,
        }

        let prev_incremental_rad = self.steer_incremental_rad;
        match sensors.steer_incremental_rad {
            Some(a) => self.steer_incremental_rad = a,
            None => self.report.healthy = false,
        }

        if let Some(abs_rad) = sensors.steer_absolute_rad {
            self.seed_steer(abs_rad);
        }

        let offset_rad = self.steer_offset_rad.unwrap_or(0.0);
        self.meas.steer_position_rad = self.steer_incremental_rad + offset_rad;
        self.meas.steer_angle_rad = wrap_pi(self.meas.steer_position_rad);
        self.meas.steer_rate_rads = if dt_s > 0.0 {
            (self.steer_incremental_rad - prev_incremental_rad) / dt_s
        } else {
            0.0
        };

        self.meas.drive_current_a = sensors.drive_current_a.unwrap_or(0.0);
        self.meas.steer_current_a = sensors.steer_current_a.unwrap_or(0.0);
        if sensors.drive_current_a.is_none() || sensors.steer_current_a.is_none() {
            self.report.current_fault = true;
        }

        if !self.report.healthy {
            debug!("{} module sensor fault, holding last known values", self.id);
        }
    }

    /// Seed the incremental encoder from an absolute reading.
    ///
    /// The first reading always seeds. After that the offset is only updated
    /// while the wheel is near stationary and on target, when the absolute
    /// reading is least affected by latency.
    fn seed_steer(&mut self, abs_rad: f64) {
        let offset_rad = ang_dist(self.steer_incremental_rad, abs_rad);

        match self.steer_offset_rad {
            None => {
                info!("{} module steer encoder seeded at {:.3} rad", self.id, abs_rad);
                self.steer_offset_rad = Some(offset_rad);
                self.report.seeded = true;
            }
            Some(prev_offset_rad) => {
                // Measured angle before this seed
                let measured_rad = wrap_pi(self.steer_incremental_rad + prev_offset_rad);
                let on_target = ang_dist(measured_rad, self.target.angle_rad).abs()
                    < self.params.seed_tolerance_rad;
                let stationary =
                    self.meas.drive_velocity_ms.abs() < self.params.velocity_deadband_ms;

                if on_target && stationary {
                    self.steer_offset_rad = Some(offset_rad);
                    self.report.reseeded = true;
                }
            }
        }
    }

    /// Set the target state for the module.
    ///
    /// The speed is clamped to the hard cap and the state optimised against
    /// the measured angle. Ignored while calibrating.
    pub fn set_target_state(&mut self, state: ModuleState) {
        if self.is_calibrating() {
            return;
        }

        let capped = ModuleState::new(
            state
                .speed_ms
                .clamp(-self.params.max_speed_ms, self.params.max_speed_ms),
            state.angle_rad,
        );

        self.target = capped.optimise(self.meas.steer_angle_rad);
    }

    /// Zero speed while holding the measured angle.
    pub fn stop(&mut self) {
        self.target = ModuleState::new(0.0, self.meas.steer_angle_rad);
    }

    /// Stop actuating the module entirely. Cancels any calibration.
    pub fn idle(&mut self) {
        if self.is_calibrating() {
            warn!("{} module calibration cancelled by idle", self.id);
        }
        self.mode = Mode::Idle;
    }

    /// Return an idle module to normal control.
    pub fn enable(&mut self) {
        if let Mode::Idle = self.mode {
            self.normal.reset();
            self.stop();
            self.mode = Mode::Normal;
        }
    }

    /// Start calibrating one of the module's motors.
    pub fn start_calibration(&mut self, motor: CalibMotor) -> Result<(), SwerveModuleError> {
        match self.mode {
            Mode::Calibrating(_) => Err(SwerveModuleError::AlreadyCalibrating(self.id)),
            Mode::Idle => Err(SwerveModuleError::ModuleIdle(self.id)),
            Mode::Normal => {
                info!("{} module starting {:?} calibration", self.id, motor);
                self.mode = Mode::Calibrating(Calibration::new(motor, self.params.calib));
                Ok(())
            }
        }
    }

    /// Abandon a calibration, discarding its samples. Returns true if a
    /// calibration was running.
    pub fn cancel_calibration(&mut self) -> bool {
        if self.is_calibrating() {
            info!("{} module calibration cancelled", self.id);
            self.return_to_normal();
            true
        } else {
            false
        }
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.mode, Mode::Calibrating(_))
    }

    pub fn mode(&self) -> ModuleMode {
        match self.mode {
            Mode::Idle => ModuleMode::Idle,
            Mode::Normal => ModuleMode::Normal,
            Mode::Calibrating(_) => ModuleMode::Calibrating,
        }
    }

    /// Take the log of the most recently finished calibration.
    pub fn take_calibration_log(&mut self) -> Option<CalibrationLog> {
        self.finished_calib.take()
    }

    /// Run the module's control loop for one cycle.
    ///
    /// In a brownout every output is zero whatever the mode, and any
    /// calibration is paused.
    pub fn drive(&mut self, dt_s: f64, brownout: bool) -> ModuleDemand {
        self.report.drive_current_limited = false;
        self.report.steer_current_limited = false;
        self.report.mode = self.mode();

        if brownout {
            return ModuleDemand::default();
        }

        let ctx = ControlContext {
            measurement: &self.meas,
            target: self.target,
            dt_s,
        };

        let mut demand = match self.mode {
            Mode::Idle => ModuleDemand {
                drive_velocity_ms: 0.0,
                steer_angle_rad: self.meas.steer_angle_rad,
                drive_volts: 0.0,
                steer_volts: 0.0,
            },
            Mode::Normal => self.normal.step(&ctx),
            Mode::Calibrating(ref mut c) => c.step(&ctx),
        };

        let (drive_volts, drive_limited) = limit_current(
            demand.drive_volts,
            self.meas.drive_current_a,
            self.params.drive_current_limit_a,
        );
        let (steer_volts, steer_limited) = limit_current(
            demand.steer_volts,
            self.meas.steer_current_a,
            self.params.steer_current_limit_a,
        );
        demand.drive_volts = drive_volts;
        demand.steer_volts = steer_volts;
        self.report.drive_current_limited = drive_limited;
        self.report.steer_current_limited = steer_limited;

        let calib_done = match self.mode {
            Mode::Calibrating(ref c) => c.is_complete(),
            _ => false,
        };
        if calib_done {
            info!("{} module calibration complete", self.id);
            if let Mode::Calibrating(c) = std::mem::replace(&mut self.mode, Mode::Normal) {
                self.finished_calib = Some(c.into_log(self.id));
            }
            self.return_to_normal();
        }

        demand
    }

    /// Clear the controller history, used after any period without control.
    pub fn reset_controllers(&mut self) {
        self.normal.reset();
    }

    fn return_to_normal(&mut self) {
        self.mode = Mode::Normal;
        self.normal.reset();
        self.stop();
    }

    /// Measured wheel velocity and angle.
    pub fn get_state(&self) -> ModuleState {
        ModuleState {
            speed_ms: self.meas.drive_velocity_ms,
            angle_rad: self.meas.steer_angle_rad,
        }
    }

    /// Measured cumulative distance and wheel angle.
    pub fn get_position(&self) -> ModulePosition {
        ModulePosition {
            distance_m: self.meas.drive_position_m,
            angle_rad: self.meas.steer_angle_rad,
        }
    }

    /// The optimised target state.
    pub fn get_target(&self) -> ModuleState {
        self.target
    }

    /// Total measured current of both motors.
    ///
    /// Units: amps
    pub fn current_a(&self) -> f64 {
        self.meas.drive_current_a.abs() + self.meas.steer_current_a.abs()
    }

    pub fn measurement(&self) -> &Measurement {
        &self.meas
    }

    pub fn report(&self) -> ModuleReport {
        self.report
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale `volts` by `limit / measured` if the measured current is over the
/// limit.
fn limit_current(volts: f64, measured_a: f64, limit_a: f64) -> (f64, bool) {
    if measured_a.abs() > limit_a && limit_a > 0.0 {
        (volts * limit_a / measured_a.abs(), true)
    } else {
        (volts, false)
    }
}
