//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    kinematics::{WheelGeometry, NUM_MODULES},
    loc::LocParams,
    swerve_module::{GainProfile, ModuleParams},
    teleop::TeleopParams,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drivetrain, loaded from `drive_ctrl.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Nominal control period, used as the time step on the first cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    pub geometry: GeometryParams,

    // ---- CAPABILITIES ----
    /// Maximum achievable wheel speed, module states are desaturated to this.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Units: radians/second^2
    pub max_angular_accel_radss: f64,

    pub module: ModuleParams,
    pub safety: SafetyLimits,
    pub auto: AutoParams,
    pub loc: LocParams,
    pub teleop: TeleopParams,
}

/// Module layout, either a rectangle or explicit offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryParams {
    /// Distance between front and back wheels.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Distance between left and right wheels.
    ///
    /// Units: meters
    pub trackwidth_m: f64,

    /// Explicit module offsets, overriding the rectangle.
    ///
    /// Units: meters,
    /// Frame: Robot body
    #[serde(default)]
    pub offsets_m: Option<[[f64; 2]; NUM_MODULES]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Units: amps
    pub aggregate_current_limit_a: f64,

    /// Below this bus voltage every output is zeroed.
    ///
    /// Units: volts
    pub min_voltage_v: f64,

    /// Keep outputs zeroed after a brownout until the drivetrain is made
    /// unsafe.
    #[serde(default)]
    pub latch_brownout: bool,
}

/// Gains and limits for the pose-seeking commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoParams {
    /// Position error to velocity
    pub move_gains: GainProfile,

    /// Heading error to angular rate
    pub rotate_gains: GainProfile,

    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Units: radians/second
    pub max_angular_rate_rads: f64,

    /// Units: meters
    pub position_tolerance_m: f64,

    /// Units: radians
    pub heading_tolerance_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GeometryParams {
    pub fn wheel_geometry(&self) -> WheelGeometry {
        match self.offsets_m {
            Some(offsets_m) => WheelGeometry { offsets_m },
            None => WheelGeometry::rectangular(self.wheelbase_m, self.trackwidth_m),
        }
    }
}
