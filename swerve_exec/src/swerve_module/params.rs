//! Parameters for a swerve module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains for one actuator type.
///
/// The feedback terms act on the error in the actuator's controlled
/// quantity, the feedforward terms produce volts from the setpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GainProfile {
    pub k_p: f64,
    #[serde(default)]
    pub k_i: f64,
    #[serde(default)]
    pub k_d: f64,

    /// Static friction voltage
    #[serde(default)]
    pub k_s: f64,

    /// Volts per unit velocity
    #[serde(default)]
    pub k_v: f64,

    /// Volts per unit acceleration
    #[serde(default)]
    pub k_a: f64,
}

/// Parameters shared by all four modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleParams {
    // ---- CAPABILITIES ----
    /// Hard cap on the wheel speed.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Maximum voltage either motor may be commanded.
    ///
    /// Units: volts
    pub max_volts: f64,

    // ---- HOMING ----
    /// Below this wheel speed the module counts as stationary for re-seeding
    /// the incremental steer encoder.
    ///
    /// Units: meters/second
    pub velocity_deadband_ms: f64,

    /// Maximum error between the measured and target angle for the
    /// incremental encoder to be re-seeded.
    ///
    /// Units: radians
    pub seed_tolerance_rad: f64,

    // ---- CONTROL ----
    pub drive_gains: GainProfile,
    pub steer_gains: GainProfile,

    // ---- SAFETY ----
    /// Units: amps
    pub drive_current_limit_a: f64,

    /// Units: amps
    pub steer_current_limit_a: f64,

    pub calib: CalibParams,
}

/// Voltage profile used when calibrating a motor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibParams {
    /// Units: volts/second
    pub quasistatic_ramp_vps: f64,

    /// Units: seconds
    pub quasistatic_duration_s: f64,

    /// Time at zero volts between the two tests.
    ///
    /// Units: seconds
    pub rest_duration_s: f64,

    /// Units: volts
    pub dynamic_step_volts: f64,

    /// Units: seconds
    pub dynamic_duration_s: f64,
}
