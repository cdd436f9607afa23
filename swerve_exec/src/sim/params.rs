//! Plant simulation parameters

use serde::{Deserialize, Serialize};

use crate::{drive_ctrl::GeometryParams, kinematics::NUM_MODULES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    pub geometry: GeometryParams,

    // ---- DRIVE MOTOR ----
    /// Volts per meter/second of wheel speed at steady state
    pub drive_kv_vpms: f64,

    /// Volts needed to overcome static friction
    pub drive_ks_v: f64,

    /// Units: seconds
    pub drive_time_constant_s: f64,

    /// Units: ohms
    pub drive_resistance_ohm: f64,

    // ---- STEER MOTOR ----
    /// Steady state steer rate per volt.
    ///
    /// Units: radians/second/volt
    pub steer_rate_per_volt: f64,

    /// Units: seconds
    pub steer_time_constant_s: f64,

    /// Units: ohms
    pub steer_resistance_ohm: f64,

    /// Wheel angles at power on, unknown to the controller until the
    /// absolute encoders are read.
    ///
    /// Units: radians
    pub initial_steer_rad: [f64; NUM_MODULES],

    // ---- SENSORS ----
    /// Time between fresh absolute encoder samples.
    ///
    /// Units: seconds
    pub abs_encoder_period_s: f64,

    /// Fractional scale error of the incremental steer encoders
    pub incremental_scale_error: f64,

    /// Units: radians/second
    pub gyro_drift_rads: f64,

    // ---- BATTERY ----
    /// Units: volts
    pub battery_voltage_v: f64,

    /// Units: ohms
    pub battery_resistance_ohm: f64,

    pub vision: VisionParams,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VisionParams {
    pub enabled: bool,

    /// Time between measurements.
    ///
    /// Units: seconds
    pub period_s: f64,

    /// Delay between capture and delivery.
    ///
    /// Units: seconds
    pub latency_s: f64,

    /// Amplitude of the position error.
    ///
    /// Units: meters
    pub noise_m: f64,

    /// Amplitude of the heading error.
    ///
    /// Units: radians
    pub noise_rad: f64,

    /// Standard deviations reported with each measurement.
    pub std_devs: [f64; 3],
}
