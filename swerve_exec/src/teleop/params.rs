//! Parameters for the teleop input shaper

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeleopParams {
    /// Deadband applied to each axis, or to the translation magnitude in
    /// circular mode.
    pub deadband: f64,

    pub deadband_mode: DeadbandMode,

    /// Response curve exponent, 1 is linear.
    pub exponent: f64,

    pub snap_enabled: bool,

    /// Units: radians
    pub snap_tolerance_rad: f64,

    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Units: radians/second
    pub max_angular_rate_rads: f64,

    /// Fraction of `max_speed_ms` at full stick.
    pub drive_power: f64,

    /// Fraction of `max_speed_ms` at full stick in slow mode.
    pub slow_power: f64,

    /// Fraction of `max_angular_rate_rads` at full stick.
    pub rotate_power: f64,

    /// Whether shaped commands are field relative.
    pub field_relative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadbandMode {
    /// Deadband each axis separately
    Linear,

    /// Deadband the 2D magnitude
    Circular,
}
