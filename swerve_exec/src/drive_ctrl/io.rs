//! Hardware seam

use super::DriveSensors;
use crate::{kinematics::NUM_MODULES, swerve_module::ModuleDemand};

/// Source of drivetrain sensor readings and sink for module demands.
///
/// Implemented by the plant simulation, and by hardware drivers on the
/// robot.
pub trait DriveIo {
    /// Read every sensor for the cycle starting at `time_s`.
    fn read_sensors(&mut self, time_s: f64) -> DriveSensors;

    /// Apply the cycle's demands, which hold until the next write.
    fn write_demands(&mut self, demands: &[ModuleDemand; NUM_MODULES], dt_s: f64);
}
