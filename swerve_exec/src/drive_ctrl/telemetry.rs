//! Per-cycle telemetry
//!
//! A [`CycleSnapshot`] is copied out of the coordinator at the end of each
//! cycle for observers. [`CycleRecord`] flattens it into a CSV archive row.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    kinematics::{ChassisSpeeds, ModuleState, NUM_MODULES},
    loc::Pose,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Copy of the drivetrain's state at the end of a cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleSnapshot {
    /// Units: seconds
    pub time_s: f64,

    /// Pose with wrapped heading
    pub pose: Pose,

    pub measured_states: [ModuleState; NUM_MODULES],
    pub target_states: [ModuleState; NUM_MODULES],

    /// Robot frame
    pub measured_speeds: ChassisSpeeds,

    /// Robot frame, after acceleration limiting
    pub target_speeds: ChassisSpeeds,

    /// Units: amps
    pub total_current_a: f64,

    pub brownout: bool,
    pub safe: bool,
}

/// A flat archive row.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CycleRecord {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub meas_vx_ms: f64,
    pub meas_vy_ms: f64,
    pub meas_omega_rads: f64,
    pub target_vx_ms: f64,
    pub target_vy_ms: f64,
    pub target_omega_rads: f64,
    pub fl_speed_ms: f64,
    pub fl_angle_rad: f64,
    pub fr_speed_ms: f64,
    pub fr_angle_rad: f64,
    pub bl_speed_ms: f64,
    pub bl_angle_rad: f64,
    pub br_speed_ms: f64,
    pub br_angle_rad: f64,
    pub total_current_a: f64,
    pub brownout: bool,
    pub safe: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<&CycleSnapshot> for CycleRecord {
    fn from(s: &CycleSnapshot) -> Self {
        let m = &s.measured_states;

        Self {
            time_s: s.time_s,
            x_m: s.pose.position_m_fm[0],
            y_m: s.pose.position_m_fm[1],
            heading_rad: s.pose.heading_rad,
            meas_vx_ms: s.measured_speeds.vx_ms,
            meas_vy_ms: s.measured_speeds.vy_ms,
            meas_omega_rads: s.measured_speeds.omega_rads,
            target_vx_ms: s.target_speeds.vx_ms,
            target_vy_ms: s.target_speeds.vy_ms,
            target_omega_rads: s.target_speeds.omega_rads,
            fl_speed_ms: m[0].speed_ms,
            fl_angle_rad: m[0].angle_rad,
            fr_speed_ms: m[1].speed_ms,
            fr_angle_rad: m[1].angle_rad,
            bl_speed_ms: m[2].speed_ms,
            bl_angle_rad: m[2].angle_rad,
            br_speed_ms: m[3].speed_ms,
            br_angle_rad: m[3].angle_rad,
            total_current_a: s.total_current_a,
            brownout: s.brownout,
            safe: s.safe,
        }
    }
}
