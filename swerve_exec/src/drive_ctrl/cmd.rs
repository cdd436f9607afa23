//! Drivetrain commands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    kinematics::{ChassisSpeeds, ModuleId},
    loc::Pose,
    swerve_module::CalibMotor,
    teleop::TeleopInput,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One sample of a pre-planned trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Units: seconds
    pub time_s: f64,

    pub pose: Pose,

    /// Field frame velocity at this sample
    pub velocity: ChassisSpeeds,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the drivetrain.
///
/// Motion commands persist until replaced. The rest take effect once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DriveCmd {
    /// Velocity in the field frame
    FieldRelative {
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,
    },

    /// Velocity in the robot frame
    RobotRelative {
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,
    },

    /// Wheels in an X, zero speed
    Park,

    /// Zero speed, wheels hold their angles
    Stop,

    /// Drive to a field pose
    GoToPose { pose: Pose },

    /// Translate in the field frame while turning to face a point
    FacePoint {
        vx_ms: f64,
        vy_ms: f64,
        x_m: f64,
        y_m: f64,
        #[serde(default)]
        offset_rad: f64,
    },

    /// Track a trajectory sample
    FollowSample(TrajectorySample),

    /// Joystick input
    Teleop(TeleopInput),

    /// Calibrate one motor of a module
    Calibrate { module: ModuleId, motor: CalibMotor },

    CancelCalibration,

    ResetPose(Pose),

    ZeroHeading,
}

impl DriveCmd {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DriveCmd::FieldRelative { .. } => "FieldRelative",
            DriveCmd::RobotRelative { .. } => "RobotRelative",
            DriveCmd::Park => "Park",
            DriveCmd::Stop => "Stop",
            DriveCmd::GoToPose { .. } => "GoToPose",
            DriveCmd::FacePoint { .. } => "FacePoint",
            DriveCmd::FollowSample(_) => "FollowSample",
            DriveCmd::Teleop(_) => "Teleop",
            DriveCmd::Calibrate { .. } => "Calibrate",
            DriveCmd::CancelCalibration => "CancelCalibration",
            DriveCmd::ResetPose(_) => "ResetPose",
            DriveCmd::ZeroHeading => "ZeroHeading",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_json_commands() {
        let c: DriveCmd = serde_json::from_str(r#"{"type": "Park"}"#).unwrap();
        assert_eq!(c, DriveCmd::Park);

        let c: DriveCmd = serde_json::from_str(
            r#"{"type": "Calibrate", "module": "BackLeft", "motor": "Steer"}"#,
        )
        .unwrap();
        assert_eq!(
            c,
            DriveCmd::Calibrate {
                module: ModuleId::BackLeft,
                motor: CalibMotor::Steer
            }
        );

        let c: DriveCmd = serde_json::from_str(
            r#"{"type": "GoToPose", "pose": {"position_m_fm": [1.0, 2.0], "heading_rad": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(
            c,
            DriveCmd::GoToPose {
                pose: Pose::new(1.0, 2.0, 0.5)
            }
        );

        let c: DriveCmd =
            serde_json::from_str(r#"{"type": "Teleop", "x": 0.5, "y": 0.0, "rot": 0.1}"#).unwrap();
        assert_eq!(c.name(), "Teleop");
    }
}
