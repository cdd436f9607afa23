//! # Executive commands
//!
//! Commands accepted by the executable, read from a command script.

use serde::{Deserialize, Serialize};

use crate::{drive_ctrl::DriveCmd, mech::IntakeState, sim::SimFaults};

/// A command to the executable.
///
/// Serialised externally tagged, for example `"MakeSafe"` or
/// `{"Drive": {"type": "Park"}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExecCmd {
    MakeSafe,
    MakeUnsafe,
    Drive(DriveCmd),
    Intake(IntakeState),

    /// Inject faults into the plant simulation
    SimFaults(SimFaults),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{kinematics::ModuleId, swerve_module::CalibMotor};

    #[test]
    fn test_exec_cmd_json() {
        let cmd: ExecCmd = serde_json::from_str(r#""MakeSafe""#).unwrap();
        assert_eq!(cmd, ExecCmd::MakeSafe);

        let cmd: ExecCmd = serde_json::from_str(
            r#"{"Drive": {"type": "Calibrate", "module": "FrontRight", "motor": "Steer"}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            ExecCmd::Drive(DriveCmd::Calibrate {
                module: ModuleId::FrontRight,
                motor: CalibMotor::Steer
            })
        );

        let cmd: ExecCmd = serde_json::from_str(r#"{"SimFaults": {"gyro_disconnected": true}}"#).unwrap();
        match cmd {
            ExecCmd::SimFaults(f) => {
                assert!(f.gyro_disconnected);
                assert_eq!(f.bus_voltage_override_v, None);
            }
            c => panic!("Wrong command {:?}", c),
        }
    }
}
