//! # Plant simulation
//!
//! A simple four module plant for running the executable and the
//! integration tests without hardware. Each module's drive and steer motors
//! are first order DC motor models. The battery sags with the total current
//! drawn, the heading sensor drifts slowly, and the absolute steer encoders
//! only produce a fresh sample every few cycles.
//!
//! Vision measurements are produced on a separate thread, see
//! [`VisionSource`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod vision;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use vision::*;

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use util::maths::wrap_pi;

use crate::{
    drive_ctrl::{DriveIo, DriveSensors},
    kinematics::{
        KinematicsError, ModuleState, SwerveKinematics, Twist, NUM_MODULES,
    },
    loc::Pose,
    swerve_module::{ModuleDemand, ModuleSensors},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated drivetrain.
pub struct SimDrive {
    params: SimParams,
    kinematics: SwerveKinematics,

    modules: [SimModule; NUM_MODULES],

    /// True pose of the robot
    pose: Pose,

    bus_voltage_v: f64,

    last_abs_sample_s: Option<f64>,
    time_s: f64,

    faults: SimFaults,
}

/// Faults injected into the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimFaults {
    #[serde(default)]
    pub gyro_disconnected: bool,

    #[serde(default)]
    pub drop_abs_encoders: bool,

    /// Report this bus voltage instead of the modelled one.
    #[serde(default)]
    pub bus_voltage_override_v: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimModule {
    drive_velocity_ms: f64,
    drive_position_m: f64,
    drive_current_a: f64,

    /// Continuous wheel angle
    steer_angle_rad: f64,
    steer_rate_rads: f64,
    steer_current_a: f64,

    /// Wheel angle when the incremental encoder was zeroed
    incremental_zero_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrive {
    pub fn new(params: SimParams) -> Result<Self, KinematicsError> {
        let kinematics = SwerveKinematics::new(&params.geometry.wheel_geometry())?;

        let mut modules = [SimModule::default(); NUM_MODULES];
        for (m, a) in modules.iter_mut().zip(params.initial_steer_rad.iter()) {
            m.steer_angle_rad = *a;
            m.incremental_zero_rad = *a;
        }

        Ok(Self {
            bus_voltage_v: params.battery_voltage_v,
            params,
            kinematics,
            modules,
            pose: Pose::default(),
            last_abs_sample_s: None,
            time_s: 0.0,
            faults: SimFaults::default(),
        })
    }

    /// The robot's true pose.
    pub fn true_pose(&self) -> Pose {
        self.pose
    }

    /// Place the robot, leaving the module states unchanged.
    pub fn set_true_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// True wheel states.
    pub fn true_states(&self) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, m) in states.iter_mut().zip(self.modules.iter()) {
            *s = ModuleState::new(m.drive_velocity_ms, m.steer_angle_rad);
        }
        states
    }

    pub fn bus_voltage_v(&self) -> f64 {
        self.bus_voltage_v
    }

    pub fn faults(&self) -> SimFaults {
        self.faults
    }

    pub fn set_faults(&mut self, faults: SimFaults) {
        if faults != self.faults {
            warn!("Simulation faults set: {:?}", faults);
        }
        self.faults = faults;
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    fn step_module(&self, m: &mut SimModule, demand: &ModuleDemand, dt_s: f64) {
        let p = &self.params;
        let max_v = self.bus_voltage_v.max(0.0);

        // Drive
        let volts = demand.drive_volts.clamp(-max_v, max_v);
        let v = m.drive_velocity_ms;
        let friction = if v != 0.0 {
            p.drive_ks_v * v.signum()
        } else if volts.abs() > p.drive_ks_v {
            p.drive_ks_v * volts.signum()
        } else {
            volts
        };
        let accel = (volts - friction - p.drive_kv_vpms * v) / (p.drive_kv_vpms * p.drive_time_constant_s);
        let mut v_next = v + accel * dt_s;

        // Friction can't reverse the wheel
        if v != 0.0 && v_next.signum() != v.signum() && volts.abs() <= p.drive_ks_v {
            v_next = 0.0;
        }

        m.drive_position_m += 0.5 * (v + v_next) * dt_s;
        m.drive_velocity_ms = v_next;
        m.drive_current_a = (volts - p.drive_kv_vpms * v_next) / p.drive_resistance_ohm;

        // Steer
        let volts = demand.steer_volts.clamp(-max_v, max_v);
        let rate_ss = volts * p.steer_rate_per_volt;
        let alpha = (dt_s / p.steer_time_constant_s).min(1.0);
        m.steer_rate_rads += (rate_ss - m.steer_rate_rads) * alpha;
        m.steer_angle_rad += m.steer_rate_rads * dt_s;
        m.steer_current_a = if p.steer_rate_per_volt > 0.0 {
            (volts - m.steer_rate_rads / p.steer_rate_per_volt) / p.steer_resistance_ohm
        } else {
            0.0
        };
    }
}

impl DriveIo for SimDrive {
    fn read_sensors(&mut self, time_s: f64) -> DriveSensors {
        self.time_s = time_s;

        let abs_fresh = !self.faults.drop_abs_encoders
            && match self.last_abs_sample_s {
                Some(t) => time_s - t >= self.params.abs_encoder_period_s,
                None => true,
            };
        if abs_fresh {
            self.last_abs_sample_s = Some(time_s);
        }

        let mut sensors = DriveSensors::default();

        for (s, m) in sensors.modules.iter_mut().zip(self.modules.iter()) {
            *s = ModuleSensors {
                drive_position_m: Some(m.drive_position_m),
                drive_velocity_ms: Some(m.drive_velocity_ms),
                steer_incremental_rad: Some(
                    (m.steer_angle_rad - m.incremental_zero_rad)
                        * (1.0 + self.params.incremental_scale_error),
                ),
                steer_absolute_rad: if abs_fresh {
                    Some(wrap_pi(m.steer_angle_rad))
                } else {
                    None
                },
                drive_current_a: Some(m.drive_current_a),
                steer_current_a: Some(m.steer_current_a),
            };
        }

        sensors.gyro_heading_rad = if self.faults.gyro_disconnected {
            None
        } else {
            Some(self.pose.heading_rad + self.params.gyro_drift_rads * time_s)
        };

        sensors.bus_voltage_v = Some(
            self.faults
                .bus_voltage_override_v
                .unwrap_or(self.bus_voltage_v),
        );

        sensors
    }

    fn write_demands(&mut self, demands: &[ModuleDemand; NUM_MODULES], dt_s: f64) {
        let mut modules = self.modules;
        for (m, d) in modules.iter_mut().zip(demands.iter()) {
            self.step_module(m, d, dt_s);
        }
        self.modules = modules;

        // Integrate the true pose from the true wheel states
        let speeds = self.kinematics.to_chassis_speeds(&self.true_states());
        self.pose = self.pose.exp(&Twist {
            dx_m: speeds.vx_ms * dt_s,
            dy_m: speeds.vy_ms * dt_s,
            dtheta_rad: speeds.omega_rads * dt_s,
        });

        let total_a: f64 = self
            .modules
            .iter()
            .map(|m| m.drive_current_a.abs() + m.steer_current_a.abs())
            .sum();
        self.bus_voltage_v =
            self.params.battery_voltage_v - total_a * self.params.battery_resistance_ohm;

        trace!(
            "Sim: true pose ({:.3}, {:.3}, {:.3}), bus {:.2} V, {:.1} A",
            self.pose.position_m_fm[0],
            self.pose.position_m_fm[1],
            self.pose.heading_rad,
            self.bus_voltage_v,
            total_a
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sim_params() -> SimParams {
        util::params::parse(include_str!("../../../params/sim.toml")).unwrap()
    }

    #[test]
    fn test_drive_reaches_steady_state() {
        let mut p = sim_params();
        p.initial_steer_rad = [0.0; NUM_MODULES];
        let mut sim = SimDrive::new(p.clone()).unwrap();

        let volts = p.drive_ks_v + p.drive_kv_vpms * 2.0;
        let demand = ModuleDemand {
            drive_volts: volts,
            ..Default::default()
        };

        for _ in 0..200 {
            sim.write_demands(&[demand; NUM_MODULES], 0.02);
        }

        for s in sim.true_states().iter() {
            assert_abs_diff_eq!(s.speed_ms, 2.0, epsilon = 1e-3);
        }

        // All wheels point forward so the robot goes forward
        let pose = sim.true_pose();
        assert!(pose.position_m_fm[0] > 5.0);
        assert_abs_diff_eq!(pose.position_m_fm[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sensor_faults() {
        let mut sim = SimDrive::new(sim_params()).unwrap();

        let s = sim.read_sensors(0.0);
        assert!(s.modules[0].steer_absolute_rad.is_some());
        assert!(s.gyro_heading_rad.is_some());

        // No fresh absolute sample on the next cycle
        let s = sim.read_sensors(0.02);
        assert!(s.modules[0].steer_absolute_rad.is_none());

        sim.set_faults(SimFaults {
            gyro_disconnected: true,
            bus_voltage_override_v: Some(5.0),
            ..Default::default()
        });
        let s = sim.read_sensors(0.04);
        assert!(s.gyro_heading_rad.is_none());
        assert_eq!(s.bus_voltage_v, Some(5.0));
    }
}
