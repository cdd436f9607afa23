//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, trace, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::{
    archive::{ArchiveError, Archiver},
    module::State,
    session::Session,
};

use super::{
    aggregate_backoff, apply_backoff, AccelLimiter, AutoControllers, BrownoutMonitor,
    BrownoutStatus, CycleRecord, CycleSnapshot, DriveCmd, DriveCtrlError, Params,
    TrajectorySample, PARK_ANGLES_RAD,
};
use crate::{
    kinematics::{
        desaturate, ChassisSpeeds, ModuleId, ModulePosition, ModuleState, SwerveKinematics,
        NUM_MODULES,
    },
    loc::{LocReport, Pose, PoseEstimator, VisionSender},
    swerve_module::{
        CalibMotor, CalibrationLog, ModuleDemand, ModuleReport, ModuleSensors, SwerveModule,
    },
    teleop::{InputShaper, TeleopInput},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drivetrain coordinator state
pub struct DriveCtrl {
    params: Params,

    kinematics: SwerveKinematics,
    modules: [SwerveModule; NUM_MODULES],
    estimator: PoseEstimator,
    shaper: InputShaper,
    limiter: AccelLimiter,
    auto: AutoControllers,
    brownout: BrownoutMonitor,

    motion: Motion,

    /// Last unoptimised states from the kinematics, reused for their angles
    /// when the chassis speed is zero
    last_states: [ModuleState; NUM_MODULES],

    safe: bool,
    prev_time_s: Option<f64>,

    report: StatusReport,
    snapshot: CycleSnapshot,

    arch: Option<Archiver>,
}

/// Sensor readings for the whole drivetrain for one cycle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DriveSensors {
    pub modules: [ModuleSensors; NUM_MODULES],

    /// Heading sensor reading, `None` if disconnected.
    ///
    /// Units: radians
    pub gyro_heading_rad: Option<f64>,

    /// Units: volts
    pub bus_voltage_v: Option<f64>,
}

/// Input data to DriveCtrl.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Time of this cycle on the control loop's clock.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub sensors: DriveSensors,
}

/// Output of DriveCtrl for one cycle.
#[derive(Debug, Clone, Default)]
pub struct OutputData {
    /// Demands to write to the modules
    pub demands: [ModuleDemand; NUM_MODULES],

    /// Pose with wrapped heading
    pub pose: Pose,

    /// Logs of calibrations which finished this cycle
    pub calibration_logs: Vec<CalibrationLog>,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub safe: bool,

    pub brownout: BrownoutStatus,

    /// Units: amps
    pub total_current_a: f64,

    /// Factor applied to every module's volts by the aggregate current
    /// limit, `None` if within the limit
    pub current_backoff: Option<f64>,

    pub desaturated: bool,
    pub accel_limited: bool,

    /// Set while a go-to-pose command is within tolerance of its goal
    pub at_goal: bool,

    pub calibrating: Option<ModuleId>,

    pub modules: [ModuleReport; NUM_MODULES],

    pub loc: LocReport,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The persistent motion command.
#[derive(Debug, Clone, Copy)]
enum Motion {
    Stopped,
    Park,
    Velocity {
        speeds: ChassisSpeeds,
        field_relative: bool,
    },
    Teleop(TeleopInput),
    GoToPose(Pose),
    FacePoint {
        vx_ms: f64,
        vy_ms: f64,
        point_m_fm: Vector2<f64>,
        offset_rad: f64,
    },
    FollowSample(TrajectorySample),
}

/// What the modules should do this cycle.
enum Request {
    /// Robot frame speeds through the limiter and kinematics
    Speeds(ChassisSpeeds),

    /// Bypass the limiter and kinematics
    States([ModuleState; NUM_MODULES]),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {
    /// Create a new drivetrain from its parameters.
    pub fn new(params: Params) -> Result<Self, DriveCtrlError> {
        let kinematics = SwerveKinematics::new(&params.geometry.wheel_geometry())?;

        let modules = [
            SwerveModule::new(ModuleId::FrontLeft, &params.module),
            SwerveModule::new(ModuleId::FrontRight, &params.module),
            SwerveModule::new(ModuleId::BackLeft, &params.module),
            SwerveModule::new(ModuleId::BackRight, &params.module),
        ];

        Ok(Self {
            estimator: PoseEstimator::new(params.loc.clone(), kinematics.clone()),
            shaper: InputShaper::new(params.teleop.clone()),
            limiter: AccelLimiter::new(params.max_accel_mss, params.max_angular_accel_radss),
            auto: AutoControllers::new(&params.auto),
            brownout: BrownoutMonitor::new(
                params.safety.min_voltage_v,
                params.safety.latch_brownout,
            ),
            kinematics,
            modules,
            motion: Motion::Stopped,
            last_states: [ModuleState::default(); NUM_MODULES],
            safe: false,
            prev_time_s: None,
            report: StatusReport::default(),
            snapshot: CycleSnapshot::default(),
            arch: None,
            params,
        })
    }

    // ---- COMMANDS ----

    /// Execute a drivetrain command.
    ///
    /// Motion commands are rejected in safe mode. On error nothing changes.
    pub fn exec_cmd(&mut self, cmd: &DriveCmd) -> Result<(), DriveCtrlError> {
        debug!("DriveCtrl command: {:?}", cmd);

        match *cmd {
            DriveCmd::FieldRelative {
                vx_ms,
                vy_ms,
                omega_rads,
            } => self.drive_field_relative(vx_ms, vy_ms, omega_rads),
            DriveCmd::RobotRelative {
                vx_ms,
                vy_ms,
                omega_rads,
            } => self.drive_robot_relative(vx_ms, vy_ms, omega_rads),
            DriveCmd::Park => self.park(),
            DriveCmd::Stop => {
                self.stop();
                Ok(())
            }
            DriveCmd::GoToPose { pose } => self.go_to_pose(pose),
            DriveCmd::FacePoint {
                vx_ms,
                vy_ms,
                x_m,
                y_m,
                offset_rad,
            } => self.face_point(vx_ms, vy_ms, Vector2::new(x_m, y_m), offset_rad),
            DriveCmd::FollowSample(sample) => self.follow_sample(sample),
            DriveCmd::Teleop(input) => self.teleop(input),
            DriveCmd::Calibrate { module, motor } => self.start_calibration(module, motor),
            DriveCmd::CancelCalibration => {
                self.cancel_calibration();
                Ok(())
            }
            DriveCmd::ResetPose(pose) => {
                self.reset_pose(pose);
                Ok(())
            }
            DriveCmd::ZeroHeading => {
                self.zero_heading();
                Ok(())
            }
        }
    }

    /// Drive at a field frame velocity, rotated into the robot frame by the
    /// estimated heading each cycle.
    pub fn drive_field_relative(
        &mut self,
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,
    ) -> Result<(), DriveCtrlError> {
        self.set_motion(
            "FieldRelative",
            Motion::Velocity {
                speeds: ChassisSpeeds::new(vx_ms, vy_ms, omega_rads),
                field_relative: true,
            },
        )
    }

    /// Drive at a robot frame velocity.
    pub fn drive_robot_relative(
        &mut self,
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,
    ) -> Result<(), DriveCtrlError> {
        self.set_motion(
            "RobotRelative",
            Motion::Velocity {
                speeds: ChassisSpeeds::new(vx_ms, vy_ms, omega_rads),
                field_relative: false,
            },
        )
    }

    /// Put the wheels in an X with zero speed.
    pub fn park(&mut self) -> Result<(), DriveCtrlError> {
        self.set_motion("Park", Motion::Park)?;
        self.limiter.reset(ChassisSpeeds::default());
        Ok(())
    }

    /// Zero speed, holding the last commanded wheel angles. Always allowed.
    pub fn stop(&mut self) {
        self.motion = Motion::Stopped;
        self.limiter.reset(ChassisSpeeds::default());
    }

    pub fn go_to_pose(&mut self, goal: Pose) -> Result<(), DriveCtrlError> {
        self.set_motion("GoToPose", Motion::GoToPose(goal))?;
        self.auto.reset();
        Ok(())
    }

    pub fn face_point(
        &mut self,
        vx_ms: f64,
        vy_ms: f64,
        point_m_fm: Vector2<f64>,
        offset_rad: f64,
    ) -> Result<(), DriveCtrlError> {
        let was_facing = matches!(self.motion, Motion::FacePoint { .. });
        self.set_motion(
            "FacePoint",
            Motion::FacePoint {
                vx_ms,
                vy_ms,
                point_m_fm,
                offset_rad,
            },
        )?;
        if !was_facing {
            self.auto.reset();
        }
        Ok(())
    }

    /// Track a trajectory sample until the next one arrives.
    pub fn follow_sample(&mut self, sample: TrajectorySample) -> Result<(), DriveCtrlError> {
        let was_following = matches!(self.motion, Motion::FollowSample(_));
        self.set_motion("FollowSample", Motion::FollowSample(sample))?;
        if !was_following {
            self.auto.reset();
        }
        Ok(())
    }

    pub fn teleop(&mut self, input: TeleopInput) -> Result<(), DriveCtrlError> {
        self.set_motion("Teleop", Motion::Teleop(input))
    }

    fn set_motion(&mut self, name: &'static str, motion: Motion) -> Result<(), DriveCtrlError> {
        if self.safe {
            return Err(DriveCtrlError::SafeModeActive(name));
        }
        self.motion = motion;
        Ok(())
    }

    /// Start calibrating one motor of a module. Only one module may calibrate
    /// at a time.
    pub fn start_calibration(
        &mut self,
        module: ModuleId,
        motor: CalibMotor,
    ) -> Result<(), DriveCtrlError> {
        if self.safe {
            return Err(DriveCtrlError::SafeModeActive("Calibrate"));
        }

        if let Some(active) = self.calibrating_module() {
            return Err(DriveCtrlError::CalibrationBusy {
                requested: module,
                active,
            });
        }

        self.modules[module.index()].start_calibration(motor)?;
        Ok(())
    }

    /// Cancel any running calibration.
    pub fn cancel_calibration(&mut self) {
        let cancelled = self
            .modules
            .iter_mut()
            .fold(false, |acc, m| m.cancel_calibration() || acc);

        if !cancelled {
            debug!("No calibration to cancel");
        }
    }

    pub fn calibrating_module(&self) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|m| m.is_calibrating())
            .map(|m| m.id())
    }

    pub fn reset_pose(&mut self, pose: Pose) {
        self.estimator.reset_pose(pose);
    }

    pub fn zero_heading(&mut self) {
        self.estimator.zero_heading();
    }

    /// Handle for submitting vision measurements from another thread.
    pub fn vision_sender(&self) -> VisionSender {
        self.estimator.vision_sender()
    }

    // ---- SAFE MODE ----

    /// Zero all actuation from this cycle on and discard the active command.
    pub fn make_safe(&mut self) {
        if !self.safe {
            warn!("DriveCtrl made safe");
        }
        self.safe = true;
        self.cancel_calibration();
        self.stop();
    }

    /// Resume control with a stopped drivetrain. Clears a latched brownout.
    pub fn make_unsafe(&mut self) {
        if self.safe {
            info!("DriveCtrl made unsafe");
        }
        self.safe = false;
        self.brownout.clear_latch();
        self.stop();
        for m in self.modules.iter_mut() {
            m.reset_controllers();
        }
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    // ---- TELEMETRY ----

    /// Pose with the heading wrapped into (-pi, pi].
    pub fn get_pose(&self) -> Pose {
        self.estimator.get_pose()
    }

    pub fn get_continuous_pose(&self) -> Pose {
        self.estimator.get_continuous_pose()
    }

    pub fn measured_states(&self) -> [ModuleState; NUM_MODULES] {
        let mut s = [ModuleState::default(); NUM_MODULES];
        for (s, m) in s.iter_mut().zip(self.modules.iter()) {
            *s = m.get_state();
        }
        s
    }

    /// Optimised target states of each module.
    pub fn target_states(&self) -> [ModuleState; NUM_MODULES] {
        let mut s = [ModuleState::default(); NUM_MODULES];
        for (s, m) in s.iter_mut().zip(self.modules.iter()) {
            *s = m.get_target();
        }
        s
    }

    pub fn module_positions(&self) -> [ModulePosition; NUM_MODULES] {
        let mut p = [ModulePosition::default(); NUM_MODULES];
        for (p, m) in p.iter_mut().zip(self.modules.iter()) {
            *p = m.get_position();
        }
        p
    }

    /// Robot frame speeds estimated from the measured module states.
    pub fn measured_speeds(&self) -> ChassisSpeeds {
        self.kinematics.to_chassis_speeds(&self.measured_states())
    }

    /// Robot frame speeds after acceleration limiting.
    pub fn target_speeds(&self) -> ChassisSpeeds {
        self.limiter.current()
    }

    /// Measured velocity in the field frame.
    pub fn field_velocity(&self) -> ChassisSpeeds {
        self.measured_speeds()
            .robot_to_field(self.estimator.get_continuous_pose().heading_rad)
    }

    /// Field pose of each module, heading being the wheel direction.
    pub fn module_poses(&self) -> [Pose; NUM_MODULES] {
        let pose = self.estimator.get_continuous_pose();
        let mut poses = [Pose::default(); NUM_MODULES];

        for ((p, o), m) in poses
            .iter_mut()
            .zip(self.kinematics.offsets_m().iter())
            .zip(self.modules.iter())
        {
            *p = Pose {
                position_m_fm: pose.transform_point(o),
                heading_rad: pose.heading_rad + m.get_state().angle_rad,
            }
            .wrapped();
        }

        poses
    }

    pub fn total_current_a(&self) -> f64 {
        self.modules.iter().map(|m| m.current_a()).sum()
    }

    pub fn module(&self, id: ModuleId) -> &SwerveModule {
        &self.modules[id.index()]
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Copy of the state at the end of the last cycle.
    pub fn snapshot(&self) -> CycleSnapshot {
        self.snapshot
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // ---- CYCLE ----

    fn cycle_dt(&mut self, time_s: f64) -> f64 {
        let dt = match self.prev_time_s {
            Some(p) if time_s > p => time_s - p,
            _ => self.params.cycle_period_s,
        };
        self.prev_time_s = Some(time_s);
        dt
    }

    /// Work out what the modules should do for the active command.
    fn request(&mut self, pose: &Pose, dt_s: f64) -> Request {
        let heading_rad = pose.heading_rad;

        match self.motion {
            Motion::Stopped => Request::Speeds(ChassisSpeeds::default()),
            Motion::Park => {
                let mut states = [ModuleState::default(); NUM_MODULES];
                for (s, a) in states.iter_mut().zip(PARK_ANGLES_RAD.iter()) {
                    *s = ModuleState::new(0.0, *a);
                }
                Request::States(states)
            }
            Motion::Velocity {
                speeds,
                field_relative,
            } => {
                if field_relative {
                    Request::Speeds(speeds.field_to_robot(heading_rad))
                } else {
                    Request::Speeds(speeds)
                }
            }
            Motion::Teleop(input) => {
                let shaped = self.shaper.shape(&input);
                if self.shaper.field_relative() {
                    Request::Speeds(shaped.field_to_robot(heading_rad))
                } else {
                    Request::Speeds(shaped)
                }
            }
            Motion::GoToPose(goal) => {
                let (field, at_goal) = self.auto.go_to_pose(pose, &goal, dt_s);
                self.report.at_goal = at_goal;
                Request::Speeds(field.field_to_robot(heading_rad))
            }
            Motion::FacePoint {
                vx_ms,
                vy_ms,
                point_m_fm,
                offset_rad,
            } => {
                let field =
                    self.auto
                        .face_point(pose, vx_ms, vy_ms, &point_m_fm, offset_rad, dt_s);
                Request::Speeds(field.field_to_robot(heading_rad))
            }
            Motion::FollowSample(sample) => {
                let field = self.auto.follow_sample(pose, &sample, dt_s);
                Request::Speeds(field.field_to_robot(heading_rad))
            }
        }
    }

    fn write_archive(&mut self) {
        let record = CycleRecord::from(&self.snapshot);
        if let Some(ref mut arch) = self.arch {
            if let Err(e) = arch.serialise(record) {
                warn!("Could not write DriveCtrl archive: {}", e);
                self.arch = None;
            }
        }
    }
}

impl State for DriveCtrl {
    /// Parameters are supplied to [`DriveCtrl::new`], initialisation only
    /// sets up the session archive.
    type InitData = &'static str;
    type InitError = ArchiveError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise DriveCtrl.
    ///
    /// Expected init data is the archive file path relative to the session's
    /// archive directory.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        self.arch = Some(Archiver::from_session(session, init_data)?);

        info!(
            "DriveCtrl initialised: max speed {:.2} m/s, accel {:.2} m/s^2, {:?}",
            self.params.max_speed_ms,
            self.params.max_accel_mss,
            self.params.geometry.wheel_geometry()
        );

        Ok(())
    }

    /// Run one control cycle.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let dt_s = self.cycle_dt(input_data.time_s);
        let sensors = &input_data.sensors;

        self.report = StatusReport {
            safe: self.safe,
            ..Default::default()
        };

        // ---- SAFETY OVERRIDE ----
        let brownout = self.brownout.update(sensors.bus_voltage_v);
        self.report.brownout = brownout;

        // ---- SENSING ----
        for (m, s) in self.modules.iter_mut().zip(sensors.modules.iter()) {
            m.update_sensors(s, dt_s);
        }

        let positions = self.module_positions();
        let pose = self.estimator.update(
            input_data.time_s,
            sensors.gyro_heading_rad,
            &positions,
        );
        self.report.loc = self.estimator.report();

        // ---- COMMAND ----
        let mut demands = [ModuleDemand::default(); NUM_MODULES];

        if self.safe {
            self.limiter.reset(ChassisSpeeds::default());
            for m in self.modules.iter_mut() {
                m.stop();
            }
        } else {
            let states = match self.request(&pose, dt_s) {
                Request::Speeds(speeds) => {
                    let (limited, accel_limited) = match self.motion {
                        // Stopping is never rate limited
                        Motion::Stopped => {
                            self.limiter.reset(speeds);
                            (speeds, false)
                        }
                        _ => self.limiter.limit(&speeds, dt_s),
                    };
                    self.report.accel_limited = accel_limited;

                    let mut states = self.kinematics.to_module_states(&limited, &self.last_states);
                    self.report.desaturated = desaturate(&mut states, self.params.max_speed_ms);
                    states
                }
                Request::States(states) => states,
            };
            self.last_states = states;

            // Calibrating modules ignore these
            for (m, s) in self.modules.iter_mut().zip(states.iter()) {
                m.set_target_state(*s);
            }

            // ---- MODULE CONTROL ----
            for (d, m) in demands.iter_mut().zip(self.modules.iter_mut()) {
                *d = m.drive(dt_s, brownout.brownout);
            }
        }

        // ---- CURRENT LIMIT ----
        self.report.total_current_a = self.total_current_a();
        self.report.current_backoff = aggregate_backoff(
            self.report.total_current_a,
            self.params.safety.aggregate_current_limit_a,
        );
        if let Some(factor) = self.report.current_backoff {
            debug!(
                "Aggregate current {:.1} A over limit, backing off by {:.3}",
                self.report.total_current_a, factor
            );
            apply_backoff(&mut demands, factor);
        }

        if brownout.brownout {
            demands = [ModuleDemand::default(); NUM_MODULES];
        }

        // ---- OUTPUT ----
        let mut calibration_logs = vec![];
        for (r, m) in self.report.modules.iter_mut().zip(self.modules.iter_mut()) {
            *r = m.report();
            if let Some(log) = m.take_calibration_log() {
                calibration_logs.push(log);
            }
        }
        self.report.calibrating = self.calibrating_module();

        self.snapshot = CycleSnapshot {
            time_s: input_data.time_s,
            pose: pose.wrapped(),
            measured_states: self.measured_states(),
            target_states: self.target_states(),
            measured_speeds: self.measured_speeds(),
            target_speeds: self.limiter.current(),
            total_current_a: self.report.total_current_a,
            brownout: brownout.brownout,
            safe: self.safe,
        };
        self.write_archive();

        trace!("DriveCtrl demands: {:?}", demands);

        Ok((
            OutputData {
                demands,
                pose: pose.wrapped(),
                calibration_logs,
            },
            self.report,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn drive_ctrl() -> DriveCtrl {
        let params: Params =
            util::params::parse(include_str!("../../../params/drive_ctrl.toml")).unwrap();
        DriveCtrl::new(params).unwrap()
    }

    fn input(time_s: f64, heading_rad: f64, bus_voltage_v: f64) -> InputData {
        let module = ModuleSensors {
            drive_position_m: Some(0.0),
            drive_velocity_ms: Some(0.0),
            steer_incremental_rad: Some(0.0),
            steer_absolute_rad: Some(0.0),
            drive_current_a: Some(1.0),
            steer_current_a: Some(0.5),
        };

        InputData {
            time_s,
            sensors: DriveSensors {
                modules: [module; NUM_MODULES],
                gyro_heading_rad: Some(heading_rad),
                bus_voltage_v: Some(bus_voltage_v),
            },
        }
    }

    #[test]
    fn test_park_ignores_heading() {
        for heading in [0.0, 1.0, -2.5] {
            let mut dc = drive_ctrl();
            dc.reset_pose(Pose::new(3.0, -1.0, heading));
            dc.park().unwrap();
            dc.proc(&input(0.0, heading, 12.0)).unwrap();

            for (s, a) in dc.target_states().iter().zip(PARK_ANGLES_RAD.iter()) {
                assert_eq!(s.speed_ms, 0.0);
                assert_abs_diff_eq!(s.angle_rad, *a, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_brownout_zeroes_everything() {
        let mut dc = drive_ctrl();
        dc.drive_robot_relative(2.0, 0.0, 1.0).unwrap();

        for i in 0..5 {
            dc.proc(&input(i as f64 * 0.02, 0.0, 12.0)).unwrap();
        }

        let (out, report) = dc.proc(&input(0.1, 0.0, 5.0)).unwrap();
        assert!(report.brownout.brownout);
        for d in out.demands.iter() {
            assert!(d.is_zero_actuation());
            assert_eq!(*d, ModuleDemand::default());
        }

        // Recovers without a latch
        let (out, _) = dc.proc(&input(0.12, 0.0, 12.0)).unwrap();
        assert!(out.demands.iter().any(|d| !d.is_zero_actuation()));
    }

    #[test]
    fn test_field_relative_uses_heading() {
        let mut dc = drive_ctrl();
        dc.drive_field_relative(1.0, 0.0, 0.0).unwrap();
        dc.proc(&input(0.0, FRAC_PI_2, 12.0)).unwrap();

        // One cycle of acceleration toward -y in the robot frame
        let step = dc.params().max_accel_mss * dc.params().cycle_period_s;
        let target = dc.target_speeds();
        assert_abs_diff_eq!(target.vx_ms, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(target.vy_ms, -step, epsilon = 1e-9);
        assert!(dc.report().accel_limited);
    }

    #[test]
    fn test_stop_holds_angles() {
        let mut dc = drive_ctrl();
        dc.drive_robot_relative(1.0, 1.0, 0.0).unwrap();
        for i in 0..10 {
            dc.proc(&input(i as f64 * 0.02, 0.0, 12.0)).unwrap();
        }

        dc.stop();
        dc.proc(&input(0.2, 0.0, 12.0)).unwrap();

        assert!(dc.target_speeds().is_zero());
        for s in dc.target_states().iter() {
            assert_eq!(s.speed_ms, 0.0);
            assert_abs_diff_eq!(s.angle_rad, FRAC_PI_4, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_one_calibration_at_a_time() {
        let mut dc = drive_ctrl();
        dc.start_calibration(ModuleId::FrontLeft, CalibMotor::Drive)
            .unwrap();

        match dc.start_calibration(ModuleId::BackRight, CalibMotor::Steer) {
            Err(DriveCtrlError::CalibrationBusy { requested, active }) => {
                assert_eq!(requested, ModuleId::BackRight);
                assert_eq!(active, ModuleId::FrontLeft);
            }
            r => panic!("Expected CalibrationBusy, got {:?}", r),
        }

        let (_, report) = dc.proc(&input(0.0, 0.0, 12.0)).unwrap();
        assert_eq!(report.calibrating, Some(ModuleId::FrontLeft));

        dc.exec_cmd(&DriveCmd::CancelCalibration).unwrap();
        assert_eq!(dc.calibrating_module(), None);
        dc.start_calibration(ModuleId::BackRight, CalibMotor::Steer)
            .unwrap();
    }

    #[test]
    fn test_safe_mode() {
        let mut dc = drive_ctrl();
        dc.drive_robot_relative(1.0, 0.0, 0.0).unwrap();
        dc.proc(&input(0.0, 0.0, 12.0)).unwrap();

        dc.make_safe();
        assert!(matches!(
            dc.drive_robot_relative(1.0, 0.0, 0.0),
            Err(DriveCtrlError::SafeModeActive(_))
        ));

        let (out, report) = dc.proc(&input(0.02, 0.0, 12.0)).unwrap();
        assert!(report.safe);
        assert!(out.demands.iter().all(|d| d.is_zero_actuation()));

        dc.make_unsafe();
        dc.drive_robot_relative(1.0, 0.0, 0.0).unwrap();
    }

    #[test]
    fn test_aggregate_current_backoff() {
        let mut dc = drive_ctrl();
        dc.drive_robot_relative(1.0, 0.0, 0.0).unwrap();

        let mut inp = input(0.0, 0.0, 12.0);
        for m in inp.sensors.modules.iter_mut() {
            m.drive_current_a = Some(50.0);
            m.steer_current_a = Some(25.0);
        }

        let (_, report) = dc.proc(&inp).unwrap();
        assert_abs_diff_eq!(report.total_current_a, 300.0);
        assert_eq!(report.current_backoff, None);

        for m in inp.sensors.modules.iter_mut() {
            m.drive_current_a = Some(55.0);
        }
        inp.time_s = 0.02;
        let (_, report) = dc.proc(&inp).unwrap();
        assert_abs_diff_eq!(report.current_backoff.unwrap(), 300.0 / 320.0);
    }
}
