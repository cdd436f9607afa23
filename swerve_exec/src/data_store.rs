//! # Data Store
//!
//! Everything the executable carries from one cycle to the next.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};

use crate::{
    drive_ctrl::{self, DriveCtrl},
    mech::{self, IntakeState, IntentArbiter, StateMachine, StatusIntent},
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the robot has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeCmd,
    CycleOverrunLimit,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time at the start of the cycle
    pub time_s: f64,

    // Safe mode variables
    /// Determines if the robot is in safe mode.
    pub safe: bool,

    /// Gives the reason for the robot being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // DriveCtrl
    pub drive_ctrl: DriveCtrl,
    pub drive_ctrl_input: drive_ctrl::InputData,
    pub drive_ctrl_output: drive_ctrl::OutputData,
    pub drive_ctrl_status_rpt: drive_ctrl::StatusReport,

    // Mechanisms
    pub intake: StateMachine<IntakeState>,

    /// Resolves the status shown to the operator
    pub status_arbiter: IntentArbiter<StatusIntent>,
    pub status: Option<StatusIntent>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    pub fn new(drive_ctrl: DriveCtrl) -> Self {
        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            time_s: 0.0,
            safe: false,
            safe_cause: None,
            drive_ctrl,
            drive_ctrl_input: Default::default(),
            drive_ctrl_output: Default::default(),
            drive_ctrl_status_rpt: Default::default(),
            intake: mech::intake(),
            status_arbiter: IntentArbiter::new(),
            status: None,
            num_consec_cycle_overruns: 0,
        }
    }

    /// Puts the robot into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            self.drive_ctrl.make_safe();

            // Off is reachable from every intake state
            if let Err(e) = self.intake.request_transition(IntakeState::Off) {
                warn!("Could not stop the intake: {}", e);
            }
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns true if safe mode is now disabled. The cause must match the
    /// reason safe mode was entered.
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> bool {
        if !self.safe {
            return true;
        }

        match self.safe_cause {
            Some(root_cause) if root_cause != cause => {
                warn!(
                    "Make unsafe requested, root cause ({:?}) differs from request ({:?}), \
                    rejected",
                    root_cause, cause
                );
                false
            }
            _ => {
                self.safe = false;
                self.safe_cause = None;
                self.drive_ctrl.make_unsafe();
                info!("Make unsafe requested, safe mode disabled");
                true
            }
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Sets the 1Hz cycle flag and the cycle time.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64, time_s: f64) {
        let hz = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % hz == 0;

        self.time_s = time_s;
        self.drive_ctrl_input.time_s = time_s;
    }

    /// Publish this cycle's status intents and resolve the winner.
    pub fn resolve_status(&mut self) {
        let rpt = &self.drive_ctrl_status_rpt;

        if self.safe {
            self.status_arbiter.publish(StatusIntent::Safe);
        }
        if rpt.brownout.brownout {
            self.status_arbiter.publish(StatusIntent::Brownout);
        }
        if rpt.calibrating.is_some() {
            self.status_arbiter.publish(StatusIntent::Calibrating);
        }
        if self.intake.current_state() != IntakeState::Off {
            self.status_arbiter.publish(StatusIntent::Intaking);
        }
        if !self.drive_ctrl.target_speeds().is_zero() {
            self.status_arbiter.publish(StatusIntent::Driving);
        }
        self.status_arbiter.publish(StatusIntent::Idle);

        let status = self.status_arbiter.resolve();
        if status != self.status {
            info!("Status: {:?}", status);
        }
        self.status = status;
    }
}
