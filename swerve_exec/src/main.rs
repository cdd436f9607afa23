//! Main swerve drive executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Command processing from the script
//!         - Sensor acquisition from the drivetrain
//!         - Drivetrain control processing:
//!             - Pose estimation
//!             - Command to chassis speeds
//!             - Kinematics and module control
//!         - Actuation of the drivetrain
//!         - Status resolution
//!
//! # Modules
//!
//! All modules (e.g. `drive_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!
//! The drivetrain is the plant simulation in `swerve_lib::sim`, behind the
//! `DriveIo` trait.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use swerve_lib::{
    data_store::{DataStore, SafeModeCause},
    drive_ctrl::{DriveCtrl, DriveIo},
    exec_cmd::ExecCmd,
    kinematics::NUM_MODULES,
    params::SwerveExecParams,
    sim::{SimDrive, SimParams, VisionSource},
    swerve_module::ModuleDemand,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("swerve_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!("Running on: {}", host::get_platform());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: SwerveExecParams =
        util::params::load("swerve_exec.toml").wrap_err("Could not load exec params")?;
    let sim_params: SimParams =
        util::params::load("sim.toml").wrap_err("Could not load sim params")?;

    info!("Exec parameters loaded");

    let cycle_frequency_hz = 1.0 / exec_params.cycle_period_s;

    // ---- LOAD SCRIPT ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected one argument, the path to a command script, found {}",
            args.len() - 1
        ));
    }

    info!("Loading script from \"{}\"", &args[1]);

    let mut script: ScriptInterpreter<ExecCmd> =
        ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} commands\n",
        script.get_duration(),
        script.get_num_cmds()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let drive_ctrl_params =
        util::params::load("drive_ctrl.toml").wrap_err("Could not load DriveCtrl params")?;
    let mut drive_ctrl =
        DriveCtrl::new(drive_ctrl_params).wrap_err("Failed to create DriveCtrl")?;
    drive_ctrl
        .init("drive_ctrl.csv", &session)
        .wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    let mut vision = if sim_params.vision.enabled {
        info!("Starting simulated vision");
        Some(VisionSource::spawn(
            sim_params.vision,
            drive_ctrl.vision_sender(),
        ))
    } else {
        None
    };

    let mut sim = SimDrive::new(sim_params).wrap_err("Failed to create the simulation")?;
    info!("Simulation init complete");

    let mut ds = DataStore::new(drive_ctrl);

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut prev_time_s: Option<f64> = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start(cycle_frequency_hz, session::get_elapsed_seconds());

        let dt_s = match prev_time_s {
            Some(p) if ds.time_s > p => ds.time_s - p,
            _ => exec_params.cycle_period_s,
        };
        prev_time_s = Some(ds.time_s);

        // ---- COMMAND PROCESSING ----

        match script.get_pending(ds.time_s) {
            PendingCmds::None => (),
            PendingCmds::Some(cmds) => {
                for cmd in cmds.iter() {
                    cmd_processor::exec(&mut ds, &mut sim, cmd);
                }
            }
            // Exit if end of script reached
            PendingCmds::EndOfScript => {
                info!("End of command script reached, stopping");
                break;
            }
        }

        // ---- DATA INPUT ----

        ds.drive_ctrl_input.sensors = sim.read_sensors(ds.time_s);

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ds.drive_ctrl.proc(&ds.drive_ctrl_input) {
            Ok((o, r)) => {
                ds.drive_ctrl_output = o;
                ds.drive_ctrl_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during DriveCtrl processing: {}", e);
                ds.drive_ctrl_output.demands = [ModuleDemand::default(); NUM_MODULES];
            }
        };

        for calib_log in ds.drive_ctrl_output.calibration_logs.drain(..) {
            let path = format!(
                "calib/{}_{:?}.json",
                calib_log.module.name(),
                calib_log.motor
            );
            info!(
                "Saving {} samples of calibration data to {}",
                calib_log.samples.len(),
                path
            );
            session::save_with_timestamp(path, calib_log);
        }

        // ---- ACTUATION ----

        sim.write_demands(&ds.drive_ctrl_output.demands, dt_s);

        if let Some(ref mut v) = vision {
            v.observe(ds.time_s, sim.true_pose());
        }

        // ---- STATUS ----

        ds.resolve_status();

        if ds.is_1_hz_cycle {
            let pose = ds.drive_ctrl_output.pose;
            let truth = sim.true_pose();
            info!(
                "Pose ({:.3}, {:.3}, {:.3}), true ({:.3}, {:.3}, {:.3}), {:.1} A, bus {:.2} V",
                pose.position_m_fm[0],
                pose.position_m_fm[1],
                pose.heading_rad,
                truth.position_m_fm[0],
                truth.position_m_fm[1],
                truth.heading_rad,
                ds.drive_ctrl_status_rpt.total_current_a,
                sim.bus_voltage_v()
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;
        let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;

                // If number of overruns greater than the limit make safe
                if exec_params.max_consec_cycle_overruns > 0
                    && ds.num_consec_cycle_overruns > exec_params.max_consec_cycle_overruns
                {
                    ds.make_safe(SafeModeCause::CycleOverrunLimit);
                }
            }
        }

        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    if let Some(v) = vision {
        v.stop();
    }

    info!("End of execution after {} cycles", ds.num_cycles);

    session.save("final_status.json", ds.drive_ctrl_status_rpt);

    session.exit();

    Ok(())
}
