//! Session management
//!
//! A session is one run of an executable. It owns a timestamped directory
//! under `$SWERVE_SW_ROOT/<sessions_dir>` holding the log file, CSV archives
//! and any JSON data saved during the run (for example calibration samples).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use erased_serde::Serialize;
use log::{info, warn};
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();
static SAVE_SENDER: OnceCell<Mutex<Sender<SaveMsg>>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string used for session and file timestamps.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How long the save thread blocks waiting for data before checking whether
/// it should exit.
const SAVE_POLL_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Information about the current session
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    save_sender: Sender<SaveMsg>,

    save_thread: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (SWERVE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, has a session already been \
         started? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time")]
    CannotGetEpoch,
}

enum SaveMsg {
    Data(PathBuf, Box<dyn Serialize + Send>),
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session.
    ///
    /// Creates `$SWERVE_SW_ROOT/{sessions_dir}/{exec_name}_{timestamp}` with an
    /// `arch` subdirectory, and starts the background save thread.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        let mut path = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;
        path.push(sessions_dir);
        path.push(format!("{}_{}", exec_name, timestamp));
        fs::create_dir_all(&path).map_err(SessionError::CannotCreateDir)?;

        let arch_path = path.join("arch");
        fs::create_dir_all(&arch_path).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = path.join(format!("{}.log", exec_name));

        let (tx, rx) = channel();

        // The epoch guard above means this is the only session, so the
        // global sender is always uninitialised here
        SAVE_SENDER.init_once(|| Mutex::new(tx.clone()));

        let session_root = path.clone();
        let save_thread = thread::spawn(move || save_thread(session_root, rx));

        Ok(Session {
            session_root: path,
            arch_root: arch_path,
            log_file_path,
            save_sender: tx,
            save_thread: Some(save_thread),
        })
    }

    /// Exit the session, waiting for the save thread to write any pending data.
    pub fn exit(mut self) {
        info!("Stopping save thread");

        if self.save_sender.send(SaveMsg::Stop).is_err() {
            warn!("Save thread already stopped");
        }

        if let Some(handle) = self.save_thread.take() {
            if handle.join().is_err() {
                warn!("Save thread panicked");
            }
        }

        info!("Save thread exited");
    }

    /// Save the given data to a session-relative path in the background.
    pub fn save<P: AsRef<Path>, T: Serialize + Send + 'static>(&self, path: P, data: T) {
        if let Err(e) = self
            .save_sender
            .send(SaveMsg::Data(path.as_ref().to_path_buf(), Box::new(data)))
        {
            warn!(
                "Could not send data to be saved to path {:?}: {}",
                path.as_ref(),
                e
            )
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Returns `NaN` if no session has been started.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(f64::NAN),
        None => f64::NAN,
    }
}

/// Get the session's epoch, if a session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

/// Save the given data into the session-relative path.
pub fn save<P: AsRef<Path>, T: Serialize + Send + 'static>(path: P, data: T) {
    match SAVE_SENDER.get() {
        Some(m) => match m.lock() {
            Ok(s) => {
                if let Err(e) = s.send(SaveMsg::Data(path.as_ref().to_path_buf(), Box::new(data)))
                {
                    warn!(
                        "Couldn't send data to save thread for file {:?}: {}",
                        path.as_ref(),
                        e
                    )
                }
            }
            Err(_) => warn!("Couldn't get lock on save sender"),
        },
        None => warn!("Cannot save data as session is not initialised yet"),
    }
}

/// Save the given data to the path, appending a timestamp before the path's
/// extension.
pub fn save_with_timestamp<P: AsRef<Path>, T: Serialize + Send + 'static>(path: P, data: T) {
    save(timestamped_path(path.as_ref(), Utc::now()), data);
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn timestamped_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let stem = path.file_stem().unwrap_or_else(|| OsStr::new(""));

    let mut file_name = stem.to_os_string();
    file_name.push("_");
    file_name.push(now.format(TIMESTAMP_FORMAT).to_string());

    if let Some(ext) = path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }

    path.with_file_name(file_name)
}

fn save_thread(session_root: PathBuf, receiver: Receiver<SaveMsg>) {
    loop {
        match receiver.recv_timeout(SAVE_POLL_PERIOD) {
            Ok(SaveMsg::Data(path, data)) => write_json(&session_root.join(path), &*data),
            Ok(SaveMsg::Stop) => {
                // Drain anything queued before the stop
                while let Ok(SaveMsg::Data(path, data)) = receiver.try_recv() {
                    write_json(&session_root.join(path), &*data);
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn write_json(full_path: &Path, data: &(dyn Serialize + Send)) {
    match full_path.extension().and_then(|s| s.to_str()) {
        Some("json") => (),
        ext => {
            warn!(
                "Unrecognised file path extension for {:?} (got {:?})",
                full_path, ext
            );
            return;
        }
    }

    if let Some(parent) = full_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Couldn't create parent directory for {:?}: {}", full_path, e);
            return;
        }
    }

    let file = match OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(full_path)
    {
        Ok(f) => f,
        Err(e) => {
            warn!("Couldn't create file {:?}: {}", full_path, e);
            return;
        }
    };

    if let Err(e) = serde_json::to_writer_pretty(&file, data) {
        warn!("Couldn't serialize data for file {:?}: {}", full_path, e);
    }
}
