//! # Script interpreter
//!
//! Scripts drive an executable without an operator. Each entry is a time in
//! seconds since the start of the run followed by a JSON command and a
//! semicolon:
//!
//! ```text
//! 0.5: {"Drive": {"type": "ZeroHeading"}};
//! 1.0: {"Drive": {"type": "Teleop", "x": 0.0, "y": 0.6, "rot": 0.0, "slow": false}};
//! ```
//!
//! Lines which don't match (comments, blank lines) are ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use regex::{Regex, RegexBuilder};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct Entry<T> {
    exec_time_s: f64,
    cmd: T,
}

/// A script interpreter.
///
/// After loading a script call [`ScriptInterpreter::get_pending`] each cycle
/// to get the commands which are due.
pub struct ScriptInterpreter<T> {
    script_path: PathBuf,
    cmds: VecDeque<Entry<T>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script contains an invalid timestamp: {0}. Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, serde_json::Error),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    OutOfOrder(f64, f64),
}

/// Result of polling the script.
#[derive(Debug, PartialEq)]
pub enum PendingCmds<T> {
    None,
    Some(Vec<T>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> ScriptInterpreter<T>
where
    T: DeserializeOwned,
{
    /// Load a script from the given path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::parse(&script)?;
        interp.script_path = path;
        Ok(interp)
    }

    /// Parse a script held in memory.
    pub fn parse(script: &str) -> Result<Self, ScriptError> {
        let mut cmds = VecDeque::new();

        for cap in entry_regex().captures_iter(script) {
            let time_str = cap.get(1).map_or("", |m| m.as_str());
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|_| ScriptError::InvalidTimestamp(time_str.to_string()))?;

            let payload = cap.get(3).map_or("", |m| m.as_str());
            let cmd = serde_json::from_str(payload)
                .map_err(|e| ScriptError::InvalidCmd(exec_time_s, e))?;

            if let Some(last) = cmds.back() {
                let last: &Entry<T> = last;
                if exec_time_s < last.exec_time_s {
                    return Err(ScriptError::OutOfOrder(last.exec_time_s, exec_time_s));
                }
            }

            cmds.push_back(Entry { exec_time_s, cmd });
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            script_path: PathBuf::new(),
            cmds,
        })
    }
}

impl<T> ScriptInterpreter<T> {
    /// Return the commands due at or before `current_time_s`.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingCmds<T> {
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript;
        }

        let mut due = vec![];

        while let Some(front) = self.cmds.front() {
            if front.exec_time_s > current_time_s {
                break;
            }
            if let Some(entry) = self.cmds.pop_front() {
                due.push(entry.cmd);
            }
        }

        if due.is_empty() {
            PendingCmds::None
        } else {
            PendingCmds::Some(due)
        }
    }

    /// Get the number of commands left in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the time of the last command in the script
    pub fn get_duration(&self) -> f64 {
        self.cmds.back().map_or(0.0, |c| c.exec_time_s)
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn entry_regex() -> Regex {
    // The pattern is a literal so building it cannot fail
    match RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
        .multi_line(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => unreachable!("invalid script regex: {}", e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(tag = "type")]
    enum Cmd {
        Stop,
        Drive { speed: f64 },
    }

    const SCRIPT: &str = "\
        # warm up\n\
        0.0: {\"type\": \"Stop\"};\n\
        0.5: {\"type\": \"Drive\", \"speed\": 1.5};\n\
        0.5: {\"type\": \"Stop\"};\n\
        2.0: {\"type\": \"Stop\"};\n";

    #[test]
    fn test_pending() {
        let mut si: ScriptInterpreter<Cmd> = ScriptInterpreter::parse(SCRIPT).unwrap();
        assert_eq!(si.get_num_cmds(), 4);
        assert_eq!(si.get_duration(), 2.0);

        assert_eq!(si.get_pending(0.0), PendingCmds::Some(vec![Cmd::Stop]));
        assert_eq!(si.get_pending(0.2), PendingCmds::None);
        assert_eq!(
            si.get_pending(0.6),
            PendingCmds::Some(vec![Cmd::Drive { speed: 1.5 }, Cmd::Stop])
        );
        assert_eq!(si.get_pending(5.0), PendingCmds::Some(vec![Cmd::Stop]));
        assert_eq!(si.get_pending(5.0), PendingCmds::EndOfScript);
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::<Cmd>::parse("# nothing here\n"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::<Cmd>::parse("1.0: {\"type\": \"Fly\"};"),
            Err(ScriptError::InvalidCmd(t, _)) if t == 1.0
        ));
        assert!(matches!(
            ScriptInterpreter::<Cmd>::parse(
                "1.0: {\"type\": \"Stop\"};\n0.5: {\"type\": \"Stop\"};"
            ),
            Err(ScriptError::OutOfOrder(_, _))
        ));
    }
}
