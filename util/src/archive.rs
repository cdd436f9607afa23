//! CSV archiving
//!
//! Each executable archives flat per-cycle records into CSV files in the
//! session's `arch` directory. Records must serialise to a flat row (no
//! nested structs or sequences), which is a restriction of the `csv` crate.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Writes records into a CSV archive file.
pub struct Archiver {
    writer: Writer<File>,
    num_records: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Cannot write a record to the archive: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archive at a path relative to the session's archive root.
    pub fn from_session<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::from_path(session.arch_root.join(path))
    }

    /// Create a new archive at the given path, truncating any existing file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = File::create(path).map_err(ArchiveError::CreateError)?;

        Ok(Self {
            writer: WriterBuilder::new().has_headers(true).from_writer(file),
            num_records: 0,
        })
    }

    /// Serialise a record into the archive.
    ///
    /// The header row is written from the field names of the first record.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(ArchiveError::WriteError)?;
        self.num_records += 1;
        Ok(())
    }

    /// Flush any buffered records to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        self.writer.flush().map_err(ArchiveError::FlushError)
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        vx_ms: f64,
        brownout: bool,
    }

    #[test]
    fn test_archive_rows() {
        let path = std::env::temp_dir().join(format!("archive_test_{}.csv", std::process::id()));

        let mut arch = Archiver::from_path(&path).unwrap();
        arch.serialise(Row {
            time_s: 0.0,
            vx_ms: 1.5,
            brownout: false,
        })
        .unwrap();
        arch.serialise(Row {
            time_s: 0.02,
            vx_ms: 1.25,
            brownout: true,
        })
        .unwrap();
        arch.flush().unwrap();
        assert_eq!(arch.num_records(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "time_s,vx_ms,brownout");
        assert_eq!(lines[1], "0.0,1.5,false");
        assert_eq!(lines[2], "0.02,1.25,true");

        std::fs::remove_file(&path).ok();
    }
}
