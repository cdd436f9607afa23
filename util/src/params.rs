//! Generic parameters functions
//!
//! Parameter files are TOML documents stored in `$SWERVE_SW_ROOT/params`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (SWERVE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parameter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file.
///
/// The file path is relative to the `$SWERVE_SW_ROOT/params` directory.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = crate::host::get_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    parse(&params_str)
}

/// Parse a parameter struct from a TOML string.
pub fn parse<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Gains {
        k_p: f64,
        k_i: f64,
    }

    #[test]
    fn test_parse() {
        let g: Gains = parse("k_p = 3.5\nk_i = 0.0\n").unwrap();
        assert_eq!(g.k_p, 3.5);
        assert_eq!(g.k_i, 0.0);

        assert!(matches!(
            parse::<Gains>("k_p = 3.5\n"),
            Err(LoadError::DeserialiseError(_))
        ));
    }
}
