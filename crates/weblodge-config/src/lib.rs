//! WebLodge parameters and their on-disk state

pub mod error;
pub mod parameters;
pub mod state;

pub use error::*;
pub use parameters::{DefaultValue, PACKAGE_NAME, Parameter, Parameters, random_subdomain};
pub use state::{DEFAULT_STATE_FILE, StateFile};

use std::path::PathBuf;

/// Locate the state file: an explicit path, `WEBLODGE_CONFIG_FILE`, or
/// `.weblodge.json` in the current directory
pub fn find_state_file(explicit: Option<PathBuf>) -> Result<StateFile> {
    if let Some(path) = explicit {
        return Ok(StateFile::new(path));
    }

    if let Ok(path) = std::env::var("WEBLODGE_CONFIG_FILE") {
        if !path.is_empty() {
            return Ok(StateFile::new(path));
        }
    }

    Ok(StateFile::new(std::env::current_dir()?.join(DEFAULT_STATE_FILE)))
}
