//! Parameter state file
//!
//! Parameters of the last successful command are kept in a flat JSON object
//! next to the project, so the next command reuses them without flags.

use crate::error::{ConfigError, Result};
use crate::parameters::Parameters;
use std::path::{Path, PathBuf};

pub const DEFAULT_STATE_FILE: &str = ".weblodge.json";

const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    path: PathBuf,
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_FILE)
    }
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the previous content, refreshed on every save
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Stored parameters; a missing file is an empty state
    pub fn load(&self) -> Result<Parameters> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state file at {}", self.path.display());
                return Ok(Parameters::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::InvalidStateFile {
            path: self.path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, parameters: &Parameters) -> Result<()> {
        if self.path.is_file() {
            std::fs::copy(&self.path, self.backup_path())?;
        }

        let mut content = serde_json::to_string_pretty(parameters).map_err(|source| {
            ConfigError::InvalidStateFile {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        content.push('\n');
        std::fs::write(&self.path, content)?;

        tracing::debug!("Saved {} parameter(s) to {}", parameters.len(), self.path.display());
        Ok(())
    }
}
