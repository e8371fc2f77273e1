//! Application log levels

use std::fmt;
use std::str::FromStr;
use weblodge_cloud::CloudError;

/// Verbosity of the application logs kept by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Information,
    Verbose,
    #[default]
    Warning,
}

impl LogLevel {
    /// Value understood by `webapp log config --level`
    pub fn as_azure(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Information => "information",
            LogLevel::Verbose => "verbose",
            LogLevel::Warning => "warning",
        }
    }

    /// Accepted user-facing names
    pub fn variants() -> &'static [&'static str] {
        &["error", "info", "verbose", "warning"]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_azure())
    }
}

impl FromStr for LogLevel {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "info" | "information" => Ok(LogLevel::Information),
            "verbose" => Ok(LogLevel::Verbose),
            "warning" => Ok(LogLevel::Warning),
            other => Err(CloudError::InvalidLogLevel {
                value: other.to_string(),
                allowed: LogLevel::variants().join(", "),
            }),
        }
    }
}
