use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid state file '{path}': {source}")]
    InvalidStateFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing parameter '--{0}'")]
    MissingParameter(String),

    #[error("Invalid value '{value}' for '--{name}', expected one of: {}", allowed.join(", "))]
    InvalidParameter {
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
