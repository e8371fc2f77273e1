//! Command parameters
//!
//! A parameter value comes from the command line first, then from the state
//! file, then from its default.

use crate::error::{ConfigError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// File name of the application package inside `dist`
pub const PACKAGE_NAME: &str = "azwebapp.zip";

const SUBDOMAIN_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Fixed(&'static str),
    /// A new random subdomain
    RandomSubdomain,
    Required,
}

/// Definition of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub description: &'static str,
    pub default: DefaultValue,
    /// Accepted values; empty accepts anything
    pub allowed: &'static [&'static str],
}

impl Parameter {
    const fn new(name: &'static str, description: &'static str, default: DefaultValue) -> Self {
        Self {
            name,
            description,
            default,
            allowed: &[],
        }
    }

    /// Name on the command line, `env_file` becomes `env-file`
    pub fn flag(&self) -> String {
        self.name.replace('_', "-")
    }

    fn validate(&self, value: &str) -> Result<()> {
        if self.allowed.is_empty() || self.allowed.contains(&value) {
            return Ok(());
        }
        Err(ConfigError::InvalidParameter {
            name: self.flag(),
            value: value.to_string(),
            allowed: self.allowed.iter().map(|v| v.to_string()).collect(),
        })
    }

    fn default_value(&self) -> Result<String> {
        match self.default {
            DefaultValue::Fixed(value) => Ok(value.to_string()),
            DefaultValue::RandomSubdomain => Ok(random_subdomain()),
            DefaultValue::Required => Err(ConfigError::MissingParameter(self.flag())),
        }
    }
}

pub const SUBDOMAIN: Parameter = Parameter::new(
    "subdomain",
    "Unique subdomain of the application within Azure, random if not provided",
    DefaultValue::RandomSubdomain,
);
pub const TIER: Parameter = Parameter::new(
    "tier",
    "The application computational power",
    DefaultValue::Fixed("F1"),
);
pub const LOCATION: Parameter = Parameter::new(
    "location",
    "The physical application location",
    DefaultValue::Fixed("northeurope"),
);
pub const ENVIRONMENT: Parameter = Parameter::new(
    "environment",
    "The environment of the application",
    DefaultValue::Fixed("production"),
);
pub const DIST: Parameter = Parameter::new(
    "dist",
    "Folder containing the zipped application",
    DefaultValue::Fixed("dist"),
);
pub const ENV_FILE: Parameter = Parameter::new(
    "env_file",
    "File containing the environment variables",
    DefaultValue::Fixed(".env"),
);
pub const LOG_LEVEL: Parameter = Parameter {
    allowed: &["error", "info", "verbose", "warning"],
    ..Parameter::new(
        "log_level",
        "The log level of the application infrastructure",
        DefaultValue::Fixed("error"),
    )
};
pub const BRANCH: Parameter = Parameter::new(
    "branch",
    "The deployment branch",
    DefaultValue::Fixed("main"),
);
pub const USERNAME: Parameter =
    Parameter::new("username", "The GitHub username", DefaultValue::Required);
pub const REPOSITORY: Parameter =
    Parameter::new("repository", "The GitHub repository", DefaultValue::Required);

/// Parameters of `deploy`
pub const DEPLOY: &[Parameter] = &[
    SUBDOMAIN,
    TIER,
    LOCATION,
    ENVIRONMENT,
    DIST,
    ENV_FILE,
    LOG_LEVEL,
];

/// Parameters of `github`
pub const GITHUB: &[Parameter] = &[
    SUBDOMAIN,
    TIER,
    LOCATION,
    ENVIRONMENT,
    DIST,
    ENV_FILE,
    LOG_LEVEL,
    BRANCH,
    USERNAME,
    REPOSITORY,
];

/// Parameters of the commands addressing an existing deployment, which
/// never invent a subdomain
pub const TARGET: &[Parameter] = &[Parameter {
    default: DefaultValue::Required,
    ..SUBDOMAIN
}];

/// Parameters of `tiers`
pub const CATALOG: &[Parameter] = &[LOCATION];

/// Twenty random lower-case ASCII letters
pub fn random_subdomain() -> String {
    let mut rng = rand::thread_rng();
    (0..SUBDOMAIN_LENGTH)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

/// Flat string map of parameter values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set `name` only when a value is given
    pub fn with_opt(mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ConfigError::MissingParameter(name.replace('_', "-")))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve every parameter of `definitions`: command line, then state,
    /// then default. Stored keys outside `definitions` are kept.
    pub fn resolve(definitions: &[Parameter], flags: &Parameters, state: &Parameters) -> Result<Self> {
        let mut resolved = state.clone();
        for definition in definitions {
            let value = match flags.get(definition.name).or(state.get(definition.name)) {
                Some(value) => value.to_string(),
                None => definition.default_value()?,
            };
            definition.validate(&value)?;
            resolved.set(definition.name, value);
        }
        Ok(resolved)
    }

    /// Zip package to upload
    pub fn artifact(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.require(DIST.name)?).join(PACKAGE_NAME))
    }
}
