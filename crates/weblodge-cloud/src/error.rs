//! Cloud error types

use thiserror::Error;

/// Errors raised while reconciling remote resources
#[derive(Error, Debug)]
pub enum CloudError {
    /// A control-plane command kept failing after the retry budget was spent
    #[error("Control plane command `{command}` failed after {attempts} attempt(s): {message}")]
    ControlPlane {
        command: String,
        attempts: u32,
        message: String,
    },

    /// The control plane definitively reported that the resource does not exist
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Loading failed for a reason other than absence; the resource may exist
    #[error("Cannot load {kind} '{name}': {reason}")]
    CanLoadResource {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// The tier catalog itself is unavailable
    #[error("Unable to retrieve the list of tiers: {0}")]
    InvalidSku(String),

    #[error("Can not find any tier for the location '{0}'")]
    InvalidLocation(String),

    #[error("Can not find the tier '{tier}' in the location '{location}'")]
    InvalidTier { tier: String, location: String },

    /// Only one free compute plan is permitted per location
    #[error("A free application already exists in this location: '{0}'")]
    NoMoreFreeApplicationAvailable(String),

    #[error("Can not move '{name}' from '{current}' to '{requested}'")]
    CanNotChangeLocation {
        name: String,
        current: String,
        requested: String,
    },

    #[error("No tier set on compute plan '{0}'")]
    SkuNotSet(String),

    /// The resource exists but does not carry the ownership tags
    #[error("Resource '{0}' is not managed by WebLodge")]
    NotOwned(String),

    #[error("Attribute '{attribute}' missing on {kind} '{name}'")]
    MissingAttribute {
        kind: &'static str,
        name: String,
        attribute: String,
    },

    #[error("Unexpected control plane output: {0}")]
    UnexpectedOutput(String),

    #[error("Control plane CLI is not installed: {0}")]
    NotInstalled(String),

    #[error("Invalid log level '{value}', expected one of: {allowed}")]
    InvalidLogLevel { value: String, allowed: String },

    #[error("Invalid environment file '{path}': {reason}")]
    InvalidEnvironmentFile { path: String, reason: String },

    /// Infrastructure may exist without an application
    #[error("Deployment of '{subdomain}' stopped with partially created infrastructure: {source}")]
    PartiallyProvisioned {
        subdomain: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// True when the error is a definitive "does not exist" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ResourceNotFound(_))
    }

    /// True for business-rule and input errors, raised before any remote mutation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CloudError::InvalidSku(_)
                | CloudError::InvalidLocation(_)
                | CloudError::InvalidTier { .. }
                | CloudError::NoMoreFreeApplicationAvailable(_)
                | CloudError::CanNotChangeLocation { .. }
                | CloudError::InvalidLogLevel { .. }
                | CloudError::InvalidEnvironmentFile { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
