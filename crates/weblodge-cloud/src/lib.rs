//! WebLodge cloud core
//!
//! Provider-neutral building blocks for reconciling remote resources through
//! a command-based control plane.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  WebLodge CLI                    │
//! │          (deploy / delete / logs / github)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │            weblodge-cloud-azure                  │
//! │   Deployer · resources · tier catalog · Entra    │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               weblodge-cloud                     │
//! │  ┌──────────────────┐  ┌──────────────────────┐ │
//! │  │ Resource/Listable│  │  ControlPlaneClient  │ │
//! │  │ RemoteDescriptor │  │  retry · login       │ │
//! │  └──────────────────┘  └──────────┬───────────┘ │
//! └───────────────────────────────────┼─────────────┘
//!                                     │ trait Transport
//!                             ┌───────▼───────┐
//!                             │    az CLI     │
//!                             └───────────────┘
//! ```

pub mod command;
pub mod control_plane;
pub mod error;
pub mod report;
pub mod resource;
pub mod tags;

// Re-exports
pub use command::CommandLine;
pub use control_plane::{
    ControlPlaneClient, Output, OutputFormat, RetryConfig, Transport, TransportError,
};
pub use error::{CloudError, Result};
pub use report::{Action, ActionType, DeploymentReport, DeploymentState, ReportSummary};
pub use resource::{
    Listable, OwnedResources, Remote, RemoteDescriptor, RemoteState, Resource, all,
    normalize_location,
};
pub use tags::Tags;
