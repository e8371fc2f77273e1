//! Azure App Service provider for WebLodge
//!
//! Deploys a web application on Azure App Service through the `az` CLI.
//!
//! # Resources
//!
//! One deployment is one resource group named after the subdomain, holding:
//!
//! - an App Service plan (the billed tier)
//! - a Key Vault with the application secrets
//! - the web application, with a system-assigned identity allowed to read
//!   the vault
//!
//! # Requirements
//!
//! - `az` CLI must be installed; the first command triggers `az login` if
//!   the session is missing
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use weblodge_cloud::ControlPlaneClient;
//! use weblodge_cloud_azure::{AzCli, Deployer, PriceCatalog};
//!
//! let client = ControlPlaneClient::new(Arc::new(AzCli::new()));
//! let deployer = Deployer::new(&client, Arc::new(PriceCatalog::new()?));
//!
//! let deployment = deployer.ensure_deployed(&request).await?;
//! println!("{}", deployment.application.url().await?);
//! ```

pub mod az;
pub mod catalog;
pub mod deployment;
pub mod federation;
pub mod key_vault;
pub mod log_level;
pub mod plan;
pub mod principal;
pub mod resource_group;
pub mod web_app;

pub use az::AzCli;
pub use catalog::{PRICE_API_URL, PriceCatalog, StaticCatalog, Tier, TierCatalog, resolve_tier};
pub use deployment::{
    DeployedApplication, Deployer, Deployment, DeploymentRequest, read_env_file,
};
pub use federation::{
    FederatedCredential, FederationProvisioner, GITHUB_ISSUER, GitHubRepository,
    IdentityFederationApplication, TOKEN_EXCHANGE_AUDIENCE, application_display_name,
};
pub use key_vault::{Secret, SecretStore};
pub use log_level::LogLevel;
pub use plan::{ComputePlan, FREE_SKU};
pub use principal::{Account, Principal, PrincipalType};
pub use resource_group::ResourceGroup;
pub use web_app::HostedApplication;
