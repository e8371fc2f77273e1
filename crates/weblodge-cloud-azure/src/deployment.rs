//! Deployment orchestrator
//!
//! Sequences the resources of one deployment strictly in dependency order:
//! resource group, compute plan, secret store, application. Every resource
//! is named after the subdomain and lives in one resource group, so deleting
//! the group deletes the deployment.

use crate::catalog::{Tier, TierCatalog, resolve_tier};
use crate::key_vault::{SecretStore, secret_name};
use crate::log_level::LogLevel;
use crate::plan::ComputePlan;
use crate::principal::{Principal, current_principal};
use crate::resource_group::ResourceGroup;
use crate::web_app::HostedApplication;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use weblodge_cloud::{
    ActionType, CloudError, ControlPlaneClient, DeploymentReport, DeploymentState, Resource,
    Result, Tags, all,
};

/// Wait for the platform to restart after application settings change
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_secs(60);

/// Desired state of a deployment
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub subdomain: String,
    pub tier: String,
    pub location: String,
    pub environment: Option<String>,
    /// Zip package to upload
    pub artifact: PathBuf,
    /// Optional `.env` file turned into secrets
    pub env_file: Option<PathBuf>,
    pub log_level: LogLevel,
}

/// Outcome of [`Deployer::ensure_deployed`]
#[derive(Debug)]
pub struct Deployment {
    pub application: HostedApplication,
    pub report: DeploymentReport,
}

/// An owned deployment found by [`Deployer::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedApplication {
    pub name: String,
    /// `None` when the infrastructure exists without an application
    pub url: Option<String>,
}

impl DeployedApplication {
    pub fn is_leftover(&self) -> bool {
        self.url.is_none()
    }
}

pub struct Deployer {
    client: ControlPlaneClient,
    catalog: Arc<dyn TierCatalog>,
    settle_interval: Duration,
    ownership: Tags,
}

impl Deployer {
    pub fn new(client: &ControlPlaneClient, catalog: Arc<dyn TierCatalog>) -> Self {
        Self {
            client: client.clone(),
            catalog,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            ownership: Tags::ownership(),
        }
    }

    pub fn with_settle_interval(mut self, settle_interval: Duration) -> Self {
        self.settle_interval = settle_interval;
        self
    }

    pub fn client(&self) -> &ControlPlaneClient {
        &self.client
    }

    pub fn application(&self, subdomain: &str) -> HostedApplication {
        HostedApplication::for_subdomain(&self.client, subdomain)
    }

    /// Tiers offered in `location`
    pub async fn tiers(&self, location: &str) -> Result<Vec<Tier>> {
        self.catalog.tiers(location).await
    }

    /// Bring the deployment of `request.subdomain` to the requested state
    /// and upload the artifact
    pub async fn ensure_deployed(&self, request: &DeploymentRequest) -> Result<Deployment> {
        let mut report = DeploymentReport::new(&request.subdomain);
        let app = self.application(&request.subdomain);
        let tags = Tags::webapp_group().with_environment(request.environment.as_deref());
        let environment = match request.env_file.as_deref().filter(|p| p.is_file()) {
            Some(path) => Some((path, read_env_file(path)?)),
            None => None,
        };

        if app.exists().await {
            report.transition(DeploymentState::Reconciling);
            self.reconcile(&app, request, &tags, &mut report).await?;
        } else {
            report.transition(DeploymentState::Provisioning);
            self.provision(&app, request, &tags, &mut report).await?;
        }

        app.set_log_level(request.log_level).await?;
        report.record(
            ActionType::Update,
            "log level",
            &request.subdomain,
            request.log_level.as_azure(),
        );

        if let Some((env_file, variables)) = &environment {
            self.apply_environment(&app, env_file, variables, &mut report)
                .await?;
        }

        app.upload(&request.artifact).await?;
        report.record(
            ActionType::Upload,
            "artifact",
            &request.subdomain,
            request.artifact.display().to_string(),
        );

        report.transition(DeploymentState::Deployed);
        tracing::info!("Deployment '{}': {}", request.subdomain, report.summary());
        Ok(Deployment {
            application: app,
            report,
        })
    }

    async fn provision(
        &self,
        app: &HostedApplication,
        request: &DeploymentRequest,
        tags: &Tags,
        report: &mut DeploymentReport,
    ) -> Result<()> {
        // Validation only; nothing exists remotely yet.
        let tier = self.resolve(&request.tier, &request.location).await?;
        if tier.is_free() {
            self.ensure_free_slot(&request.location).await?;
        }
        let officer = current_principal(&self.client).await?;
        let store = app.secret_store();

        if let Err(source) = self
            .create_infrastructure(app, &store, request, &tier, tags, &officer, report)
            .await
        {
            report.transition(DeploymentState::PartiallyProvisioned);
            return Err(CloudError::PartiallyProvisioned {
                subdomain: request.subdomain.clone(),
                source: Box::new(source),
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_infrastructure(
        &self,
        app: &HostedApplication,
        store: &SecretStore,
        request: &DeploymentRequest,
        tier: &Tier,
        tags: &Tags,
        officer: &Principal,
        report: &mut DeploymentReport,
    ) -> Result<()> {
        let subdomain = request.subdomain.as_str();
        let location = request.location.as_str();

        let group = app.resource_group();
        if group.create(location, tags).await? {
            report.record(ActionType::Create, ResourceGroup::KIND, subdomain, location);
        } else {
            report.record(ActionType::NoOp, ResourceGroup::KIND, subdomain, "already exists");
        }

        let plan = ComputePlan::new(&self.client, subdomain, group.name()).with_sku(&tier.name);
        plan.create(location, tags).await?;
        report.record(ActionType::Create, ComputePlan::KIND, subdomain, &tier.name);

        if store.exists().await {
            report.record(ActionType::NoOp, SecretStore::KIND, store.name(), "already exists");
        } else {
            store.create(location, tags).await?;
            report.record(ActionType::Create, SecretStore::KIND, store.name(), location);
        }
        store.grant_secret_officer(officer).await?;

        app.create(&plan, tags).await?;
        report.record(ActionType::Create, HostedApplication::KIND, subdomain, location);

        self.ensure_reader_access(app, store, report).await
    }

    /// Let the application identity resolve its secret references
    async fn ensure_reader_access(
        &self,
        app: &HostedApplication,
        store: &SecretStore,
        report: &mut DeploymentReport,
    ) -> Result<()> {
        let identity = app.identity().await?;
        if store.grant_secret_reader(&identity).await? {
            report.record(
                ActionType::Update,
                SecretStore::KIND,
                store.name(),
                "read access for the application identity",
            );
        } else {
            report.record(
                ActionType::NoOp,
                SecretStore::KIND,
                store.name(),
                "application identity already reads secrets",
            );
        }
        Ok(())
    }

    async fn reconcile(
        &self,
        app: &HostedApplication,
        request: &DeploymentRequest,
        tags: &Tags,
        report: &mut DeploymentReport,
    ) -> Result<()> {
        app.ensure_location(&request.location).await?;

        let mut plan = app.plan().await?;
        let current = plan.sku().await?;
        if current.eq_ignore_ascii_case(&request.tier) {
            report.record(ActionType::NoOp, ComputePlan::KIND, plan.name(), &current);
        } else {
            let tier = self.resolve(&request.tier, &request.location).await?;
            if tier.is_free() {
                self.ensure_free_slot(&request.location).await?;
                // Always-on must be off before moving to the free tier.
                app.set_always_on(false).await?;
                plan.update_sku(&tier.name).await?;
            } else {
                plan.update_sku(&tier.name).await?;
                app.set_always_on(true).await?;
            }
            report.record(
                ActionType::Update,
                ComputePlan::KIND,
                plan.name(),
                format!("{} -> {}", current, tier.name),
            );
        }

        let group = app.resource_group();
        group.update_tags(tags).await?;
        report.record(ActionType::Update, ResourceGroup::KIND, group.name(), "tags");

        self.ensure_reader_access(app, &app.secret_store(), report).await
    }

    async fn resolve(&self, tier: &str, location: &str) -> Result<Tier> {
        let tiers = self.catalog.tiers(location).await?;
        resolve_tier(&tiers, tier, location)
    }

    /// Fail when an owned free plan already exists in `location`
    async fn ensure_free_slot(&self, location: &str) -> Result<()> {
        match ComputePlan::find_free(&self.client, location, &self.ownership).await? {
            Some(existing) => {
                tracing::info!("Stopping the deployment, no infrastructure created");
                Err(CloudError::NoMoreFreeApplicationAvailable(
                    existing.name().to_string(),
                ))
            }
            None => Ok(()),
        }
    }

    /// Store every variable of `env_file` as a secret and bind the
    /// application settings to the secrets
    async fn apply_environment(
        &self,
        app: &HostedApplication,
        env_file: &Path,
        variables: &[(String, String)],
        report: &mut DeploymentReport,
    ) -> Result<()> {
        if variables.is_empty() {
            return Ok(());
        }

        let store = app.secret_store();
        let mut secrets = Vec::with_capacity(variables.len());
        for (key, value) in variables {
            secrets.push(store.set_secret(key, value).await?);
        }
        app.bind_secrets(&secrets).await?;
        report.record(
            ActionType::Update,
            "application settings",
            app.name(),
            format!("{} secret reference(s) from {}", secrets.len(), env_file.display()),
        );

        if !self.settle_interval.is_zero() {
            tracing::info!(
                "Waiting {:?} for the application to restart",
                self.settle_interval
            );
            tokio::time::sleep(self.settle_interval).await;
        }
        Ok(())
    }

    /// Delete the deployment of `subdomain`.
    ///
    /// Returns `false` when there is nothing to delete.
    pub async fn ensure_deleted(&self, subdomain: &str) -> Result<bool> {
        let group = ResourceGroup::new(&self.client, subdomain);
        match group.load().await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        }

        if !group.is_owned_by(&self.ownership).await? {
            return Err(CloudError::NotOwned(subdomain.to_string()));
        }

        group.delete().await?;
        tracing::info!("Deleted resource group '{}'", subdomain);

        let store = SecretStore::for_subdomain(&self.client, subdomain);
        if let Err(e) = store.purge().await {
            tracing::warn!("Could not purge secret store '{}': {}", store.name(), e);
        }
        Ok(true)
    }

    /// Every owned deployment, with leftovers reported
    pub async fn list(&self) -> Result<Vec<DeployedApplication>> {
        let mut deployments = Vec::new();
        for group in all::<ResourceGroup>(&self.client, &Tags::webapp_group()).await? {
            let app = self.application(group.name());
            let url = if app.exists().await {
                Some(app.url().await?)
            } else {
                None
            };
            deployments.push(DeployedApplication {
                name: group.name().to_string(),
                url,
            });
        }
        Ok(deployments)
    }

    /// Tail the logs of `subdomain` until interrupted
    pub async fn stream_logs(&self, subdomain: &str) -> Result<()> {
        let app = self.application(subdomain);
        app.load().await?;
        app.stream_logs().await
    }
}

/// Variables of a dotenv file, in file order.
///
/// Vault secret names ignore case and turn `_` into `-`, so two settings
/// sharing a secret name are refused.
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let invalid = |reason: String| CloudError::InvalidEnvironmentFile {
        path: path.display().to_string(),
        reason,
    };

    let variables: Vec<(String, String)> = dotenvy::from_path_iter(path)
        .map_err(|e| invalid(e.to_string()))?
        .map(|item| item.map_err(|e| invalid(e.to_string())))
        .collect::<Result<_>>()?;

    let mut secrets: HashMap<String, &str> = HashMap::new();
    for (setting, _) in &variables {
        let secret = secret_name(setting).to_ascii_lowercase();
        if let Some(previous) = secrets.insert(secret, setting) {
            return Err(invalid(format!(
                "'{}' and '{}' would share the secret '{}'",
                previous,
                setting,
                secret_name(setting)
            )));
        }
    }
    Ok(variables)
}
