//! Hosted web application

use crate::key_vault::{Secret, SecretStore};
use crate::log_level::LogLevel;
use crate::plan::ComputePlan;
use crate::principal::Principal;
use crate::resource_group::ResourceGroup;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use weblodge_cloud::{
    CloudError, CommandLine, ControlPlaneClient, Listable, RemoteDescriptor, RemoteState,
    Resource, Result, Tags, normalize_location,
};

const RUNTIME: &str = "PYTHON:3.10";
const STARTUP_FILE: &str = "weblodge.startup";

/// A web application; its name is also its public subdomain
#[derive(Debug)]
pub struct HostedApplication {
    name: String,
    resource_group: String,
    client: ControlPlaneClient,
    remote: RemoteState,
}

impl HostedApplication {
    pub fn new(
        client: &ControlPlaneClient,
        name: impl Into<String>,
        resource_group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            client: client.clone(),
            remote: RemoteState::new(),
        }
    }

    /// Every resource of a deployment is named after its subdomain
    pub fn for_subdomain(client: &ControlPlaneClient, subdomain: &str) -> Self {
        Self::new(client, subdomain, subdomain)
    }

    pub fn resource_group(&self) -> ResourceGroup {
        ResourceGroup::new(&self.client, &self.resource_group)
    }

    pub fn secret_store(&self) -> SecretStore {
        SecretStore::for_subdomain(&self.client, &self.name)
    }

    /// Compute plan the application runs on
    pub async fn plan(&self) -> Result<ComputePlan> {
        let descriptor = self.descriptor().await?;
        let plan_id = descriptor
            .str_at("/appServicePlanId")
            .or_else(|| descriptor.str_at("/serverFarmId"))
            .ok_or_else(|| self.missing("appServicePlanId"))?;
        let plan_name = plan_id.rsplit('/').next().unwrap_or(plan_id);
        Ok(ComputePlan::new(&self.client, plan_name, &self.resource_group))
    }

    /// Create the application on `plan` and apply its platform settings
    pub async fn create(&self, plan: &ComputePlan, tags: &Tags) -> Result<()> {
        let cmd = CommandLine::new("webapp")
            .action("create")
            .flag("--resource-group", &self.resource_group)
            .flag("--plan", plan.id().await?)
            .flag("--name", &self.name)
            .flag("--runtime", RUNTIME)
            .tags(tags);
        let value = self.client.invoke_json(&cmd).await?;
        self.remote
            .replace(RemoteDescriptor::from_output(Self::KIND, &self.name, value)?);

        let cmd = self
            .config_set()
            .flag("--web-sockets-enabled", "true")
            .flag("--http20-enabled", "true")
            .flag("--startup-file", STARTUP_FILE)
            .flag("--always-on", plan.always_on_supported().await?.to_string());
        self.client.invoke_json(&cmd).await?;
        Ok(())
    }

    pub async fn set_always_on(&self, enabled: bool) -> Result<()> {
        let cmd = self.config_set().flag("--always-on", enabled.to_string());
        self.client.invoke_json(&cmd).await?;
        Ok(())
    }

    /// Public host name
    pub async fn domain(&self) -> Result<String> {
        let descriptor = self.descriptor().await?;
        descriptor
            .str_at("/defaultHostName")
            .or_else(|| descriptor.str_at("/hostNames/0"))
            .map(str::to_string)
            .ok_or_else(|| self.missing("defaultHostName"))
    }

    pub async fn url(&self) -> Result<String> {
        Ok(format!("https://{}", self.domain().await?))
    }

    /// Fail when `location` differs from where the application lives
    pub async fn ensure_location(&self, location: &str) -> Result<()> {
        let current = self.location().await?;
        if normalize_location(&current) != normalize_location(location) {
            return Err(CloudError::CanNotChangeLocation {
                name: self.name.clone(),
                current,
                requested: location.to_string(),
            });
        }
        Ok(())
    }

    /// Enable the system-assigned identity and return it
    pub async fn assign_identity(&self) -> Result<Principal> {
        let cmd = CommandLine::new("webapp identity")
            .action("assign")
            .flag("--resource-group", &self.resource_group)
            .flag("--name", &self.name);
        let identity = self.client.invoke_json(&cmd).await?;
        let principal_id = identity
            .get("principalId")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("identity.principalId"))?
            .to_string();

        let mut extra = Map::new();
        extra.insert("identity".to_string(), identity);
        self.remote.extend(RemoteDescriptor::new(extra));

        Ok(Principal::service_principal(principal_id))
    }

    /// System-assigned identity, enabled when missing
    pub async fn identity(&self) -> Result<Principal> {
        let descriptor = self.descriptor().await?;
        match descriptor.str_at("/identity/principalId") {
            Some(principal_id) => Ok(Principal::service_principal(principal_id)),
            None => self.assign_identity().await,
        }
    }

    pub async fn set_log_level(&self, level: LogLevel) -> Result<()> {
        let cmd = CommandLine::new("webapp log")
            .action("config")
            .flag("--resource-group", &self.resource_group)
            .flag("--name", &self.name)
            .flag("--application-logging", "filesystem")
            .flag("--level", level.as_azure());
        self.client.invoke_json(&cmd).await?;
        Ok(())
    }

    /// Point application settings at vault secrets
    pub async fn bind_secrets(&self, secrets: &[Secret]) -> Result<()> {
        if secrets.is_empty() {
            return Ok(());
        }
        let cmd = CommandLine::new("webapp config appsettings")
            .action("set")
            .flag("--resource-group", &self.resource_group)
            .flag("--name", &self.name)
            .pairs(
                "--settings",
                secrets.iter().map(|s| (s.setting.as_str(), s.reference())),
            );
        self.client.invoke_json(&cmd).await?;
        Ok(())
    }

    /// Upload a zip package
    pub async fn upload(&self, artifact: &Path) -> Result<()> {
        let cmd = CommandLine::new("webapp deployment source")
            .action("config-zip")
            .flag("--resource-group", &self.resource_group)
            .flag("--name", &self.name)
            .flag("--src", artifact.display().to_string());
        self.client.invoke_raw(&cmd).await?;
        Ok(())
    }

    /// Tail the application logs until interrupted
    pub async fn stream_logs(&self) -> Result<()> {
        let cmd = CommandLine::new("webapp log")
            .action("tail")
            .flag("--resource-group", &self.resource_group)
            .flag("--name", &self.name);
        self.client.stream(&cmd).await
    }

    fn config_set(&self) -> CommandLine {
        CommandLine::new("webapp config")
            .action("set")
            .flag("--resource-group", &self.resource_group)
            .flag("--name", &self.name)
    }
}

impl PartialEq for HostedApplication {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[async_trait]
impl Resource for HostedApplication {
    const KIND: &'static str = "application";

    fn name(&self) -> &str {
        &self.name
    }

    fn remote(&self) -> &RemoteState {
        &self.remote
    }

    fn client(&self) -> &ControlPlaneClient {
        &self.client
    }

    async fn fetch(&self) -> Result<RemoteDescriptor> {
        let cmd = CommandLine::new("webapp")
            .action("show")
            .flag("--resource-group", &self.resource_group)
            .flag("--name", &self.name);
        let value = self.client.invoke_json(&cmd).await?;
        RemoteDescriptor::from_output(Self::KIND, &self.name, value)
    }
}

#[async_trait]
impl Listable for HostedApplication {
    async fn list(client: &ControlPlaneClient) -> Result<Vec<RemoteDescriptor>> {
        RemoteDescriptor::many(
            client
                .invoke_json(&CommandLine::new("webapp").action("list"))
                .await?,
        )
    }

    fn from_remote(client: &ControlPlaneClient, descriptor: RemoteDescriptor) -> Option<Self> {
        Some(Self {
            name: descriptor.name()?.to_string(),
            resource_group: descriptor.str_at("/resourceGroup")?.to_string(),
            client: client.clone(),
            remote: RemoteState::loaded(descriptor),
        })
    }
}
