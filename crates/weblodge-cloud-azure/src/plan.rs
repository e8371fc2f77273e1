//! App Service plan, the billable compute unit

use async_trait::async_trait;
use weblodge_cloud::{
    CloudError, CommandLine, ControlPlaneClient, Listable, RemoteDescriptor, RemoteState,
    Resource, Result, Tags, all, normalize_location,
};

/// Name of the free tier; one per location and subscription
pub const FREE_SKU: &str = "F1";

pub fn is_free_sku(sku: &str) -> bool {
    sku.eq_ignore_ascii_case(FREE_SKU)
}

#[derive(Debug)]
pub struct ComputePlan {
    name: String,
    resource_group: String,
    sku: Option<String>,
    client: ControlPlaneClient,
    remote: RemoteState,
}

impl ComputePlan {
    pub fn new(
        client: &ControlPlaneClient,
        name: impl Into<String>,
        resource_group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            sku: None,
            client: client.clone(),
            remote: RemoteState::new(),
        }
    }

    /// Desired tier used by [`ComputePlan::create`]
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Desired tier if set, otherwise the remote one
    pub async fn sku(&self) -> Result<String> {
        if let Some(sku) = &self.sku {
            return Ok(sku.clone());
        }
        self.descriptor()
            .await?
            .str_at("/sku/name")
            .map(str::to_string)
            .ok_or_else(|| CloudError::SkuNotSet(self.name.clone()))
    }

    pub async fn is_free(&self) -> Result<bool> {
        Ok(is_free_sku(&self.sku().await?))
    }

    pub async fn always_on_supported(&self) -> Result<bool> {
        Ok(!self.is_free().await?)
    }

    /// Create a Linux plan with the desired tier
    pub async fn create(&self, location: &str, tags: &Tags) -> Result<()> {
        let sku = self
            .sku
            .as_deref()
            .ok_or_else(|| CloudError::SkuNotSet(self.name.clone()))?;

        let cmd = CommandLine::new("appservice plan")
            .action("create")
            .flag("--name", &self.name)
            .flag("--resource-group", &self.resource_group)
            .flag("--location", location)
            .flag("--sku", sku)
            .arg("--is-linux")
            .tags(tags);
        let value = self.client.invoke_json(&cmd).await?;
        self.remote
            .replace(RemoteDescriptor::from_output(Self::KIND, &self.name, value)?);
        Ok(())
    }

    /// Move an existing plan to another tier
    pub async fn update_sku(&mut self, sku: &str) -> Result<()> {
        let cmd = CommandLine::new("appservice plan")
            .action("update")
            .flag("--name", &self.name)
            .flag("--resource-group", &self.resource_group)
            .flag("--sku", sku);
        let value = self.client.invoke_json(&cmd).await?;
        self.remote
            .replace(RemoteDescriptor::from_output(Self::KIND, &self.name, value)?);
        self.sku = Some(sku.to_string());
        Ok(())
    }

    /// The owned free plan in `location`, if any
    pub async fn find_free(
        client: &ControlPlaneClient,
        location: &str,
        ownership: &Tags,
    ) -> Result<Option<ComputePlan>> {
        let wanted = normalize_location(location);
        for plan in all::<ComputePlan>(client, ownership).await? {
            let descriptor = plan.descriptor().await?;
            let free = descriptor.str_at("/sku/name").is_some_and(is_free_sku);
            let here = descriptor
                .location()
                .is_some_and(|l| normalize_location(l) == wanted);
            if free && here {
                return Ok(Some(plan));
            }
        }
        Ok(None)
    }
}

impl PartialEq for ComputePlan {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[async_trait]
impl Resource for ComputePlan {
    const KIND: &'static str = "compute plan";

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
        let cmd = CommandLine::new("appservice plan")
            .action("show")
            .flag("--name", &self.name)
            .flag("--resource-group", &self.resource_group);
        let value = self.client.invoke_json(&cmd).await?;
        RemoteDescriptor::from_output(Self::KIND, &self.name, value)
    }
}

#[async_trait]
impl Listable for ComputePlan {
    async fn list(client: &ControlPlaneClient) -> Result<Vec<RemoteDescriptor>> {
        RemoteDescriptor::many(
            client
                .invoke_json(&CommandLine::new("appservice plan").action("list"))
                .await?,
        )
    }

    fn from_remote(client: &ControlPlaneClient, descriptor: RemoteDescriptor) -> Option<Self> {
        Some(Self {
            name: descriptor.name()?.to_string(),
            resource_group: descriptor.str_at("/resourceGroup")?.to_string(),
            sku: None,
            client: client.clone(),
            remote: RemoteState::loaded(descriptor),
        })
    }
}
