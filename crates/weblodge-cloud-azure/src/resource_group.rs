//! Resource group

use async_trait::async_trait;
use weblodge_cloud::{
    CommandLine, ControlPlaneClient, Listable, RemoteDescriptor, RemoteState, Resource, Result,
    Tags,
};

/// Container of every resource of one deployment
#[derive(Debug)]
pub struct ResourceGroup {
    name: String,
    client: ControlPlaneClient,
    remote: RemoteState,
}

impl ResourceGroup {
    pub fn new(client: &ControlPlaneClient, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: client.clone(),
            remote: RemoteState::new(),
        }
    }

    /// Create the group if it does not exist yet.
    ///
    /// Returns `true` when a creation command was issued.
    pub async fn create(&self, location: &str, tags: &Tags) -> Result<bool> {
        if self.exists().await {
            tracing::debug!("Resource group '{}' already exists", self.name);
            return Ok(false);
        }

        let cmd = CommandLine::new("group")
            .action("create")
            .flag("--name", &self.name)
            .flag("--location", location)
            .tags(tags);
        let value = self.client.invoke_json(&cmd).await?;
        self.remote
            .replace(RemoteDescriptor::from_output(Self::KIND, &self.name, value)?);
        Ok(true)
    }

    /// Overlay `tags` on the current tag set
    pub async fn update_tags(&self, tags: &Tags) -> Result<()> {
        let merged = self.tags().await?.merged(tags);
        let cmd = CommandLine::new("group")
            .action("update")
            .flag("--name", &self.name)
            .tags(&merged);
        let value = self.client.invoke_json(&cmd).await?;
        self.remote
            .replace(RemoteDescriptor::from_output(Self::KIND, &self.name, value)?);
        Ok(())
    }

    /// Delete the group and everything it contains
    pub async fn delete(&self) -> Result<()> {
        let cmd = CommandLine::new("group")
            .action("delete")
            .flag("--name", &self.name)
            .arg("--yes");
        self.client.invoke_raw(&cmd).await?;
        self.remote.mark_deleted();
        Ok(())
    }
}

impl PartialEq for ResourceGroup {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[async_trait]
impl Resource for ResourceGroup {
    const KIND: &'static str = "resource group";

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
        let cmd = CommandLine::new("group")
            .action("show")
            .flag("--name", &self.name);
        let value = self.client.invoke_json(&cmd).await?;
        RemoteDescriptor::from_output(Self::KIND, &self.name, value)
    }
}

#[async_trait]
impl Listable for ResourceGroup {
    async fn list(client: &ControlPlaneClient) -> Result<Vec<RemoteDescriptor>> {
        RemoteDescriptor::many(
            client
                .invoke_json(&CommandLine::new("group").action("list"))
                .await?,
        )
    }

    fn from_remote(client: &ControlPlaneClient, descriptor: RemoteDescriptor) -> Option<Self> {
        Some(Self {
            name: descriptor.name()?.to_string(),
            client: client.clone(),
            remote: RemoteState::loaded(descriptor),
        })
    }
}
