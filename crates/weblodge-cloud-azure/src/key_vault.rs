//! Key Vault holding application secrets

use crate::principal::Principal;
use async_trait::async_trait;
use weblodge_cloud::{
    CloudError, CommandLine, ControlPlaneClient, RemoteDescriptor, RemoteState, Resource, Result,
    Tags,
};

/// Vault names are global and limited to 24 characters
const MAX_VAULT_NAME: usize = 24;

const SECRETS_OFFICER_ROLE: &str = "Key Vault Secrets Officer";
const SECRETS_USER_ROLE: &str = "Key Vault Secrets User";

/// A secret written to the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    /// Application setting the secret is bound to
    pub setting: String,

    /// Name inside the vault
    pub name: String,

    /// Versioned secret URI
    pub uri: String,
}

impl Secret {
    /// Setting value resolved by the platform at runtime
    pub fn reference(&self) -> String {
        format!("@Microsoft.KeyVault(SecretUri={})", self.uri)
    }
}

/// Vault secret names only allow alphanumerics and dashes
pub fn secret_name(setting: &str) -> String {
    setting
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Deterministic vault name of a subdomain
pub fn vault_name(subdomain: &str) -> String {
    let cleaned: String = subdomain
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let mut name = format!("kv-{}", cleaned);
    name.truncate(MAX_VAULT_NAME);
    name.trim_end_matches('-').to_string()
}

#[derive(Debug)]
pub struct SecretStore {
    name: String,
    resource_group: String,
    client: ControlPlaneClient,
    remote: RemoteState,
}

impl SecretStore {
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

    pub fn for_subdomain(client: &ControlPlaneClient, subdomain: &str) -> Self {
        Self::new(client, vault_name(subdomain), subdomain)
    }

    /// Create an RBAC-authorized vault
    pub async fn create(&self, location: &str, tags: &Tags) -> Result<()> {
        let cmd = CommandLine::new("keyvault")
            .action("create")
            .flag("--location", location)
            .flag("--name", &self.name)
            .flag("--resource-group", &self.resource_group)
            .flag("--enable-rbac-authorization", "true")
            .flag("--retention-days", "7")
            .tags(tags);
        let value = self.client.invoke_json(&cmd).await?;
        self.remote
            .replace(RemoteDescriptor::from_output(Self::KIND, &self.name, value)?);
        Ok(())
    }

    /// Allow `principal` to manage secrets; `false` when already allowed
    pub async fn grant_secret_officer(&self, principal: &Principal) -> Result<bool> {
        self.grant(SECRETS_OFFICER_ROLE, principal).await
    }

    /// Allow `principal` to read secrets; `false` when already allowed
    pub async fn grant_secret_reader(&self, principal: &Principal) -> Result<bool> {
        self.grant(SECRETS_USER_ROLE, principal).await
    }

    async fn grant(&self, role: &str, principal: &Principal) -> Result<bool> {
        let scope = self.id().await?;
        let cmd = CommandLine::new("role assignment")
            .action("list")
            .flag("--scope", &scope)
            .flag("--assignee", &principal.object_id)
            .flag("--role", role);
        let assignments = self.client.invoke_json(&cmd).await?;
        if assignments.as_array().is_some_and(|a| !a.is_empty()) {
            tracing::debug!("'{}' already holds '{}' on '{}'", principal.object_id, role, self.name);
            return Ok(false);
        }

        let cmd = CommandLine::new("role assignment")
            .action("create")
            .flag("--role", role)
            .flag("--assignee-object-id", &principal.object_id)
            .flag(
                "--assignee-principal-type",
                principal.principal_type.as_azure(),
            )
            .flag("--scope", scope);
        self.client.invoke_json(&cmd).await?;
        Ok(true)
    }

    /// Write (or overwrite) the secret bound to `setting`
    pub async fn set_secret(&self, setting: &str, value: &str) -> Result<Secret> {
        let name = secret_name(setting);
        let cmd = CommandLine::new("keyvault secret")
            .action("set")
            .flag("--vault-name", &self.name)
            .flag("--name", &name)
            .secret_flag("--value", value);
        let output = self.client.invoke_json(&cmd).await?;
        let uri = output
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CloudError::MissingAttribute {
                kind: "secret",
                name: name.clone(),
                attribute: "id".to_string(),
            })?;

        Ok(Secret {
            setting: setting.to_string(),
            name,
            uri: uri.to_string(),
        })
    }

    /// Remove the soft-deleted vault so its name can be reused
    pub async fn purge(&self) -> Result<()> {
        let cmd = CommandLine::new("keyvault")
            .action("purge")
            .flag("--name", &self.name);
        self.client.invoke_raw(&cmd).await?;
        self.remote.mark_deleted();
        Ok(())
    }
}

impl PartialEq for SecretStore {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[async_trait]
impl Resource for SecretStore {
    const KIND: &'static str = "secret store";

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
        let cmd = CommandLine::new("keyvault")
            .action("show")
            .flag("--name", &self.name);
        let value = self.client.invoke_json(&cmd).await?;
        RemoteDescriptor::from_output(Self::KIND, &self.name, value)
    }
}
