//! Identity federation for CI pipelines
//!
//! Provisions an Entra application trusted by GitHub Actions through OIDC:
//! application, service principal, owner role on the deployment's resource
//! group and a federated credential bound to one repository branch. Each step
//! looks for an existing object first, so provisioning converges when
//! repeated.

use crate::principal::current_account;
use crate::resource_group::ResourceGroup;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use weblodge_cloud::{CloudError, CommandLine, ControlPlaneClient, Resource, Result};

pub const GITHUB_ISSUER: &str = "https://token.actions.githubusercontent.com";
pub const TOKEN_EXCHANGE_AUDIENCE: &str = "api://AzureADTokenExchange";

const OWNER_ROLE: &str = "owner";

/// Repository branch allowed to deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepository {
    pub username: String,
    pub repository: String,
    pub branch: String,
}

impl GitHubRepository {
    pub fn new(
        username: impl Into<String>,
        repository: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            repository: repository.into(),
            branch: branch.into(),
        }
    }

    /// OIDC subject claim of workflow runs on the branch
    pub fn subject(&self) -> String {
        format!(
            "repo:{}/{}:ref:refs/heads/{}",
            self.username, self.repository, self.branch
        )
    }
}

/// Federated credential definition as accepted by `ad app federated-credential create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedCredential {
    pub name: String,
    pub issuer: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub audiences: Vec<String>,
}

impl FederatedCredential {
    pub fn github(display_name: &str, repository: &GitHubRepository) -> Self {
        Self {
            name: display_name.to_string(),
            issuer: GITHUB_ISSUER.to_string(),
            subject: repository.subject(),
            description: format!("WebLodge GitHub Application for application: {}", display_name),
            audiences: vec![TOKEN_EXCHANGE_AUDIENCE.to_string()],
        }
    }

    /// Same trust binding; name and description are ignored
    pub fn binds_same(&self, other: &FederatedCredential) -> bool {
        self.issuer == other.issuer
            && self.subject == other.subject
            && self.audiences == other.audiences
    }
}

/// Identifiers a workflow needs to log in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFederationApplication {
    pub client_id: String,
    pub tenant_id: String,
    pub subscription_id: String,
}

/// Display name of the identity application of a deployment
pub fn application_display_name(name: &str) -> String {
    format!("weblodge-{}", name)
}

pub struct FederationProvisioner {
    client: ControlPlaneClient,
}

impl FederationProvisioner {
    pub fn new(client: &ControlPlaneClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Provision (or find) the CI identity of `name`
    pub async fn provision(
        &self,
        name: &str,
        repository: &GitHubRepository,
        resource_group: &ResourceGroup,
    ) -> Result<IdentityFederationApplication> {
        let display_name = application_display_name(name);
        let account = current_account(&self.client).await?;

        let app_id = self.ensure_application(&display_name).await?;
        let sp_id = self.ensure_service_principal(&display_name, &app_id).await?;
        let scope = resource_group.id().await?;
        self.ensure_owner_role(&account.id, &sp_id, &scope).await?;
        self.ensure_federated_credential(
            &app_id,
            &FederatedCredential::github(&display_name, repository),
        )
        .await?;

        Ok(IdentityFederationApplication {
            client_id: app_id,
            tenant_id: account.tenant_id,
            subscription_id: account.id,
        })
    }

    /// Delete the identity application of `name`; `false` when there is none
    pub async fn delete_application(&self, name: &str) -> Result<bool> {
        let display_name = application_display_name(name);
        let Some(app_id) = self.find_application(&display_name).await? else {
            return Ok(false);
        };

        let cmd = CommandLine::new("ad app").action("delete").flag("--id", &app_id);
        self.client.invoke_raw(&cmd).await?;
        tracing::info!("Deleted identity application '{}'", display_name);
        Ok(true)
    }

    async fn find_application(&self, display_name: &str) -> Result<Option<String>> {
        let cmd = CommandLine::new("ad app")
            .action("list")
            .flag("--display-name", display_name);
        let apps = self.client.invoke_json(&cmd).await?;
        Ok(array(&apps)
            .iter()
            .find(|app| str_field(app, "displayName") == Some(display_name))
            .and_then(|app| str_field(app, "appId"))
            .map(str::to_string))
    }

    async fn ensure_application(&self, display_name: &str) -> Result<String> {
        if let Some(app_id) = self.find_application(display_name).await? {
            tracing::debug!("Identity application '{}' exists", display_name);
            return Ok(app_id);
        }

        let cmd = CommandLine::new("ad app")
            .action("create")
            .flag("--display-name", display_name);
        let app = self.client.invoke_json(&cmd).await?;
        tracing::info!("Created identity application '{}'", display_name);
        required(&app, "appId", &cmd)
    }

    async fn ensure_service_principal(&self, display_name: &str, app_id: &str) -> Result<String> {
        let cmd = CommandLine::new("ad sp")
            .action("list")
            .flag("--display-name", display_name);
        let principals = self.client.invoke_json(&cmd).await?;
        if let Some(id) = array(&principals)
            .iter()
            .find(|sp| str_field(sp, "appId") == Some(app_id))
            .and_then(|sp| str_field(sp, "id"))
        {
            return Ok(id.to_string());
        }

        let cmd = CommandLine::new("ad sp").action("create").flag("--id", app_id);
        let principal = self.client.invoke_json(&cmd).await?;
        tracing::info!("Created service principal for '{}'", display_name);
        required(&principal, "id", &cmd)
    }

    async fn ensure_owner_role(&self, subscription_id: &str, sp_id: &str, scope: &str) -> Result<()> {
        let cmd = CommandLine::new("role assignment")
            .action("list")
            .flag("--scope", scope)
            .flag("--assignee", sp_id)
            .flag("--role", OWNER_ROLE);
        let assignments = self.client.invoke_json(&cmd).await?;
        if !array(&assignments).is_empty() {
            return Ok(());
        }

        let cmd = CommandLine::new("role assignment")
            .action("create")
            .flag("--role", OWNER_ROLE)
            .flag("--subscription", subscription_id)
            .flag("--assignee-object-id", sp_id)
            .flag("--assignee-principal-type", "ServicePrincipal")
            .flag("--scope", scope);
        self.client.invoke_raw(&cmd).await?;
        tracing::info!("Granted owner role on '{}'", scope);
        Ok(())
    }

    async fn ensure_federated_credential(
        &self,
        app_id: &str,
        desired: &FederatedCredential,
    ) -> Result<()> {
        let cmd = CommandLine::new("ad app federated-credential")
            .action("list")
            .flag("--id", app_id);
        let existing = self.client.invoke_json(&cmd).await?;
        let already_bound = array(&existing)
            .iter()
            .filter_map(|c| serde_json::from_value::<FederatedCredential>(c.clone()).ok())
            .any(|c| c.binds_same(desired));
        if already_bound {
            return Ok(());
        }

        // Removed when dropped, right after the command returns.
        let mut parameters = tempfile::NamedTempFile::new()?;
        serde_json::to_writer(&mut parameters, desired)?;
        parameters.flush()?;

        let cmd = CommandLine::new("ad app federated-credential")
            .action("create")
            .flag("--id", app_id)
            .flag("--parameters", parameters.path().display().to_string());
        self.client.invoke_raw(&cmd).await?;
        tracing::info!("Created federated credential for '{}'", desired.subject);
        Ok(())
    }
}

fn array(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn required(value: &Value, key: &str, command: &CommandLine) -> Result<String> {
    str_field(value, key)
        .map(str::to_string)
        .ok_or_else(|| CloudError::UnexpectedOutput(format!("`{}` returned no {}", command, key)))
}
