//! Signed-in account and principal

use serde::Deserialize;
use weblodge_cloud::{CloudError, CommandLine, ControlPlaneClient, Result};

/// Output of `account show`
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Subscription id
    pub id: String,

    #[serde(rename = "tenantId")]
    pub tenant_id: String,

    pub user: AccountUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountUser {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,
}

impl AccountUser {
    pub fn is_service_principal(&self) -> bool {
        self.kind.eq_ignore_ascii_case("servicePrincipal")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalType {
    User,
    ServicePrincipal,
}

impl PrincipalType {
    pub fn as_azure(&self) -> &'static str {
        match self {
            PrincipalType::User => "User",
            PrincipalType::ServicePrincipal => "ServicePrincipal",
        }
    }
}

/// Directory object that role assignments are granted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub object_id: String,
    pub principal_type: PrincipalType,
}

impl Principal {
    pub fn service_principal(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            principal_type: PrincipalType::ServicePrincipal,
        }
    }
}

pub async fn current_account(client: &ControlPlaneClient) -> Result<Account> {
    client.invoke_as(&CommandLine::new("account").action("show")).await
}

/// The principal the CLI is signed in as
pub async fn current_principal(client: &ControlPlaneClient) -> Result<Principal> {
    let account = current_account(client).await?;

    let (command, principal_type) = if account.user.is_service_principal() {
        (
            CommandLine::new("ad sp").action("show").flag("--id", &account.user.name),
            PrincipalType::ServicePrincipal,
        )
    } else {
        (
            CommandLine::new("ad signed-in-user").action("show"),
            PrincipalType::User,
        )
    };

    let value = client.invoke_json(&command).await?;
    let object_id = value
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CloudError::UnexpectedOutput(format!("`{}` returned no id", command)))?;

    Ok(Principal {
        object_id: object_id.to_string(),
        principal_type,
    })
}
