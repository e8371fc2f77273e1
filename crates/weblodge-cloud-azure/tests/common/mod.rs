//! In-memory Azure control plane for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use weblodge_cloud::{CommandLine, ControlPlaneClient, RetryConfig, Transport, TransportError};
use weblodge_cloud_azure::{Deployer, StaticCatalog};

pub const SUBSCRIPTION: &str = "00000000-sub";
pub const TENANT: &str = "00000000-tenant";
pub const USER_OBJECT_ID: &str = "user-object-1";

#[derive(Default)]
pub struct State {
    pub logged_in: bool,
    pub groups: BTreeMap<String, Value>,
    pub plans: BTreeMap<String, Value>,
    pub vaults: BTreeMap<String, Value>,
    pub deleted_vaults: Vec<String>,
    pub secrets: BTreeMap<(String, String), String>,
    pub apps: BTreeMap<String, Value>,
    pub settings: BTreeMap<String, BTreeMap<String, String>>,
    pub site_config: BTreeMap<String, BTreeMap<String, String>>,
    pub log_levels: BTreeMap<String, String>,
    pub uploads: Vec<(String, String)>,
    pub role_assignments: Vec<(String, String, String)>,
    pub ad_apps: Vec<Value>,
    pub service_principals: Vec<Value>,
    pub credentials: BTreeMap<String, Vec<Value>>,
    pub calls: Vec<String>,
    pub fail_on: Option<String>,
    next_id: u32,
}

pub struct FakeAz {
    state: Mutex<State>,
}

/// Location as reported for App Service plans
fn display_location(location: &str) -> String {
    match location {
        "northeurope" => "North Europe".to_string(),
        "westeurope" => "West Europe".to_string(),
        other => other.to_string(),
    }
}

fn not_found(what: &str) -> TransportError {
    TransportError::NotFound(format!("(ResourceNotFound) {} was not found.", what))
}

fn tags_of(cmd: &CommandLine) -> Value {
    let mut tags = serde_json::Map::new();
    for token in cmd.values_of("--tags") {
        if let Some((k, v)) = token.split_once('=') {
            tags.insert(k.to_string(), json!(v));
        }
    }
    Value::Object(tags)
}

fn values(map: &BTreeMap<String, Value>) -> String {
    Value::Array(map.values().cloned().collect()).to_string()
}

impl FakeAz {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                logged_in: true,
                ..State::default()
            }),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        let fake = Self::new();
        fake.state().logged_in = false;
        fake
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of issued commands starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Index of the first command starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.state().calls.iter().position(|c| c.starts_with(prefix))
    }

    /// Make every command starting with `prefix` fail
    pub fn fail_on(&self, prefix: &str) {
        self.state().fail_on = Some(prefix.to_string());
    }

    pub fn clear_failure(&self) {
        self.state().fail_on = None;
    }

    /// Role assignments on `scope` as (role, assignee) pairs
    pub fn grants_on(&self, scope: &str) -> Vec<(String, String)> {
        self.state()
            .role_assignments
            .iter()
            .filter(|(_, _, s)| s == scope)
            .map(|(role, assignee, _)| (role.clone(), assignee.clone()))
            .collect()
    }

    pub fn seed_group(&self, name: &str, location: &str, tags: Value) {
        self.state().groups.insert(
            name.to_string(),
            json!({
                "id": format!("/subscriptions/{}/resourceGroups/{}", SUBSCRIPTION, name),
                "name": name,
                "location": location,
                "tags": tags,
            }),
        );
    }

    pub fn seed_plan(&self, name: &str, location: &str, sku: &str, tags: Value) {
        self.state().plans.insert(
            name.to_string(),
            json!({
                "id": format!("/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/serverfarms/{}", SUBSCRIPTION, name, name),
                "name": name,
                "resourceGroup": name,
                "location": display_location(location),
                "sku": { "name": sku },
                "tags": tags,
            }),
        );
    }

    fn next_id(&self, state: &mut State) -> u32 {
        state.next_id += 1;
        state.next_id
    }

    fn handle(&self, cmd: &CommandLine) -> Result<String, TransportError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.calls.push(cmd.to_string());

        if cmd.starts_with("login") {
            state.logged_in = true;
            return Ok(String::new());
        }
        if !state.logged_in {
            return Err(TransportError::Unauthenticated(
                "Please run 'az login' to setup account.".into(),
            ));
        }
        if let Some(prefix) = &state.fail_on {
            if cmd.starts_with(prefix) {
                return Err(TransportError::Failed {
                    status: Some(1),
                    stderr: format!("(InternalServerError) {} failed", prefix),
                });
            }
        }

        let name = cmd.value_of("--name").unwrap_or_default().to_string();

        // account & directory
        if cmd.starts_with("account show") {
            return Ok(json!({
                "id": SUBSCRIPTION,
                "tenantId": TENANT,
                "user": { "name": "dev@example.com", "type": "user" }
            })
            .to_string());
        }
        if cmd.starts_with("ad signed-in-user show") {
            return Ok(json!({ "id": USER_OBJECT_ID }).to_string());
        }

        // resource groups
        if cmd.starts_with("group show") {
            return state
                .groups
                .get(&name)
                .map(Value::to_string)
                .ok_or_else(|| not_found(&format!("Resource group '{}'", name)));
        }
        if cmd.starts_with("group create") {
            let location = cmd.value_of("--location").unwrap_or_default();
            let group = json!({
                "id": format!("/subscriptions/{}/resourceGroups/{}", SUBSCRIPTION, name),
                "name": name,
                "location": location,
                "tags": tags_of(cmd),
            });
            state.groups.insert(name, group.clone());
            return Ok(group.to_string());
        }
        if cmd.starts_with("group update") {
            let group = state
                .groups
                .get_mut(&name)
                .ok_or_else(|| not_found(&format!("Resource group '{}'", name)))?;
            group["tags"] = tags_of(cmd);
            return Ok(group.to_string());
        }
        if cmd.starts_with("group delete") {
            if state.groups.remove(&name).is_none() {
                return Err(not_found(&format!("Resource group '{}'", name)));
            }
            state.plans.retain(|_, p| p["resourceGroup"] != name.as_str());
            state.apps.retain(|_, a| a["resourceGroup"] != name.as_str());
            let vaults: Vec<String> = state
                .vaults
                .iter()
                .filter(|(_, v)| v["resourceGroup"] == name.as_str())
                .map(|(k, _)| k.clone())
                .collect();
            for vault in vaults {
                state.vaults.remove(&vault);
                state.deleted_vaults.push(vault);
            }
            return Ok(String::new());
        }
        if cmd.starts_with("group list") {
            return Ok(values(&state.groups));
        }

        // plans
        if cmd.starts_with("appservice plan show") {
            return state
                .plans
                .get(&name)
                .map(Value::to_string)
                .ok_or_else(|| not_found(&format!("App Service plan '{}'", name)));
        }
        if cmd.starts_with("appservice plan create") {
            let group = cmd.value_of("--resource-group").unwrap_or_default();
            let location = cmd.value_of("--location").unwrap_or_default();
            let plan = json!({
                "id": format!("/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/serverfarms/{}", SUBSCRIPTION, group, name),
                "name": name,
                "resourceGroup": group,
                "location": display_location(location),
                "sku": { "name": cmd.value_of("--sku").unwrap_or_default() },
                "kind": "linux",
                "tags": tags_of(cmd),
            });
            state.plans.insert(name, plan.clone());
            return Ok(plan.to_string());
        }
        if cmd.starts_with("appservice plan update") {
            let plan = state
                .plans
                .get_mut(&name)
                .ok_or_else(|| not_found(&format!("App Service plan '{}'", name)))?;
            plan["sku"]["name"] = json!(cmd.value_of("--sku").unwrap_or_default());
            return Ok(plan.to_string());
        }
        if cmd.starts_with("appservice plan list") {
            return Ok(values(&state.plans));
        }

        // key vaults
        if cmd.starts_with("keyvault secret set") {
            let vault = cmd.value_of("--vault-name").unwrap_or_default().to_string();
            let value = cmd.value_of("--value").unwrap_or_default().to_string();
            state.secrets.insert((vault.clone(), name.clone()), value);
            return Ok(json!({
                "id": format!("https://{}.vault.azure.net/secrets/{}/1", vault, name),
                "name": name,
            })
            .to_string());
        }
        if cmd.starts_with("keyvault show") {
            return state
                .vaults
                .get(&name)
                .map(Value::to_string)
                .ok_or_else(|| not_found(&format!("Vault '{}'", name)));
        }
        if cmd.starts_with("keyvault create") {
            let group = cmd.value_of("--resource-group").unwrap_or_default();
            let vault = json!({
                "id": format!("/subscriptions/{}/resourceGroups/{}/providers/Microsoft.KeyVault/vaults/{}", SUBSCRIPTION, group, name),
                "name": name,
                "resourceGroup": group,
                "location": cmd.value_of("--location").unwrap_or_default(),
                "properties": {
                    "enableRbacAuthorization": cmd.value_of("--enable-rbac-authorization") == Some("true"),
                    "softDeleteRetentionInDays": 7
                },
                "tags": tags_of(cmd),
            });
            state.vaults.insert(name, vault.clone());
            return Ok(vault.to_string());
        }
        if cmd.starts_with("keyvault purge") {
            let before = state.deleted_vaults.len();
            state.deleted_vaults.retain(|v| *v != name);
            if state.deleted_vaults.len() == before {
                return Err(not_found(&format!("Deleted vault '{}'", name)));
            }
            return Ok(String::new());
        }

        // role assignments
        if cmd.starts_with("role assignment create") {
            let role = cmd.value_of("--role").unwrap_or_default().to_string();
            let assignee = cmd.value_of("--assignee-object-id").unwrap_or_default().to_string();
            let scope = cmd.value_of("--scope").unwrap_or_default().to_string();
            let assignment = (role.clone(), assignee.clone(), scope.clone());
            if state.role_assignments.contains(&assignment) {
                return Err(TransportError::Failed {
                    status: Some(1),
                    stderr: "(RoleAssignmentExists) The role assignment already exists.".into(),
                });
            }
            state
                .role_assignments
                .push((role.clone(), assignee.clone(), scope.clone()));
            return Ok(json!({
                "roleDefinitionName": role,
                "principalId": assignee,
                "scope": scope,
            })
            .to_string());
        }
        if cmd.starts_with("role assignment list") {
            let role = cmd.value_of("--role").unwrap_or_default();
            let assignee = cmd.value_of("--assignee").unwrap_or_default();
            let scope = cmd.value_of("--scope").unwrap_or_default();
            let found: Vec<Value> = state
                .role_assignments
                .iter()
                .filter(|(r, a, s)| r.eq_ignore_ascii_case(role) && a == assignee && s == scope)
                .map(|(r, a, s)| json!({ "roleDefinitionName": r, "principalId": a, "scope": s }))
                .collect();
            return Ok(Value::Array(found).to_string());
        }

        // web apps
        let group = cmd.value_of("--resource-group").unwrap_or_default().to_string();
        if cmd.starts_with("webapp show") {
            return state
                .apps
                .get(&name)
                .filter(|app| app["resourceGroup"] == group.as_str())
                .map(Value::to_string)
                .ok_or_else(|| not_found(&format!("The Resource 'Microsoft.Web/sites/{}'", name)));
        }
        if cmd.starts_with("webapp create") {
            let plan_id = cmd.value_of("--plan").unwrap_or_default().to_string();
            let plan_name = plan_id.rsplit('/').next().unwrap_or_default().to_string();
            let location = state
                .plans
                .get(&plan_name)
                .map(|p| p["location"].clone())
                .unwrap_or(Value::Null);
            let app = json!({
                "id": format!("/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}", SUBSCRIPTION, group, name),
                "name": name,
                "resourceGroup": group,
                "location": location,
                "appServicePlanId": plan_id,
                "defaultHostName": format!("{}.azurewebsites.net", name),
                "hostNames": [format!("{}.azurewebsites.net", name)],
                "tags": tags_of(cmd),
            });
            state.apps.insert(name, app.clone());
            return Ok(app.to_string());
        }
        if cmd.starts_with("webapp config appsettings set") {
            let settings = state.settings.entry(name).or_default();
            for pair in cmd.values_of("--settings") {
                if let Some((k, v)) = pair.split_once('=') {
                    settings.insert(k.to_string(), v.to_string());
                }
            }
            return Ok("[]".to_string());
        }
        if cmd.starts_with("webapp config set") {
            let config = state.site_config.entry(name).or_default();
            for flag in [
                "--web-sockets-enabled",
                "--http20-enabled",
                "--startup-file",
                "--always-on",
            ] {
                if let Some(value) = cmd.value_of(flag) {
                    config.insert(flag.trim_start_matches("--").to_string(), value.to_string());
                }
            }
            return Ok("{}".to_string());
        }
        if cmd.starts_with("webapp identity assign") {
            let identity = json!({
                "principalId": format!("identity-{}", name),
                "type": "SystemAssigned",
            });
            if let Some(app) = state.apps.get_mut(&name) {
                app["identity"] = identity.clone();
            }
            return Ok(identity.to_string());
        }
        if cmd.starts_with("webapp log config") {
            let level = cmd.value_of("--level").unwrap_or_default().to_string();
            state.log_levels.insert(name, level);
            return Ok("{}".to_string());
        }
        if cmd.starts_with("webapp deployment source config-zip") {
            let src = cmd.value_of("--src").unwrap_or_default().to_string();
            state.uploads.push((name, src));
            return Ok(String::new());
        }
        if cmd.starts_with("webapp list") {
            return Ok(values(&state.apps));
        }

        // Entra
        let display_name = cmd.value_of("--display-name").unwrap_or_default().to_string();
        if cmd.starts_with("ad app federated-credential list") {
            let id = cmd.value_of("--id").unwrap_or_default();
            let creds = state.credentials.get(id).cloned().unwrap_or_default();
            return Ok(Value::Array(creds).to_string());
        }
        if cmd.starts_with("ad app federated-credential create") {
            let id = cmd.value_of("--id").unwrap_or_default().to_string();
            let path = cmd.value_of("--parameters").unwrap_or_default();
            let content = std::fs::read_to_string(path).map_err(TransportError::Io)?;
            let credential: Value = serde_json::from_str(&content).unwrap();
            state.credentials.entry(id).or_default().push(credential.clone());
            return Ok(credential.to_string());
        }
        if cmd.starts_with("ad app list") {
            let found: Vec<Value> = state
                .ad_apps
                .iter()
                .filter(|a| a["displayName"] == display_name.as_str())
                .cloned()
                .collect();
            return Ok(Value::Array(found).to_string());
        }
        if cmd.starts_with("ad app create") {
            let n = self.next_id(state);
            let app = json!({ "appId": format!("app-{}", n), "displayName": display_name });
            state.ad_apps.push(app.clone());
            return Ok(app.to_string());
        }
        if cmd.starts_with("ad app delete") {
            let id = cmd.value_of("--id").unwrap_or_default();
            state.ad_apps.retain(|a| a["appId"] != id);
            state.service_principals.retain(|sp| sp["appId"] != id);
            state.credentials.remove(id);
            return Ok(String::new());
        }
        if cmd.starts_with("ad sp list") {
            let found: Vec<Value> = state
                .service_principals
                .iter()
                .filter(|sp| sp["displayName"] == display_name.as_str())
                .cloned()
                .collect();
            return Ok(Value::Array(found).to_string());
        }
        if cmd.starts_with("ad sp create") {
            let app_id = cmd.value_of("--id").unwrap_or_default().to_string();
            let app_name = state
                .ad_apps
                .iter()
                .find(|a| a["appId"] == app_id.as_str())
                .map(|a| a["displayName"].clone())
                .unwrap_or(Value::Null);
            let n = self.next_id(state);
            let sp = json!({ "id": format!("sp-{}", n), "appId": app_id, "displayName": app_name });
            state.service_principals.push(sp.clone());
            return Ok(sp.to_string());
        }

        Err(TransportError::Failed {
            status: Some(2),
            stderr: format!("fake az does not support `{}`", cmd),
        })
    }
}

#[async_trait]
impl Transport for FakeAz {
    async fn execute(&self, command: &CommandLine, _structured: bool) -> Result<String, TransportError> {
        self.handle(command)
    }

    async fn stream(&self, command: &CommandLine) -> Result<(), TransportError> {
        self.handle(command).map(|_| ())
    }
}

pub fn client(fake: &Arc<FakeAz>) -> ControlPlaneClient {
    ControlPlaneClient::with_retry(fake.clone(), RetryConfig::immediate().with_max_attempts(2))
}

pub fn deployer(fake: &Arc<FakeAz>) -> Deployer {
    Deployer::new(
        &client(fake),
        Arc::new(StaticCatalog::uniform("northeurope", 0.1)),
    )
    .with_settle_interval(std::time::Duration::ZERO)
}
