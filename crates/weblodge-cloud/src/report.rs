//! Deployment report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a deployment as seen by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// No application exists for the subdomain
    NotExisting,
    /// Infrastructure is being created
    Provisioning,
    /// An existing application is being brought to the desired state
    Reconciling,
    /// The artifact has been uploaded
    Deployed,
    /// Infrastructure may exist without an application
    PartiallyProvisioned,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentState::NotExisting => write!(f, "not existing"),
            DeploymentState::Provisioning => write!(f, "provisioning"),
            DeploymentState::Reconciling => write!(f, "reconciling"),
            DeploymentState::Deployed => write!(f, "deployed"),
            DeploymentState::PartiallyProvisioned => write!(f, "partially provisioned"),
        }
    }
}

/// One step performed against a remote resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionType,

    /// Resource kind (e.g., "resource group", "compute plan")
    pub resource_type: String,

    /// Resource name
    pub resource_id: String,

    pub description: String,
}

/// Type of action performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Upload,
    NoOp,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Upload => write!(f, "upload"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Ordered record of what a deployment did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub subdomain: String,
    pub state: DeploymentState,
    pub actions: Vec<Action>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DeploymentReport {
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            state: DeploymentState::NotExisting,
            actions: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn transition(&mut self, state: DeploymentState) {
        tracing::info!("Deployment '{}': {} -> {}", self.subdomain, self.state, state);
        self.state = state;
        if matches!(
            state,
            DeploymentState::Deployed | DeploymentState::PartiallyProvisioned
        ) {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn record(
        &mut self,
        action_type: ActionType,
        resource_type: &str,
        resource_id: &str,
        description: impl Into<String>,
    ) {
        let description = description.into();
        tracing::debug!("{} {} '{}': {}", action_type, resource_type, resource_id, description);
        self.actions.push(Action {
            action_type,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            description,
        });
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Kinds of resources created, in creation order
    pub fn created(&self) -> Vec<&str> {
        self.actions_by_type(ActionType::Create)
            .into_iter()
            .map(|a| a.resource_type.as_str())
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        self.actions.iter().any(|a| a.action_type != ActionType::NoOp)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            upload: self.actions_by_type(ActionType::Upload).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Counts of performed actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub create: usize,
    pub update: usize,
    pub upload: usize,
    pub no_change: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} uploaded, {} unchanged",
            self.create, self.update, self.upload, self.no_change
        )
    }
}
