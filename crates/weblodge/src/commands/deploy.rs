use crate::utils;
use colored::Colorize;
use std::path::PathBuf;
use weblodge_cloud::ActionType;
use weblodge_cloud_azure::{DeploymentRequest, LogLevel};
use weblodge_config::parameters::DEPLOY;
use weblodge_config::{Parameters, StateFile};

pub async fn handle(state: &StateFile, flags: Parameters) -> anyhow::Result<()> {
    let params = utils::load_parameters(state, DEPLOY, &flags)?;
    let request = request_from(&params)?;

    if !request.artifact.is_file() {
        anyhow::bail!(
            "No application package found at '{}', zip the application into this file first",
            request.artifact.display()
        );
    }

    println!(
        "{}",
        format!(
            "Deploying '{}' ({} in {})...",
            request.subdomain, request.tier, request.location
        )
        .blue()
    );

    let client = utils::control_plane().await?;
    let deployment = utils::deployer(&client)?.ensure_deployed(&request).await?;
    state.save(&params)?;

    for action in &deployment.report.actions {
        if action.action_type == ActionType::NoOp {
            continue;
        }
        println!(
            "  • {} {} '{}': {}",
            action.action_type.to_string().cyan(),
            action.resource_type,
            action.resource_id,
            action.description.dimmed()
        );
    }
    println!();
    utils::print_success(&deployment.report.summary().to_string());
    println!(
        "The application will soon be available at: {}",
        deployment.application.url().await?.cyan().bold()
    );
    Ok(())
}

/// Desired deployment from resolved parameters
pub fn request_from(params: &Parameters) -> anyhow::Result<DeploymentRequest> {
    let log_level: LogLevel = params.require("log_level")?.parse()?;
    Ok(DeploymentRequest {
        subdomain: params.require("subdomain")?.to_string(),
        tier: params.require("tier")?.to_uppercase(),
        location: params.require("location")?.to_string(),
        environment: params.get("environment").map(str::to_string),
        artifact: params.artifact()?,
        env_file: params.get("env_file").map(PathBuf::from),
        log_level,
    })
}
