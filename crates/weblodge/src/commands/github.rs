use crate::{utils, workflow};
use colored::Colorize;
use weblodge_cloud::Resource;
use weblodge_cloud_azure::{FederationProvisioner, GitHubRepository, ResourceGroup};
use weblodge_config::parameters::{GITHUB, TARGET};
use weblodge_config::{Parameters, StateFile};

pub async fn handle(state: &StateFile, flags: Parameters, delete: bool) -> anyhow::Result<()> {
    if delete {
        return remove(state, flags).await;
    }

    let params = utils::load_parameters(state, GITHUB, &flags)?;
    let subdomain = params.require("subdomain")?;
    let repository = GitHubRepository::new(
        params.require("username")?,
        params.require("repository")?,
        params.require("branch")?,
    );

    let client = utils::control_plane().await?;
    let group = ResourceGroup::new(&client, subdomain);
    if !group.exists().await {
        anyhow::bail!(
            "Application '{}' is not deployed, run `{} deploy` first",
            subdomain,
            utils::CLI_NAME
        );
    }

    println!(
        "{}",
        format!("Allowing '{}' to deploy '{}'...", repository.subject(), subdomain).blue()
    );
    let identity = FederationProvisioner::new(&client)
        .provision(subdomain, &repository, &group)
        .await?;

    let root = std::env::current_dir()?;
    let config_file = state.path().strip_prefix(&root).unwrap_or(state.path());
    let content = workflow::render(
        &repository.branch,
        params.require("dist")?,
        &config_file.display().to_string(),
    );
    let workflow_file = workflow::write(&root, &content)?;
    state.save(&params)?;

    let workflow_file = workflow_file.strip_prefix(&root).unwrap_or(&workflow_file);
    utils::print_success("GitHub identity ready");
    println!("Please, add the following secrets to your GitHub repository:");
    println!("  - AZURE_CLIENT_ID: {}", identity.client_id.cyan());
    println!("  - AZURE_TENANT_ID: {}", identity.tenant_id.cyan());
    println!("  - AZURE_SUBSCRIPTION_ID: {}", identity.subscription_id.cyan());
    println!("Then, commit and push the following files:");
    println!("  - {}", workflow_file.display());
    println!("  - {}", config_file.display());
    Ok(())
}

async fn remove(state: &StateFile, flags: Parameters) -> anyhow::Result<()> {
    let params = utils::load_parameters(state, TARGET, &flags)?;
    let subdomain = params.require("subdomain")?;

    let client = utils::control_plane().await?;
    if FederationProvisioner::new(&client)
        .delete_application(subdomain)
        .await?
    {
        utils::print_success(&format!("GitHub identity of '{}' deleted", subdomain));
    } else {
        println!("No GitHub identity for '{}'.", subdomain);
    }

    let workflow_file = workflow::workflow_path(&std::env::current_dir()?);
    if workflow_file.is_file() {
        std::fs::remove_file(&workflow_file)?;
        println!("Removed {}", workflow_file.display());
    }
    Ok(())
}
