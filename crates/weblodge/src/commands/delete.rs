use crate::utils;
use colored::Colorize;
use weblodge_config::parameters::TARGET;
use weblodge_config::{Parameters, StateFile};

pub async fn handle(state: &StateFile, flags: Parameters, yes: bool) -> anyhow::Result<()> {
    let params = utils::load_parameters(state, TARGET, &flags)?;
    let subdomain = params.require("subdomain")?;

    if !yes
        && !utils::confirm(&format!(
            "Do you want to delete the application '{}' (yes/no.)?",
            subdomain
        ))?
    {
        println!("Aborting.");
        return Ok(());
    }

    println!("{}", format!("Deleting '{}'...", subdomain).yellow());
    let client = utils::control_plane().await?;
    if utils::deployer(&client)?.ensure_deleted(subdomain).await? {
        utils::print_success(&format!("Application '{}' deleted", subdomain));
    } else {
        println!("Nothing to delete: no application '{}'.", subdomain);
    }
    Ok(())
}
