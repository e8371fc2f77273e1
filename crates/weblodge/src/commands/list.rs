use crate::utils;
use colored::Colorize;

pub async fn handle() -> anyhow::Result<()> {
    let client = utils::control_plane().await?;
    let deployments = utils::deployer(&client)?.list().await?;

    if deployments.is_empty() {
        println!("No application deployed.");
        return Ok(());
    }

    let mut leftovers = Vec::new();
    for deployment in &deployments {
        match &deployment.url {
            Some(url) => println!("Application: {}", url.cyan()),
            None => leftovers.push(deployment.name.as_str()),
        }
    }

    if !leftovers.is_empty() {
        println!();
        println!(
            "{}",
            "We found the following infrastructure without application deployed. This can be costly."
                .yellow()
        );
        for name in leftovers {
            println!(
                "Application '{}', can be deleted by running: `{} delete --subdomain {}`",
                name,
                utils::CLI_NAME,
                name
            );
        }
    }
    Ok(())
}
