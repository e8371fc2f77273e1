use crate::utils;
use colored::Colorize;
use weblodge_config::parameters::TARGET;
use weblodge_config::{Parameters, StateFile};

pub async fn handle(state: &StateFile, flags: Parameters) -> anyhow::Result<()> {
    let params = utils::load_parameters(state, TARGET, &flags)?;
    let subdomain = params.require("subdomain")?;

    let client = utils::control_plane().await?;
    let deployer = utils::deployer(&client)?;

    println!(
        "{}",
        "Logs will be streamed, press CTRL+C to stop.".dimmed()
    );
    deployer.stream_logs(subdomain).await?;
    Ok(())
}
