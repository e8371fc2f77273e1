use crate::utils;
use colored::Colorize;
use weblodge_cloud_azure::{PriceCatalog, TierCatalog};
use weblodge_config::parameters::CATALOG;
use weblodge_config::{Parameters, StateFile};

pub async fn handle(state: &StateFile, flags: Parameters) -> anyhow::Result<()> {
    let params = utils::load_parameters(state, CATALOG, &flags)?;
    let location = params.require("location")?;

    let tiers = PriceCatalog::new()?.tiers(location).await?;

    println!("{}", format!("Tiers available in '{}':", location).bold());
    for tier in &tiers {
        if tier.is_free() {
            println!("  {}", tier.to_string().green());
        } else {
            println!("  {}", tier);
        }
    }
    Ok(())
}
