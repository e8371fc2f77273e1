use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use weblodge_cloud::{CloudError, ControlPlaneClient};
use weblodge_cloud_azure::{AzCli, Deployer, PriceCatalog};
use weblodge_config::{Parameter, Parameters, StateFile};

pub const CLI_NAME: &str = "weblodge";

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Command line values over stored values over defaults
pub fn load_parameters(
    state: &StateFile,
    definitions: &[Parameter],
    flags: &Parameters,
) -> anyhow::Result<Parameters> {
    let stored = state.load()?;
    Ok(Parameters::resolve(definitions, flags, &stored)?)
}

/// Client on the local `az` installation
pub async fn control_plane() -> anyhow::Result<ControlPlaneClient> {
    let az = AzCli::new();
    if let Err(e) = az.check_installed().await {
        tracing::debug!("az lookup failed: {}", e);
        return Err(CloudError::NotInstalled("az".to_string()).into());
    }
    Ok(ControlPlaneClient::new(Arc::new(az)))
}

pub fn deployer(client: &ControlPlaneClient) -> anyhow::Result<Deployer> {
    Ok(Deployer::new(client, Arc::new(PriceCatalog::new()?)))
}

/// Ask `question`; only `yes` confirms
pub fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} ", question);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == "yes")
}

/// Remediation for failures the user can act on
pub fn hint(error: &anyhow::Error) -> Option<String> {
    let cloud = error.downcast_ref::<CloudError>()?;
    let hint = match cloud {
        CloudError::NoMoreFreeApplicationAvailable(existing) => format!(
            "Azure supports only one free application by location. Please, change the \
             deployment location or the application tier. The existing free application in \
             this location is '{}'.",
            existing
        ),
        CloudError::PartiallyProvisioned { .. } => format!(
            "The application may not be deployed, but the infrastructure may be partially \
             created. Run `{} deploy` again to finish it, or delete it by running: {} delete",
            CLI_NAME, CLI_NAME
        ),
        CloudError::InvalidTier { location, .. } => format!(
            "Run `{} tiers --location {}` to see the available tiers.",
            CLI_NAME, location
        ),
        CloudError::CanNotChangeLocation { current, .. } => format!(
            "Deploy with `--location {}` or delete the application first.",
            current
        ),
        CloudError::NotInstalled(_) => {
            "Install the Azure CLI: https://learn.microsoft.com/cli/azure/install-azure-cli"
                .to_string()
        }
        CloudError::NotOwned(_) => {
            format!("{} only deletes the resources it created.", CLI_NAME)
        }
        _ => return None,
    };
    Some(hint)
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}
