mod commands;
mod utils;
mod workflow;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use weblodge_config::Parameters;

#[derive(Parser)]
#[command(name = "weblodge", version)]
#[command(about = "Deploy a web application to Azure App Service.", long_about = None)]
struct Cli {
    /// File keeping the parameters of the last successful command
    #[arg(long, global = true, env = "WEBLODGE_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Show what is being done (-vv for every Azure command)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the infrastructure, then upload the application
    Deploy(DeployArgs),
    /// Delete the application and its infrastructure
    Delete {
        #[command(flatten)]
        target: TargetArgs,
        /// Delete without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Stream the application logs
    Logs {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Let a GitHub repository deploy the application
    Github {
        #[command(flatten)]
        deploy: DeployArgs,
        /// The deployment branch
        #[arg(long)]
        branch: Option<String>,
        /// The GitHub username
        #[arg(long)]
        username: Option<String>,
        /// The GitHub repository
        #[arg(long)]
        repository: Option<String>,
        /// Remove the GitHub identity instead
        #[arg(long)]
        delete: bool,
    },
    /// List the deployed applications
    List,
    /// List the tiers available in a location
    Tiers {
        /// The physical application location
        #[arg(long)]
        location: Option<String>,
    },
}

#[derive(Args)]
struct DeployArgs {
    /// Unique subdomain of the application within Azure, random if not provided
    #[arg(long)]
    subdomain: Option<String>,
    /// The application computational power
    #[arg(long)]
    tier: Option<String>,
    /// The physical application location
    #[arg(long)]
    location: Option<String>,
    /// The environment of the application
    #[arg(long)]
    environment: Option<String>,
    /// Folder containing the zipped application
    #[arg(long)]
    dist: Option<String>,
    /// File containing the environment variables
    #[arg(long)]
    env_file: Option<String>,
    /// The log level of the application infrastructure
    #[arg(long, value_parser = ["error", "info", "verbose", "warning"])]
    log_level: Option<String>,
}

impl DeployArgs {
    fn into_parameters(self) -> Parameters {
        Parameters::new()
            .with_opt("subdomain", self.subdomain)
            .with_opt("tier", self.tier)
            .with_opt("location", self.location)
            .with_opt("environment", self.environment)
            .with_opt("dist", self.dist)
            .with_opt("env_file", self.env_file)
            .with_opt("log_level", self.log_level)
    }
}

#[derive(Args)]
struct TargetArgs {
    /// Subdomain of the application
    #[arg(long)]
    subdomain: Option<String>,
}

impl TargetArgs {
    fn into_parameters(self) -> Parameters {
        Parameters::new().with_opt("subdomain", self.subdomain)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Command failed:".red().bold(), e);
        if let Some(hint) = utils::hint(&e) {
            eprintln!("{}", hint.yellow());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = weblodge_config::find_state_file(cli.config_file)?;

    match cli.command {
        Commands::Deploy(args) => commands::deploy::handle(&state, args.into_parameters()).await,
        Commands::Delete { target, yes } => {
            commands::delete::handle(&state, target.into_parameters(), yes).await
        }
        Commands::Logs { target } => commands::logs::handle(&state, target.into_parameters()).await,
        Commands::Github {
            deploy,
            branch,
            username,
            repository,
            delete,
        } => {
            let flags = deploy
                .into_parameters()
                .with_opt("branch", branch)
                .with_opt("username", username)
                .with_opt("repository", repository);
            commands::github::handle(&state, flags, delete).await
        }
        Commands::List => commands::list::handle().await,
        Commands::Tiers { location } => {
            let flags = Parameters::new().with_opt("location", location);
            commands::tiers::handle(&state, flags).await
        }
    }
}
