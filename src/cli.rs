use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::command_executor::{DEFAULT_SHELL, ShellExecutor};
use crate::config::Config;
use crate::deployment_manager::DeploymentManager;
use crate::error::DeployError;
use crate::output::{ProgressReporter, SilentReporter, TerminalReporter};
use crate::platform_client::{DEFAULT_API_URL, DigitalOceanClient};

#[derive(Parser)]
#[command(
    name = "do-deployer",
    version,
    about = "Build a local project and deploy it to DigitalOcean App Platform"
)]
pub struct CLI {
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v, -vv, etc.)")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy your frontend to DigitalOcean
    Deploy(DeployArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[arg(value_name = "PATH", index = 1, help = "Project directory to build and deploy")]
    pub path: PathBuf,
    #[arg(short, long, help = "Application name")]
    pub name: Option<String>,
    #[arg(short, long)]
    pub build_command: Option<String>,
    #[arg(short, long)]
    pub run_command: Option<String>,
    #[arg(short, long, help = "HTTP port the app listens on")]
    pub port: Option<String>,
    #[arg(long, default_value_t = 10, help = "Seconds between status checks")]
    pub poll_interval: u64,
    #[arg(long, help = "Give up after this many status checks")]
    pub max_polls: Option<u32>,
    #[arg(long, help = "Give up after this many seconds of waiting for the app to go live")]
    pub timeout: Option<u64>,
    #[arg(
        long,
        default_value_t = 0,
        help = "Retry transient status check failures this many times in a row"
    )]
    pub poll_retries: u32,
    #[arg(long, default_value_t = 1000, help = "Initial retry backoff in milliseconds")]
    pub retry_backoff: u64,
    #[arg(long, default_value = DEFAULT_SHELL, help = "Shell used to run the build command")]
    pub shell: String,
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,
    #[arg(
        short = 'e',
        long = "env-file",
        default_value = ".env",
        help = "Path to .env file"
    )]
    pub env_file: String,
    #[arg(long, help = "Never prompt; fail if a value is missing")]
    pub no_input: bool,
    #[arg(short, long, help = "Only print the live URL")]
    pub quiet: bool,
}

// Main application logic. Returns the process exit code.
pub async fn deploy(args: &DeployArgs) -> u8 {
    let config = match Config::from_env_and_cli(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            if matches!(e, DeployError::Config(_)) {
                println!();
                Config::show_configuration_help();
            }
            return e.exit_code();
        }
    };

    info!(
        "Deploying '{}' from {}",
        config.request.app_name,
        config.request.source_dir.display()
    );

    let platform = match DigitalOceanClient::new(&config.token, &config.api_url) {
        Ok(client) => client,
        Err(e) => {
            let e = DeployError::Submission(e);
            eprintln!("Error: {}", e);
            return e.exit_code();
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling deployment");
            on_interrupt.cancel();
        }
    });

    if args.quiet {
        run_deployment(config, platform, SilentReporter, &cancel, true).await
    } else {
        run_deployment(config, platform, TerminalReporter::new(), &cancel, false).await
    }
}

async fn run_deployment<R: ProgressReporter>(
    config: Config,
    platform: DigitalOceanClient,
    reporter: R,
    cancel: &CancellationToken,
    quiet: bool,
) -> u8 {
    let manager = DeploymentManager::new(
        ShellExecutor::new(config.shell),
        platform,
        reporter,
        config.request,
        config.poll,
    );

    match manager.deploy(cancel).await {
        Ok(deployment) => {
            if quiet {
                println!("{}", deployment.live_url);
            }
            0
        }
        Err(e) => {
            if quiet {
                eprintln!("Error: {}", e);
            }
            e.exit_code()
        }
    }
}
