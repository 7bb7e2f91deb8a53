pub mod cli;
pub mod command_executor;
pub mod config;
pub mod deployment_manager;
pub mod error;
pub mod output;
pub mod platform_client;
pub mod spec_builder;
pub mod types;

use clap::Parser;
use cli::Command;
pub use cli::CLI;
use tracing_subscriber::EnvFilter;

pub async fn run() -> u8 {
    let cli = CLI::parse();
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Deploy(args) => cli::deploy(&args).await,
    }
}
