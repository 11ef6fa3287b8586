mod cache;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod server;
mod services;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::tickets::{self, TicketsCommandArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Parser)]
#[command(name = "teamdash", author, version, about = "Team status dashboard backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard server with the issue tracker proxy and ticket feed.
    Serve,
    /// Fetch the ticket feed once and print it.
    Tickets(TicketsArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
}

#[derive(Args)]
struct TicketsArgs {
    /// Print the collection as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => config_cmd::run(args.command),
        Commands::Serve => {
            let ctx = Arc::new(AppContext::from_config(AppConfig::load()?)?);
            server::serve(ctx).await
        }
        Commands::Tickets(args) => {
            let ctx = AppContext::from_config(AppConfig::load()?)?;
            tickets::run(&ctx, TicketsCommandArgs { json: args.json }).await
        }
    }
}
