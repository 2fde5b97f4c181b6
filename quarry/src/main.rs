// quarry/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug quarry run ... to see the details
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quarry=info,quarry_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project_dir,
            config,
        } => commands::run::execute(project_dir, config).await,
        Commands::Stage {
            stage,
            project_dir,
            config,
        } => commands::stage::execute(stage.into(), project_dir, config).await,
        Commands::Report { input, format } => commands::report::execute(input, format).await,
        Commands::Inspect { input, limit } => commands::inspect::execute(input, limit).await,
        Commands::Fetch { url, cache, ttl } => commands::fetch::execute(url, cache, ttl).await,
    }
}
