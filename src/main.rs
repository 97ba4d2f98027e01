#![warn(clippy::pedantic)]

use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod constants;
mod event;
#[cfg(test)]
mod fixtures;
mod github;
mod label_stats;
mod retry;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    cli::init_tracing();

    let cli = cli::Cli::parse();
    match cli.command {
        cli::Commands::Serve(args) => {
            server::serve(args).await?;
        }
        cli::Commands::LabelStats(args) => {
            label_stats::run(args).await?;
        }
    }
    Ok(())
}
