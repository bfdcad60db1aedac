mod auth;
mod build;
mod cli;
mod config;
mod error;
mod output;
mod redmine;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting redmine-notify");
    cli.execute().await?;

    Ok(())
}
