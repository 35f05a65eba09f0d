mod auth;
mod cli;
mod error;
mod metrics;
mod models;
mod providers;
mod report;
mod window;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    if let Err(e) = dotenvy::dotenv() {
        debug!("No .env file loaded: {e}");
    }

    let cli = Cli::parse();
    info!("Starting doralens - DORA metrics report");
    cli.execute().await?;

    Ok(())
}
