use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pushscrape::config::{Args, Config};
use pushscrape::process::process_targets;
use pushscrape::request::PushshiftClient;
use pushscrape::{info_time, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let start_time = Local::now();
    let config = Config::from(Args::parse());
    config.validate()?;

    let client = PushshiftClient::new(config.base_url.clone(), config.timeout)?;
    process_targets(&config, &client).await?;
    info_time!(start_time, "Full program time:");

    Ok(())
}
