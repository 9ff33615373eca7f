use bitkub_port_avg::*;

use anyhow::Result;
use clap::Parser;
use client::BitkubClient;
use config::{Args, Config};
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    config::load_env()?;

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = Config::from_env(&args)?;

    info!("🚀 Starting Bitkub cost-basis report");
    info!("🪙 Tokens: {}", config.tokens.join(", "));
    if let Some(start) = config.start_timestamp {
        info!("⏱️ Fills since {}", start);
    }

    // ===============================
    // API CLIENT
    // ===============================
    let client = BitkubClient::new(
        &config.bitkub.base_url,
        config.bitkub.api_key.clone(),
        config.bitkub.api_secret.clone(),
    )?;

    // ===============================
    // ONE TOKEN AT A TIME
    // ===============================
    run::run(&client, &config).await
}
