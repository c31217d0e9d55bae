//! jsonnet-playground
//!
//! HTTP server for saving, sharing and evaluating Jsonnet snippets

use clap::Parser;
use playground_core::logging_facility;
use playground_server::{server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = Config::parse();
    logging_facility::init(config.log_format.profile());
    tracing::info!(?config, "starting jsonnet-playground");

    if let Err(err) = server::run(config).await {
        let chain = format!("{:#}", err);
        tracing::error!(error = %chain, "failed to run");
        return Err(err);
    }
    Ok(())
}
