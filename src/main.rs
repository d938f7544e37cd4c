use tracing_subscriber::EnvFilter;

mod config;
mod game;
mod protocol;
mod runtime;
mod session;
mod shared;
mod transport;

use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = AppConfig::from_env();
  tracing::info!(mode = ?config.mode, "starting slither-peer");
  runtime::run(config).await
}
