mod api;
mod app;
mod cache;
mod client;
mod config;
mod event;
mod logging;
mod mutation;
mod pending;
mod session;
#[cfg(test)]
mod test_support;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(about = "A terminal client for a shared project and task board")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./taskboard.yaml or $XDG_CONFIG_HOME/taskboard/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the task service (overrides config and TASKBOARD_API_URL)
  #[arg(long)]
  api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  let config = config::Config::load(args.config.as_deref())?
    .with_overrides(std::env::var(config::API_URL_ENV).ok(), args.api_url);
  let base_url = config.base_url()?;
  tracing::info!(%base_url, "starting");

  let transport = api::HttpTransport::new(base_url, config.timeout())
    .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;
  let client = client::TaskboardClient::new(Arc::new(transport));

  let mut app = app::App::new(config, client);
  app.run().await?;

  Ok(())
}
