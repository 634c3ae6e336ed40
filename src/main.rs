use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;

use crate::{
  app::App,
  cli::Cli,
  config::Config,
  remote::FixtureSite,
  utils::{initialize_logging, initialize_panic_handler},
};

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod items;
pub mod remote;
pub mod sync;
pub mod utils;

async fn tokio_main() -> Result<()> {
  initialize_logging()?;
  initialize_panic_handler()?;

  let cli = Cli::parse();
  let config = Config::new()?;

  let Some(fixture) = cli.fixture.clone().or_else(|| config.fixture.clone()) else {
    eprintln!("Error: no site fixture given, pass --fixture or set `fixture` in the config file.");
    std::process::exit(2);
  };
  let site = FixtureSite::from_file(&fixture).await?;
  info!("Running {:?}", cli.command);

  App::new(config, site).run(cli.command).await
}

#[tokio::main]
async fn main() -> Result<()> {
  if let Err(e) = tokio_main().await {
    eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
    Err(e)
  } else {
    Ok(())
  }
}
