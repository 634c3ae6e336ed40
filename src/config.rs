use std::{path::PathBuf, time::Duration};

use color_eyre::eyre::Result;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::utils::{PROJECT_NAME, get_config_dir};

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
  /// Items requested per page when listing.
  pub page_length: usize,
  pub sync_interval_secs: u64,
  pub default_site: String,
  /// Site fixture used instead of a live site.
  #[serde(default)]
  pub fixture: Option<PathBuf>,
}

impl Config {
  pub fn new() -> Result<Self, config::ConfigError> {
    let config_dir = get_config_dir();
    let mut builder =
      config::Config::builder().add_source(config::File::from_str(CONFIG, config::FileFormat::Json5));

    let config_files = [
      ("config.json5", config::FileFormat::Json5),
      ("config.json", config::FileFormat::Json),
      ("config.yaml", config::FileFormat::Yaml),
      ("config.toml", config::FileFormat::Toml),
      ("config.ini", config::FileFormat::Ini),
    ];
    let mut found_config = false;
    for (file, format) in &config_files {
      builder = builder.add_source(config::File::from(config_dir.join(file)).format(*format).required(false));
      if config_dir.join(file).exists() {
        found_config = true
      }
    }
    if !found_config {
      debug!("No configuration file found in {}, using defaults", config_dir.display());
    }

    // E.g. `COURSEKIT_PAGE_LENGTH=50` sets `page_length`.
    builder = builder.add_source(config::Environment::with_prefix(&PROJECT_NAME).try_parsing(true));

    let cfg: Self = builder.build()?.try_deserialize()?;
    if cfg.page_length == 0 {
      warn!("A page length of 0 loads everything in one page");
    }
    Ok(cfg)
  }

  /// `None` when every item should come in a single page.
  pub fn page_length(&self) -> Option<usize> {
    (self.page_length > 0).then_some(self.page_length)
  }

  pub fn sync_interval(&self) -> Duration {
    Duration::from_secs(self.sync_interval_secs)
  }
}
