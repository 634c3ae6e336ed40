use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::version;

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
  /// Site fixture to serve data from, overriding the configured one
  #[arg(short, long, value_name = "FILE")]
  pub fixture: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// List the items of a source, page by page
  List {
    #[command(subcommand)]
    source: ListSource,

    /// Number of pages to load, everything when omitted
    #[arg(short, long)]
    pages: Option<usize>,
  },
  /// Push preferences changed while offline
  Sync {
    /// Site to sync, the configured default when omitted
    #[arg(short, long)]
    site: Option<String>,

    /// Sync every site in the fixture
    #[arg(long, conflicts_with = "site")]
    all: bool,

    /// Sync even if the last sync is recent
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
  /// Badges a user earned in a course
  Badges {
    #[arg(long)]
    course: u64,
    #[arg(long)]
    user: u64,
  },
  /// Competencies of a course
  Competencies {
    #[arg(long)]
    course: u64,
    #[arg(long)]
    user: Option<u64>,
  },
}
