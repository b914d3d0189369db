use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commands;
pub mod config;
pub mod console;
pub mod display;
pub mod engine;
pub mod host;
pub mod utils;

use crate::commands::console::ConsoleArgs;
use crate::config::load_config;

/// hatch - attach an interactive terminal to a running container.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
  /// Open a shell (or run a command) inside a running container
  Console(ConsoleArgs),
}

pub fn parse() -> Cli {
  Cli::parse()
}

pub fn run() -> Result<()> {
  let cli = parse();
  utils::log::init_diagnostics();
  let cwd = std::env::current_dir()?;
  let cfg = load_config(&cwd)?;

  match cli.command {
    Commands::Console(args) => commands::console::run(&cfg, &args),
  }
}
