use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::config::HatchConfig;
use crate::console::tty::StdConsole;
use crate::console::{Attacher, SessionConfig};
use crate::display::ConsoleDisplay;
use crate::engine::{EngineHost, EngineProvider};

#[derive(Debug, Clone, Args)]
pub struct ConsoleArgs {
  /// Name or id of the running container
  pub target: String,
  /// Interpreter to start (defaults to the configured shell)
  #[arg(long)]
  pub shell: Option<String>,
  /// Directory to change into before the shell starts
  #[arg(long, value_name = "DIR")]
  pub cwd: Option<String>,
  /// Run a single command instead of an interactive shell
  #[arg(short = 'c', long)]
  pub command: Option<String>,
  /// Developer session: show the development banner
  #[arg(long)]
  pub dev: bool,
  /// Address to show in the developer banner
  #[arg(long, value_name = "ADDR")]
  pub peer: Option<String>,
  /// Container engine CLI (docker, podman, ...)
  #[arg(long, value_name = "PROGRAM")]
  pub engine: Option<String>,
  /// Account to run the session as
  #[arg(long)]
  pub user: Option<String>,
}

/// Combine CLI flags with the loaded config. Flags win.
#[must_use]
pub fn session_config(cfg: &HatchConfig, args: &ConsoleArgs) -> SessionConfig {
  SessionConfig {
    shell: args.shell.clone().unwrap_or_else(|| cfg.shell()),
    working_directory: args.cwd.clone(),
    command: args.command.clone(),
    interactive: args.dev,
    peer_address: args.peer.clone().or_else(|| cfg.peer_address.clone()),
  }
}

pub fn run(cfg: &HatchConfig, args: &ConsoleArgs) -> Result<()> {
  let program = args.engine.clone().unwrap_or_else(|| cfg.engine_program());
  let user = args.user.clone().unwrap_or_else(|| cfg.engine_user());
  let session = session_config(cfg, args);

  let attacher = Attacher::new(
    Arc::new(EngineHost::new(program.clone())),
    Arc::new(EngineProvider::new(program)),
    Arc::new(ConsoleDisplay::new(args.target.clone())),
    Arc::new(StdConsole),
    user,
  );
  attacher.attach(&args.target, &session)
}
