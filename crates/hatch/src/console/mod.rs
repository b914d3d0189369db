//! Interactive console sessions into a running target.
//!
//! [`Attacher::attach`] ties the pieces together:
//! - resolves the command and asks the [`RemoteHost`] for an exec channel,
//! - puts the local terminal into raw mode ([`tty`]) when one is attached,
//! - keeps the remote terminal size in sync ([`resize`]),
//! - copies bytes both ways until the remote side closes ([`pump`]).
//!
//! Terminal state is restored by drop guards, so every exit path (including
//! `?` returns) unwinds it before the session is closed.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::host::{Banner, Display, Provider, RemoteHost, SessionParts};

pub mod pump;
mod request;
pub mod resize;
pub mod tty;

#[cfg(test)]
pub(crate) mod testing;

pub use request::{SessionConfig, SessionRequest, resolve_command};
use resize::{ResizeReporter, ResizeWatcher};
use tty::{LocalConsole, RawModeGuard, StdStream};

/// Orchestrates one console session against injected collaborators.
pub struct Attacher<C: LocalConsole> {
  host: Arc<dyn RemoteHost>,
  provider: Arc<dyn Provider>,
  display: Arc<dyn Display>,
  console: Arc<C>,
  user: String,
}

impl<C: LocalConsole> Attacher<C> {
  pub fn new(
    host: Arc<dyn RemoteHost>,
    provider: Arc<dyn Provider>,
    display: Arc<dyn Display>,
    console: Arc<C>,
    user: impl Into<String>,
  ) -> Self {
    Self {
      host,
      provider,
      display,
      console,
      user: user.into(),
    }
  }

  /// Attach to `target` and block until the remote side ends the session.
  ///
  /// A clean remote exit is `Ok`. Setup failures and broken streams are
  /// returned after the local terminal has been restored.
  pub fn attach(&self, target: &str, config: &SessionConfig) -> Result<()> {
    self
      .provider
      .init()
      .context("container provider is not ready")?;

    self.display.banner(banner_for(config));

    let tty = self.console.is_terminal();
    let request = SessionRequest::new(target, &self.user, config, tty);
    log::debug!(
      "starting session in {target} as {}: {:?} (tty={tty})",
      request.user(),
      request.command()
    );
    let session = self
      .host
      .start_session(&request)
      .with_context(|| format!("failed to start a session in {target}"))?;
    let SessionParts {
      id,
      reader,
      writer,
      close,
    } = session.into_parts();

    let (input_guard, output_guard) = if tty {
      (
        RawModeGuard::try_acquire(&*self.console, StdStream::Input),
        RawModeGuard::try_acquire(&*self.console, StdStream::Output),
      )
    } else {
      (None, None)
    };
    let watcher = if tty { self.watch_resizes(&id) } else { None };

    let copied = pump::pump(reader, writer, self.console.input(), self.console.output())
      .with_context(|| format!("session {id} in {target} failed"))?;
    log::debug!("session {id} ended after {copied} bytes of output");

    drop(watcher);
    drop(output_guard);
    drop(input_guard);
    close.close()
  }

  /// Subscribe to window changes, send the initial size, then keep reporting
  /// in the background. Resize trouble is logged and never ends the session.
  fn watch_resizes(&self, session_id: &str) -> Option<ResizeWatcher> {
    let changes = self
      .console
      .window_changes()
      .inspect_err(|err| log::warn!("{err:#}; remote size will not follow local resizes"))
      .ok();
    let reporter = ResizeReporter::new(
      Arc::clone(&self.host),
      Arc::clone(&self.console),
      session_id,
    );
    if let Err(err) = reporter.report() {
      log::warn!("initial resize failed: {err:#}");
    }
    ResizeWatcher::spawn(changes?, reporter)
      .inspect_err(|err| log::warn!("{err:#}"))
      .ok()
  }
}

fn banner_for(config: &SessionConfig) -> Banner<'_> {
  if config.interactive {
    Banner::Developer {
      peer_address: config.peer_address(),
    }
  } else {
    Banner::Generic
  }
}
