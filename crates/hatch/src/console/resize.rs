//! Keeps the remote pseudo-terminal the same size as the local one.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use signal_hook::consts::signal::SIGWINCH;
use signal_hook::iterator::{Handle, Signals};

use super::tty::{Geometry, LocalConsole};
use crate::host::RemoteHost;

/// Subscription to local window-change notifications.
///
/// Dropping it tears the subscription down: the signal iterator is closed, the
/// forwarder thread exits and the receiver disconnects.
pub struct WindowChanges {
  rx: Receiver<()>,
  handle: Option<Handle>,
}

impl WindowChanges {
  /// Subscribe to `SIGWINCH` for the current process.
  pub fn subscribe() -> Result<Self> {
    let mut signals =
      Signals::new([SIGWINCH]).context("failed to subscribe to window-change notifications")?;
    let handle = signals.handle();
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
      .name("sigwinch-forwarder".to_string())
      .spawn(move || {
        for _ in signals.forever() {
          if tx.send(()).is_err() {
            break;
          }
        }
      })
      .context("failed to spawn window-change forwarder")?;
    Ok(Self {
      rx,
      handle: Some(handle),
    })
  }

  /// Notifications delivered through a plain channel. The subscription ends
  /// when every sender is dropped.
  #[must_use]
  pub fn from_receiver(rx: Receiver<()>) -> Self {
    Self { rx, handle: None }
  }
}

impl Drop for WindowChanges {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.take() {
      handle.close();
    }
  }
}

/// Reads the local geometry and forwards it to the remote session.
pub struct ResizeReporter<C: LocalConsole> {
  host: Arc<dyn RemoteHost>,
  console: Arc<C>,
  session_id: String,
}

impl<C: LocalConsole> ResizeReporter<C> {
  pub fn new(host: Arc<dyn RemoteHost>, console: Arc<C>, session_id: impl Into<String>) -> Self {
    Self {
      host,
      console,
      session_id: session_id.into(),
    }
  }

  pub fn report(&self) -> Result<Geometry> {
    let geometry = self.console.geometry()?;
    self
      .host
      .resize(&self.session_id, geometry.rows, geometry.cols)
      .with_context(|| {
        format!(
          "failed to resize session {} to {}x{}",
          self.session_id, geometry.cols, geometry.rows
        )
      })?;
    Ok(geometry)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchState {
  Idle,
  Reporting,
}

struct Watch<C: LocalConsole> {
  reporter: ResizeReporter<C>,
  state: WatchState,
}

impl<C: LocalConsole> Watch<C> {
  fn new(reporter: ResizeReporter<C>) -> Self {
    Self {
      reporter,
      state: WatchState::Idle,
    }
  }

  fn transition(&mut self, next: WatchState) {
    log::trace!("resize watcher {:?} -> {:?}", self.state, next);
    self.state = next;
  }

  /// One report per notification until the subscription disconnects.
  fn run(&mut self, notifications: &Receiver<()>) {
    for () in notifications {
      self.transition(WatchState::Reporting);
      match self.reporter.report() {
        Ok(geometry) => log::debug!("reported size {}x{}", geometry.cols, geometry.rows),
        Err(err) => log::warn!("{err:#}"),
      }
      self.transition(WatchState::Idle);
    }
  }
}

/// Background task reporting every window change for the session's lifetime.
///
/// The thread is never joined. Dropping the watcher drops the subscription,
/// which lets the thread run to completion on its own.
pub struct ResizeWatcher {
  _changes: WindowChanges,
}

impl ResizeWatcher {
  pub fn spawn<C: LocalConsole>(changes: WindowChanges, reporter: ResizeReporter<C>) -> Result<Self> {
    let notifications = changes.rx.clone();
    let mut watch = Watch::new(reporter);
    thread::Builder::new()
      .name("resize-watcher".to_string())
      .spawn(move || watch.run(&notifications))
      .context("failed to spawn resize watcher")?;
    Ok(Self { _changes: changes })
  }
}
