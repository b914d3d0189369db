//! Local terminal access used by the console attacher.
//!
//! Raw mode is what lets keystrokes (including Ctrl-C) reach the remote shell
//! untouched. Each descriptor gets its own [`RawModeGuard`] so input and output
//! are restored independently, on every exit path.

use std::io::{self, IsTerminal, Read, Write};

use anyhow::{Context, Result};
use crossterm::terminal;
use nix::sys::termios::{self, OutputFlags, SetArg, Termios};

use super::resize::WindowChanges;

/// The local descriptors whose mode can be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdStream {
  Input,
  Output,
}

/// Terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
  pub cols: u16,
  pub rows: u16,
}

/// The local side of a console session.
///
/// The attacher is the only caller that mutates terminal mode while a session
/// runs.
pub trait LocalConsole: Send + Sync + 'static {
  /// Prior terminal state captured by [`LocalConsole::acquire_raw`].
  type Snapshot: Send;

  /// True when both standard input and standard output are terminals.
  fn is_terminal(&self) -> bool;

  /// Switch `stream` to raw mode and return the state it had before.
  fn acquire_raw(&self, stream: StdStream) -> Result<Self::Snapshot>;

  /// Put `stream` back into `snapshot`.
  fn restore(&self, stream: StdStream, snapshot: Self::Snapshot) -> Result<()>;

  /// Current size of the output terminal.
  fn geometry(&self) -> Result<Geometry>;

  /// Subscribe to window-change notifications for the output terminal.
  fn window_changes(&self) -> Result<WindowChanges>;

  fn input(&self) -> Box<dyn Read + Send>;

  fn output(&self) -> Box<dyn Write + Send>;
}

/// Keeps one descriptor in raw mode for the lifetime of the guard.
pub struct RawModeGuard<'a, C: LocalConsole> {
  console: &'a C,
  stream: StdStream,
  snapshot: Option<C::Snapshot>,
}

impl<'a, C: LocalConsole> RawModeGuard<'a, C> {
  pub fn acquire(console: &'a C, stream: StdStream) -> Result<Self> {
    let snapshot = console
      .acquire_raw(stream)
      .with_context(|| format!("failed to enable raw mode on {stream:?}"))?;
    log::debug!("raw mode enabled on {stream:?}");
    Ok(Self {
      console,
      stream,
      snapshot: Some(snapshot),
    })
  }

  /// Best-effort variant: a descriptor that does not support mode changes is
  /// logged and skipped.
  pub fn try_acquire(console: &'a C, stream: StdStream) -> Option<Self> {
    match Self::acquire(console, stream) {
      Ok(guard) => Some(guard),
      Err(err) => {
        log::warn!("{err:#}; continuing without raw mode");
        None
      }
    }
  }
}

impl<C: LocalConsole> Drop for RawModeGuard<'_, C> {
  fn drop(&mut self) {
    let Some(snapshot) = self.snapshot.take() else {
      return;
    };
    match self.console.restore(self.stream, snapshot) {
      Ok(()) => log::debug!("terminal state restored on {:?}", self.stream),
      Err(err) => log::warn!("failed to restore terminal on {:?}: {err:#}", self.stream),
    }
  }
}

/// The process's real stdin and stdout.
#[derive(Debug, Clone, Default)]
pub struct StdConsole;

impl LocalConsole for StdConsole {
  type Snapshot = Termios;

  fn is_terminal(&self) -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
  }

  fn acquire_raw(&self, stream: StdStream) -> Result<Termios> {
    match stream {
      StdStream::Input => {
        let stdin = io::stdin();
        let prior = termios::tcgetattr(&stdin)?;
        let mut raw = prior.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw)?;
        Ok(prior)
      }
      StdStream::Output => {
        let stdout = io::stdout();
        let prior = termios::tcgetattr(&stdout)?;
        let mut raw = prior.clone();
        raw.output_flags.remove(OutputFlags::OPOST);
        termios::tcsetattr(&stdout, SetArg::TCSANOW, &raw)?;
        Ok(prior)
      }
    }
  }

  fn restore(&self, stream: StdStream, snapshot: Termios) -> Result<()> {
    match stream {
      StdStream::Input => termios::tcsetattr(&io::stdin(), SetArg::TCSANOW, &snapshot)?,
      StdStream::Output => termios::tcsetattr(&io::stdout(), SetArg::TCSANOW, &snapshot)?,
    }
    Ok(())
  }

  // crossterm asks the controlling terminal (`/dev/tty`, falling back to
  // stdout). Geometry is only read once `is_terminal` holds for both streams,
  // and the controlling terminal is then the one stdout writes to.
  fn geometry(&self) -> Result<Geometry> {
    let (cols, rows) = terminal::size().context("failed to read terminal size")?;
    Ok(Geometry { cols, rows })
  }

  fn window_changes(&self) -> Result<WindowChanges> {
    WindowChanges::subscribe()
  }

  fn input(&self) -> Box<dyn Read + Send> {
    Box::new(io::stdin())
  }

  fn output(&self) -> Box<dyn Write + Send> {
    Box::new(io::stdout())
  }
}
