//! Collaborator seams consumed by the console attacher.
//!
//! The attacher never talks to a container engine, a provider or the screen
//! directly. It goes through these traits so the engine-backed implementations
//! in [`crate::engine`] and [`crate::display`] can be swapped for fakes.

use std::fmt;
use std::io::{Read, Write};

use anyhow::Result;

use crate::console::SessionRequest;

/// Something that can open exec channels into a running target and resize them.
pub trait RemoteHost: Send + Sync {
  /// Establish an exec channel for `request`.
  fn start_session(&self, request: &SessionRequest) -> Result<RemoteSession>;

  /// Report a new terminal size for the session identified by `session_id`.
  fn resize(&self, session_id: &str, rows: u16, cols: u16) -> Result<()>;
}

/// Runtime readiness check. Must succeed before a session is requested.
pub trait Provider: Send + Sync {
  fn init(&self) -> Result<()>;
}

/// The informational banner printed once before a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner<'a> {
  /// Developer-facing session, optionally showing where the target is reachable.
  Developer { peer_address: Option<&'a str> },
  Generic,
}

/// Fire-and-forget user output.
pub trait Display: Send + Sync {
  fn banner(&self, banner: Banner<'_>);
}

/// Releases the connection behind a [`RemoteSession`].
pub trait SessionCloser: Send {
  fn close(&mut self) -> Result<()>;
}

/// A live exec channel: a read side (remote to local), a write side (local to
/// remote) and a way to close it.
pub struct RemoteSession {
  id: String,
  reader: Box<dyn Read + Send>,
  writer: Box<dyn Write + Send>,
  closer: Box<dyn SessionCloser>,
}

impl RemoteSession {
  pub fn new(
    id: impl Into<String>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    closer: Box<dyn SessionCloser>,
  ) -> Self {
    Self {
      id: id.into(),
      reader,
      writer,
      closer,
    }
  }

  #[must_use]
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Split the session so each endpoint can be handed to exactly one pump direction.
  #[must_use]
  pub fn into_parts(self) -> SessionParts {
    SessionParts {
      id: self.id,
      reader: self.reader,
      writer: self.writer,
      close: CloseOnDrop {
        closer: Some(self.closer),
      },
    }
  }
}

impl fmt::Debug for RemoteSession {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RemoteSession")
      .field("id", &self.id)
      .finish_non_exhaustive()
  }
}

/// The pieces of a [`RemoteSession`] after splitting.
pub struct SessionParts {
  pub id: String,
  pub reader: Box<dyn Read + Send>,
  pub writer: Box<dyn Write + Send>,
  pub close: CloseOnDrop,
}

/// Closes the session when dropped unless [`CloseOnDrop::close`] already did.
pub struct CloseOnDrop {
  closer: Option<Box<dyn SessionCloser>>,
}

impl CloseOnDrop {
  /// Close now and surface the error instead of logging it.
  pub fn close(mut self) -> Result<()> {
    match self.closer.take() {
      Some(mut closer) => closer.close(),
      None => Ok(()),
    }
  }
}

impl Drop for CloseOnDrop {
  fn drop(&mut self) {
    if let Some(mut closer) = self.closer.take()
      && let Err(err) = closer.close()
    {
      log::warn!("failed to close remote session: {err:#}");
    }
  }
}
