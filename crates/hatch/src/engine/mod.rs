//! Container engine adapter.
//!
//! Sessions are opened by running the engine's own `exec` subcommand, so the
//! exec protocol stays the engine's business. With a terminal the command runs
//! on the slave side of a local PTY whose size we control; the engine CLI
//! forwards size changes into the container. Without one, plain pipes are used.

use std::process::{Child as ProcChild, Command as ProcCommand, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;
use portable_pty::{Child as PtyChild, CommandBuilder, PtySize, native_pty_system};

use crate::console::SessionRequest;
use crate::host::{RemoteHost, RemoteSession, SessionCloser};

mod provider;
mod registry;

pub use provider::EngineProvider;
pub use registry::SessionRegistry;

/// Size of a freshly opened PTY. The attacher reports the real size right after.
const INITIAL_SIZE: PtySize = PtySize {
  rows: 24,
  cols: 80,
  pixel_width: 0,
  pixel_height: 0,
};

/// [`RemoteHost`] backed by a container engine CLI such as `docker` or `podman`.
pub struct EngineHost {
  program: String,
  registry: Arc<Mutex<SessionRegistry>>,
}

impl EngineHost {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      registry: Arc::new(Mutex::new(SessionRegistry::new())),
    }
  }

  fn start_terminal(&self, id: String, args: &[String]) -> Result<RemoteSession> {
    let pair = native_pty_system()
      .openpty(INITIAL_SIZE)
      .context("failed to open a local PTY")?;
    // Take both ends before spawning so a failure here leaves no child behind.
    let reader = pair
      .master
      .try_clone_reader()
      .context("failed to take PTY reader")?;
    let writer = pair.master.take_writer().context("failed to take PTY writer")?;

    let mut builder = CommandBuilder::new(&self.program);
    builder.args(args);
    if let Ok(cwd) = std::env::current_dir() {
      builder.cwd(cwd);
    }
    let child = pair
      .slave
      .spawn_command(builder)
      .with_context(|| format!("failed to spawn {}", self.program))?;
    drop(pair.slave);

    self.registry.lock().insert_terminal(&id, pair.master);
    log::debug!("session {id}: {} {:?} on a PTY", self.program, args);

    let closer = PtyCloser {
      id: id.clone(),
      registry: Arc::clone(&self.registry),
      child,
    };
    Ok(RemoteSession::new(id, reader, writer, Box::new(closer)))
  }

  fn start_piped(&self, id: String, args: &[String]) -> Result<RemoteSession> {
    let mut child = ProcCommand::new(&self.program)
      .args(args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()
      .with_context(|| format!("failed to spawn {}", self.program))?;
    let reader = child
      .stdout
      .take()
      .ok_or_else(|| anyhow!("child stdout is not piped"))?;
    let writer = child
      .stdin
      .take()
      .ok_or_else(|| anyhow!("child stdin is not piped"))?;
    log::debug!("session {id}: {} {:?} over pipes", self.program, args);
    Ok(RemoteSession::new(
      id,
      Box::new(reader),
      Box::new(writer),
      Box::new(PipeCloser { child }),
    ))
  }
}

impl RemoteHost for EngineHost {
  fn start_session(&self, request: &SessionRequest) -> Result<RemoteSession> {
    let args = exec_args(request);
    let id = self.registry.lock().next_id();
    if request.tty() {
      self.start_terminal(id, &args)
    } else {
      self.start_piped(id, &args)
    }
  }

  fn resize(&self, session_id: &str, rows: u16, cols: u16) -> Result<()> {
    self.registry.lock().resize(session_id, rows, cols)
  }
}

/// Arguments for `<engine> exec ...`.
#[must_use]
pub fn exec_args(request: &SessionRequest) -> Vec<String> {
  let mut args = vec!["exec".to_string()];
  if request.stdin() {
    args.push("-i".to_string());
  }
  if request.tty() {
    args.push("-t".to_string());
  }
  args.push("-u".to_string());
  args.push(request.user().to_string());
  args.push(request.target().to_string());
  args.extend(request.command().iter().cloned());
  args
}

struct PtyCloser {
  id: String,
  registry: Arc<Mutex<SessionRegistry>>,
  child: Box<dyn PtyChild + Send + Sync>,
}

impl SessionCloser for PtyCloser {
  fn close(&mut self) -> Result<()> {
    self.registry.lock().remove(&self.id);
    match self.child.try_wait()? {
      Some(status) => log::debug!("session {} exited: {status:?}", self.id),
      None => {
        self.child.kill().ok();
        let status = self.child.wait()?;
        log::debug!("session {} stopped: {status:?}", self.id);
      }
    }
    Ok(())
  }
}

struct PipeCloser {
  child: ProcChild,
}

impl SessionCloser for PipeCloser {
  fn close(&mut self) -> Result<()> {
    if self.child.try_wait()?.is_none() {
      self.child.kill().ok();
    }
    let status = self.child.wait()?;
    log::debug!("engine exec exited: {status}");
    Ok(())
  }
}
