use std::path::PathBuf;
use std::process::{Command as ProcCommand, Stdio};
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};

use crate::host::Provider;
use crate::utils::which::which;

/// Checks that the container engine CLI exists and answers.
///
/// The check runs once per provider; later calls reuse the first success.
pub struct EngineProvider {
  program: String,
  ready: OnceLock<PathBuf>,
}

impl EngineProvider {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ready: OnceLock::new(),
    }
  }

  fn probe(&self) -> Result<PathBuf> {
    let Some(path) = which(&self.program) else {
      bail!("container engine `{}` not found on PATH", self.program);
    };
    let status = ProcCommand::new(&path)
      .arg("version")
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .with_context(|| format!("failed to run {}", path.display()))?;
    if !status.success() {
      bail!("container engine `{}` is not responding ({status})", self.program);
    }
    log::debug!("container engine ready at {}", path.display());
    Ok(path)
  }
}

impl Provider for EngineProvider {
  fn init(&self) -> Result<()> {
    if self.ready.get().is_some() {
      return Ok(());
    }
    let path = self.probe()?;
    let _ = self.ready.set(path);
    Ok(())
  }
}
