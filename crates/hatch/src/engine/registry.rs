use std::collections::HashMap;

use anyhow::{Result, anyhow};
use portable_pty::{MasterPty, PtySize};

/// Terminal-backed sessions opened by one [`super::EngineHost`], keyed by id.
pub struct SessionRegistry {
  next_session_id: u64,
  terminals: HashMap<String, Box<dyn MasterPty + Send>>,
}

impl Default for SessionRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl SessionRegistry {
  #[must_use]
  pub fn new() -> Self {
    Self {
      next_session_id: 1,
      terminals: HashMap::new(),
    }
  }

  /// Allocate an id unique within this process.
  pub fn next_id(&mut self) -> String {
    let id = format!("exec-{}-{}", std::process::id(), self.next_session_id);
    self.next_session_id += 1;
    id
  }

  pub fn insert_terminal(&mut self, id: &str, master: Box<dyn MasterPty + Send>) {
    self.terminals.insert(id.to_string(), master);
  }

  pub fn remove(&mut self, id: &str) -> bool {
    self.terminals.remove(id).is_some()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.terminals.is_empty()
  }

  pub fn resize(&self, id: &str, rows: u16, cols: u16) -> Result<()> {
    let master = self
      .terminals
      .get(id)
      .ok_or_else(|| anyhow!("no terminal for session {id}"))?;
    master.resize(PtySize {
      rows,
      cols,
      pixel_width: 0,
      pixel_height: 0,
    })
  }
}
