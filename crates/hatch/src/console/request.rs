use crate::config::DEFAULT_SHELL;
use crate::log_warn;
use crate::utils::log::t;

/// Per-invocation options for a console session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
  /// Interpreter used for the session. Empty means [`DEFAULT_SHELL`].
  pub shell: String,
  /// Directory to `cd` into before the shell starts.
  pub working_directory: Option<String>,
  /// One-shot command run instead of an interactive shell.
  pub command: Option<String>,
  /// Developer-facing session (changes the banner only).
  pub interactive: bool,
  /// Address shown to the user in developer banners.
  pub peer_address: Option<String>,
}

impl SessionConfig {
  #[must_use]
  pub fn shell(&self) -> &str {
    let shell = self.shell.trim();
    if shell.is_empty() { DEFAULT_SHELL } else { shell }
  }

  #[must_use]
  pub fn working_directory(&self) -> Option<&str> {
    non_empty(self.working_directory.as_deref())
  }

  #[must_use]
  pub fn command(&self) -> Option<&str> {
    non_empty(self.command.as_deref())
  }

  #[must_use]
  pub fn peer_address(&self) -> Option<&str> {
    non_empty(self.peer_address.as_deref())
  }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.filter(|v| !v.trim().is_empty())
}

/// Build the argv executed in the target.
///
/// Precedence: a working directory wins over a one-shot command when both are set.
#[must_use]
pub fn resolve_command(config: &SessionConfig) -> Vec<String> {
  let shell = config.shell().to_string();
  if let Some(dir) = config.working_directory() {
    if let Some(command) = config.command() {
      log_warn!("Ignoring command {}: a working directory was given", t::cmd(command));
    }
    let script = format!("cd {dir}; exec \"{shell}\"");
    return vec![shell, "-c".to_string(), script];
  }
  if let Some(command) = config.command() {
    return vec![shell, "-c".to_string(), command.to_string()];
  }
  vec![shell]
}

/// Everything the remote host needs to open an exec channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
  target: String,
  user: String,
  command: Vec<String>,
  stdin: bool,
  stdout: bool,
  stderr: bool,
  tty: bool,
}

impl SessionRequest {
  /// All three standard streams are always enabled.
  #[must_use]
  pub fn new(target: &str, user: &str, config: &SessionConfig, tty: bool) -> Self {
    Self {
      target: target.to_string(),
      user: user.to_string(),
      command: resolve_command(config),
      stdin: true,
      stdout: true,
      stderr: true,
      tty,
    }
  }

  #[must_use]
  pub fn target(&self) -> &str {
    &self.target
  }

  #[must_use]
  pub fn user(&self) -> &str {
    &self.user
  }

  /// Never empty; the first element is the interpreter.
  #[must_use]
  pub fn command(&self) -> &[String] {
    &self.command
  }

  #[must_use]
  pub fn stdin(&self) -> bool {
    self.stdin
  }

  #[must_use]
  pub fn stdout(&self) -> bool {
    self.stdout
  }

  #[must_use]
  pub fn stderr(&self) -> bool {
    self.stderr
  }

  #[must_use]
  pub fn tty(&self) -> bool {
    self.tty
  }
}
