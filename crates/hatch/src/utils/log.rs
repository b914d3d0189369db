/// Token styling helpers for user-facing lines.
///
/// Keep the surrounding text neutral and highlight only the values.
pub mod t {
  use std::fmt::Display;

  use owo_colors::OwoColorize as _;

  pub fn target(value: impl Display) -> String {
    format!("{}", value.to_string().magenta())
  }

  pub fn addr(value: impl Display) -> String {
    format!("{}", value.to_string().cyan())
  }

  pub fn cmd(value: impl Display) -> String {
    format!("{}", value.to_string().blue())
  }

  pub fn warn(s: impl Display) -> String {
    format!("{}", s.to_string().yellow())
  }

  pub fn err(s: impl Display) -> String {
    format!("{}", s.to_string().red())
  }
}

// User-facing output goes through these macros. Diagnostics use the `log`
// facade instead. When a sink is registered lines are sent there instead of
// being printed, which is how tests capture them.

use crossbeam_channel::Sender;
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
  Info,
  Warn,
  Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
  pub level: LogLevel,
  /// Rendered text, ANSI styling included.
  pub ansi: String,
}

static SINK: Mutex<Option<Sender<LogLine>>> = Mutex::new(None);

pub fn set_log_sink(sender: Sender<LogLine>) {
  *SINK.lock() = Some(sender);
}

pub fn clear_log_sink() {
  *SINK.lock() = None;
}

#[doc(hidden)]
pub fn emit(level: LogLevel, text: String) {
  if let Some(tx) = SINK.lock().clone() {
    let _ = tx.send(LogLine { level, ansi: text });
    return;
  }
  match level {
    LogLevel::Info => anstream::println!("{}", text),
    LogLevel::Warn | LogLevel::Error => anstream::eprintln!("{}", text),
  }
}

#[macro_export]
macro_rules! log_info {
  ($fmt:literal $(, $args:expr )* $(,)?) => {{
    $crate::utils::log::emit(
      $crate::utils::log::LogLevel::Info,
      format!($fmt $(, $args )*)
    );
  }};
}

#[macro_export]
macro_rules! log_warn {
  ($fmt:literal $(, $args:expr )* $(,)?) => {{
    $crate::utils::log::emit(
      $crate::utils::log::LogLevel::Warn,
      $crate::utils::log::t::warn(format!($fmt $(, $args )*))
    );
  }};
}

#[macro_export]
macro_rules! log_error {
  ($fmt:literal $(, $args:expr )* $(,)?) => {{
    $crate::utils::log::emit(
      $crate::utils::log::LogLevel::Error,
      $crate::utils::log::t::err(format!($fmt $(, $args )*))
    );
  }};
}

/// Install `env_logger` for diagnostics. `RUST_LOG` overrides the default
/// `warn` filter; output goes to stderr so it never mixes with session bytes.
pub fn init_diagnostics() {
  let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
    .format_timestamp_secs()
    .target(env_logger::Target::Stderr)
    .try_init();
}
