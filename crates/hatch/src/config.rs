use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;
use serde::Deserialize;
use toml::Value as TomlValue;

/// Interpreter used when neither the CLI nor any config file names one.
pub const DEFAULT_SHELL: &str = "bash";

/// Engine CLI used when nothing else is configured.
pub const DEFAULT_ENGINE: &str = "docker";

/// Service account sessions run as when nothing else is configured.
pub const DEFAULT_USER: &str = "app";

/// Overrides `engine.program` from every config file.
pub const ENGINE_ENV: &str = "HATCH_ENGINE";

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["shell", "peer_address", "engine"];

const KNOWN_ENGINE_KEYS: &[&str] = &["program", "user"];

const PROJECT_CONFIG: &str = ".hatch.toml";

const DEFAULT_TOML: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/defaults/hatch.toml"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
  #[serde(default)]
  pub program: Option<String>,
  #[serde(default)]
  pub user: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HatchConfig {
  /// Default interpreter for console sessions.
  #[serde(default)]
  pub shell: Option<String>,
  /// Address shown in developer banners.
  #[serde(default)]
  pub peer_address: Option<String>,
  #[serde(default)]
  pub engine: Option<EngineConfig>,
}

impl HatchConfig {
  #[must_use]
  pub fn shell(&self) -> String {
    non_empty(self.shell.as_deref()).unwrap_or(DEFAULT_SHELL).to_string()
  }

  /// Engine CLI with precedence: `$HATCH_ENGINE` -> `engine.program` -> `docker`.
  #[must_use]
  pub fn engine_program(&self) -> String {
    if let Ok(program) = std::env::var(ENGINE_ENV)
      && !program.trim().is_empty()
    {
      return program;
    }
    non_empty(self.engine.as_ref().and_then(|e| e.program.as_deref()))
      .unwrap_or(DEFAULT_ENGINE)
      .to_string()
  }

  #[must_use]
  pub fn engine_user(&self) -> String {
    non_empty(self.engine.as_ref().and_then(|e| e.user.as_deref()))
      .unwrap_or(DEFAULT_USER)
      .to_string()
  }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

/// Tables merge recursively; arrays and scalars are replaced.
fn merge_values(base: &mut TomlValue, overlay: TomlValue) {
  match (base, overlay) {
    (TomlValue::Table(base_tbl), TomlValue::Table(overlay_tbl)) => {
      for (key, value) in overlay_tbl {
        match base_tbl.get_mut(&key) {
          Some(existing) => merge_values(existing, value),
          None => {
            base_tbl.insert(key, value);
          }
        }
      }
    }
    (base_slot, value) => *base_slot = value,
  }
}

/// Print a warning for every key we do not understand. Unknown keys are
/// ignored, not rejected.
fn warn_unknown_keys(val: &TomlValue, file_path: &Path) {
  let TomlValue::Table(table) = val else {
    return;
  };

  for key in table.keys() {
    if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
      eprintln!(
        "{}: unknown config key '{}' in {} (known keys: {})",
        "warning".yellow(),
        key,
        file_path.display(),
        KNOWN_TOP_LEVEL_KEYS.join(", ")
      );
    }
  }

  if let Some(TomlValue::Table(engine)) = table.get("engine") {
    for key in engine.keys() {
      if !KNOWN_ENGINE_KEYS.contains(&key.as_str()) {
        eprintln!(
          "{}: unknown config key 'engine.{}' in {} (known keys: {})",
          "warning".yellow(),
          key,
          file_path.display(),
          KNOWN_ENGINE_KEYS.join(", ")
        );
      }
    }
  }
}

fn merge_file(merged: &mut TomlValue, path: &Path) -> Result<()> {
  let data =
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  let val: TomlValue =
    toml::from_str(&data).with_context(|| format!("invalid TOML in {}", path.display()))?;
  warn_unknown_keys(&val, path);
  merge_values(merged, val);
  log::debug!("merged config from {}", path.display());
  Ok(())
}

/// Load embedded defaults, then the global XDG file, then `<cwd>/.hatch.toml`.
///
/// # Errors
/// Returns an error if a config file exists but cannot be read or parsed.
pub fn load_config(cwd: &Path) -> Result<HatchConfig> {
  let mut merged: TomlValue =
    toml::from_str(DEFAULT_TOML).context("invalid embedded default config")?;

  let xdg = xdg::BaseDirectories::with_prefix("hatch");
  if let Some(global_path) = xdg.find_config_file("hatch.toml") {
    merge_file(&mut merged, &global_path)?;
  }

  let project_path = cwd.join(PROJECT_CONFIG);
  if project_path.exists() {
    merge_file(&mut merged, &project_path)?;
  }

  let merged_str = toml::to_string(&merged).context("failed to serialize merged config")?;
  let cfg: HatchConfig = toml::from_str(&merged_str).context("failed to parse merged config")?;
  Ok(cfg)
}
