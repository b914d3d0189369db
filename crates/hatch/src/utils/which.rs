use std::path::{Path, PathBuf};

/// Locate `program` the way a shell would: paths containing a separator are
/// checked as-is, bare names are searched on `PATH`.
#[must_use]
pub(crate) fn which(program: &str) -> Option<PathBuf> {
  let program = program.trim();
  if program.is_empty() {
    return None;
  }
  if program.contains(std::path::MAIN_SEPARATOR) {
    let candidate = PathBuf::from(program);
    return is_executable(&candidate).then_some(candidate);
  }
  let paths = std::env::var_os("PATH")?;
  std::env::split_paths(&paths)
    .map(|dir| dir.join(program))
    .find(|candidate| is_executable(candidate))
}

/// True for regular files with at least one execute bit set.
#[must_use]
pub(crate) fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt as _;
  std::fs::metadata(path)
    .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}
