use crate::host::{Banner, Display};
use crate::log_info;
use crate::utils::log::t;

/// Prints banners through the user-facing log macros.
#[derive(Debug, Clone)]
pub struct ConsoleDisplay {
  target: String,
}

impl ConsoleDisplay {
  pub fn new(target: impl Into<String>) -> Self {
    Self {
      target: target.into(),
    }
  }
}

impl Display for ConsoleDisplay {
  fn banner(&self, banner: Banner<'_>) {
    match banner {
      Banner::Developer { peer_address } => {
        log_info!("Connected to development container {}", t::target(&self.target));
        if let Some(peer) = peer_address {
          log_info!("Services in this container are reachable at {}", t::addr(peer));
        }
      }
      Banner::Generic => {
        log_info!("Connected to local container {}", t::target(&self.target));
      }
    }
    log_info!("The session ends when the remote shell exits.");
  }
}
