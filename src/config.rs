use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// User preferences persisted to `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub theme_name: Option<String>,
  /// Base URL of the search backend, e.g. `http://127.0.0.1:8000/api`.
  pub backend_url: Option<String>,
  /// Grace period before an "unstarted" video is skipped.
  pub skip_grace_ms: Option<u64>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "shortfeed") {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(&config_file) {
        match Self::parse(&content) {
          Some(config) => return config,
          None => warn!(path = %config_file.display(), "config: ignoring malformed prefs.toml"),
        }
      }
    }
    Self::default()
  }

  fn parse(content: &str) -> Option<Self> {
    toml::from_str(content).ok()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "shortfeed") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self)
          && let Err(e) = std::fs::write(&config_file, content)
        {
          warn!(err = %e, "config: failed to write prefs.toml");
        }
      }
    }
  }
}
