use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// User preferences persisted in `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  /// Pixabay key; the CLI flag and `PIXABAY_API_KEY` take precedence.
  pub api_key: Option<String>,
  /// Enables a simulated biometric sensor: `fingerprint`, `face` or `iris`.
  pub simulated_biometric: Option<String>,
}

impl Config {
  fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pixels").map(|dirs| dirs.config_dir().join("prefs.toml"))
  }

  pub fn load() -> Self {
    Self::default_path().map(|path| Self::load_from(&path)).unwrap_or_default()
  }

  pub fn load_from(path: &Path) -> Self {
    if let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(path) = Self::default_path() {
      self.save_to(&path);
    }
  }

  pub fn save_to(&self, path: &Path) {
    if let Some(dir) = path.parent()
      && std::fs::create_dir_all(dir).is_ok()
      && let Ok(content) = toml::to_string(self)
      && let Err(e) = std::fs::write(path, content)
    {
      tracing::warn!(path = %path.display(), err = %e, "failed to save preferences");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg").join("prefs.toml");
    let config = Config {
      theme_name: Some("Midnight".to_string()),
      api_key: Some("abc".to_string()),
      simulated_biometric: None,
    };
    config.save_to(&path);
    assert_eq!(Config::load_from(&path), config);
  }

  #[test]
  fn missing_or_invalid_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.toml");
    assert_eq!(Config::load_from(&path), Config::default());
    std::fs::write(&path, "theme_name = [").unwrap();
    assert_eq!(Config::load_from(&path), Config::default());
  }
}
