//! Runtime configuration for the maintenance jobs.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_STORE_PATH: &str = "~/.local/share/catalog/catalog.db";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Deserialised from `config.toml`, overlaid with `CATALOG_*` variables.
#[derive(Debug, Deserialize, Clone)]
pub struct MaintConfig {
  pub store_path:     PathBuf,
  /// Days a retired row is kept before the garbage collector deletes it.
  pub retention_days: u32,
}

impl MaintConfig {
  /// Load from `path` (optional) and the environment, on top of defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("store_path", DEFAULT_STORE_PATH)?
      .set_default("retention_days", i64::from(DEFAULT_RETENTION_DAYS))?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CATALOG"))
      .build()?
      .try_deserialize()
  }

  /// The store path with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
