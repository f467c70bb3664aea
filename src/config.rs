use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::SyncOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub remote: RemoteConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Base URL of the remote service, e.g. `https://project.supabase.co`
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Deadline for the first load, in seconds
  pub initial_timeout_secs: u64,
  /// Deadline for refreshes and single-set reads, in seconds
  pub refresh_timeout_secs: u64,
  /// How often to check that the remote is reachable; 0 disables it
  pub heartbeat_interval_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      initial_timeout_secs: 10,
      refresh_timeout_secs: 5,
      heartbeat_interval_secs: 30,
    }
  }
}

impl SyncConfig {
  pub fn options(&self) -> SyncOptions {
    SyncOptions {
      initial_timeout: Duration::from_secs(self.initial_timeout_secs),
      refresh_timeout: Duration::from_secs(self.refresh_timeout_secs),
    }
  }

  pub fn heartbeat_interval(&self) -> Option<Duration> {
    (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Keep the offline cache on disk; when false it only lives for the process
  pub enabled: bool,
  /// Override for the cache database location
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./flashdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/flashdeck/config.yaml
  ///
  /// With no file, FLASHDECK_REMOTE_URL alone is accepted.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Self::from_env().ok_or_else(|| {
        eyre!(
          "No configuration found. Create ~/.config/flashdeck/config.yaml\n\
           or set FLASHDECK_REMOTE_URL."
        )
      }),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("flashdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("flashdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn from_env() -> Option<Self> {
    let url = std::env::var("FLASHDECK_REMOTE_URL").ok()?;
    Some(Self {
      remote: RemoteConfig { url },
      sync: SyncConfig::default(),
      cache: CacheConfig::default(),
    })
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the remote access key from environment variables.
  ///
  /// Checks FLASHDECK_REMOTE_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_access_key() -> Result<String> {
    std::env::var("FLASHDECK_REMOTE_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!("Remote access key not found. Set FLASHDECK_REMOTE_KEY or SUPABASE_ANON_KEY.")
      })
  }
}
