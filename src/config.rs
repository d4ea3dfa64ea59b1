//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.hypdl/config.toml`. Every
//! field has a default, so a missing file (or a missing section) is valid.
//!
//! # Examples
//!
//! ```no_run
//! use hypdl::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! println!("Manifest URL: {}", config.manifest.url);
//! println!("Languages: {}", config.download.languages.join(", "));
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Launcher endpoint that lists every game package.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://sg-hyp-api.hoyoverse.com/hyp/hyp-connect/api/getGamePackages?launcher_id=VYTpXlbWo8";

/// User configuration file (`~/.hypdl/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Manifest endpoint settings
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Transfer settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Game name index settings
    #[serde(default)]
    pub names: NamesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_url")]
    pub url: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            url: default_manifest_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ManifestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Where finished and partial files are written (current directory if unset)
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Write buffer size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Abort a transfer when no data arrives for this many seconds (0 = never)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Audio languages selected when no `--languages` flag is given
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_languages() -> Vec<String> {
    vec!["en-us".to_string()]
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            chunk_size: default_chunk_size(),
            idle_timeout_secs: default_idle_timeout_secs(),
            languages: default_languages(),
        }
    }
}

impl DownloadConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Output directory with `~` expanded
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).as_ref()),
            None => PathBuf::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamesConfig {
    /// Path to gamelist.json (config directory if unset)
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Get the config directory
    ///
    /// Uses HYPDL_CONFIG_DIR if set, otherwise ~/.hypdl
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var("HYPDL_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".hypdl"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from file, or defaults if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `HYPDL_MANIFEST_URL`: Overrides `manifest.url`
    /// - `HYPDL_CONFIG_DIR`: Overrides the config directory location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;

        let mut config = if !path.exists() {
            Self::default()
        } else {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        };

        if let Ok(url) = std::env::var("HYPDL_MANIFEST_URL") {
            if !url.is_empty() {
                config.manifest.url = url;
            }
        }

        Ok(config)
    }

    pub fn name_index_path(&self) -> Result<PathBuf> {
        match &self.names.path {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).as_ref())),
            None => Ok(Self::config_dir()?.join(crate::names::NAME_INDEX_FILE)),
        }
    }
}
