use crate::controller::ControllerSettings;
use crate::passage::{Category, Difficulty};
use crate::quote::DEFAULT_QUOTE_URL;
use crate::source::DEFAULT_CATALOG_SHARE;
use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub difficulty: Difficulty,
    pub category: Option<Category>,
    /// `None` runs until the passage is finished
    pub time_limit_secs: Option<u32>,
    pub catalog_share: f64,
    pub quote_url: String,
    pub quote_timeout_ms: u64,
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            category: None,
            time_limit_secs: Some(60),
            catalog_share: DEFAULT_CATALOG_SHARE,
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            quote_timeout_ms: 3000,
            offline: false,
        }
    }
}

impl Config {
    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }
}

impl From<&Config> for ControllerSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            difficulty: cfg.difficulty,
            category: cfg.category,
            time_limit_secs: cfg.time_limit_secs,
            catalog_share: cfg.catalog_share,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = match ProjectDirs::from("", "", "keypace") {
            Some(pd) => pd.config_dir().join("config.json"),
            None => PathBuf::from("keypace_config.json"),
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing file means defaults; a corrupt one is logged and ignored
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("ignoring unreadable config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
