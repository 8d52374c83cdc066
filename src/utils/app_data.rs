use crate::index::EmptyUploadPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "locix";
const CONFIG_FILE: &str = "config.json";
const DAEMON_LOG_FILE: &str = "locixd.log";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// What an upload without any valid platform does to the live index
    #[serde(default)]
    pub empty_upload: EmptyUploadPolicy,

    /// Socket the daemon listens on. If None, a per-user runtime path is used
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Largest upload file the daemon accepts
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// `tracing` filter directive used when `LOCIX_LOG` is unset
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_max_upload_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            empty_upload: EmptyUploadPolicy::default(),
            socket_path: None,
            max_upload_bytes: default_max_upload_bytes(),
            log_filter: None,
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Load config from `path`, or return default if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Write config to `path` as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the log file a daemonized server writes to
pub fn get_daemon_log_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(DAEMON_LOG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}
