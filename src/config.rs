use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_URL_ENV: &str = "TASKDECK_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Where the login is kept. Defaults to the platform data directory.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            credentials_path: None,
        }
    }
}

impl Config {
    /// Environment wins over the file, an explicit flag wins over both.
    pub fn with_overrides(mut self, env_url: Option<String>, flag_url: Option<String>) -> Self {
        if let Some(url) = flag_url.or(env_url).filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        self.api_url = self.api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials_path
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("credentials.json")))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "taskdeck", "taskdeck")
}

pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

/// Read the config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read config file: {}", path.display()))?;
    let config: Config =
        serde_json::from_str(&content).context("Failed to parse taskdeck config JSON")?;
    Ok(config)
}
