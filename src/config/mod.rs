use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

// Default configuration values
const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Main configuration struct for the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote service configuration
    pub api: ApiConfig,
    /// Durable storage configuration
    pub storage: StorageConfig,
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the note service
    #[serde(default = "default_api_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted session
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

// Default functions
fn default_api_url() -> String {
    std::env::var("NOTELING_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

fn default_request_timeout() -> u64 {
    std::env::var("NOTELING_REQUEST_TIMEOUT")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS)
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOTELING_DATA_DIR") {
        return PathBuf::from(dir);
    }
    match dirs_next::data_dir() {
        Some(dir) => dir.join("noteling"),
        None => PathBuf::from("."),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Manages configuration for the application
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub async fn new() -> Result<Self> {
        let config_path = get_config_path()?;
        let config = load_or_create_config(&config_path).await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a clone of the current configuration
    pub async fn get_config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Update the configuration
    pub async fn update_config(&self, new_config: Config) -> Result<()> {
        *self.config.write().await = new_config.clone();
        save_config(&self.config_path, &new_config).await?;
        Ok(())
    }

    /// Path of the backing config file
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Load the application configuration
pub async fn load_config() -> Result<Config> {
    let config_manager = ConfigManager::new().await?;
    Ok(config_manager.get_config().await)
}

/// Get the path to the configuration file
fn get_config_path() -> Result<PathBuf> {
    // Check for explicit config path from environment
    if let Ok(path) = std::env::var("NOTELING_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    if let Some(user_config_dir) = dirs_next::config_dir() {
        let config_dir = user_config_dir.join("noteling");
        std::fs::create_dir_all(&config_dir)?;
        return Ok(config_dir.join("config.json"));
    }

    // Fallback to current directory
    Ok(PathBuf::from("config.json"))
}

/// Load configuration from file or create default
async fn load_or_create_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let default_config = Config::default();
        save_config(path, &default_config).await?;
        info!("Created default configuration at {}", path.display());
        return Ok(default_config);
    }

    let config_str = fs::read_to_string(path).await?;
    let config: Config = serde_json::from_str(&config_str)?;
    debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

/// Save configuration to file
async fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(path, config_str).await?;
    debug!("Saved configuration to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{ "api": {}, "storage": {} }"#).unwrap();
        assert_eq!(config.api.request_timeout_seconds, default_request_timeout());
        assert!(!config.api.base_url.is_empty());
    }

    #[tokio::test]
    async fn load_or_create_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let created = load_or_create_config(&path).await.unwrap();
        assert!(path.exists());

        let mut changed = created.clone();
        changed.api.base_url = "http://elsewhere:9999".to_string();
        save_config(&path, &changed).await.unwrap();

        let reloaded = load_or_create_config(&path).await.unwrap();
        assert_eq!(reloaded.api.base_url, "http://elsewhere:9999");
    }
}
