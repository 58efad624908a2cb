use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the identity token file
pub const TOKEN_ENV_VAR: &str = "TASKSHELL_TOKEN";

/// Default AWS region of the task cluster
pub const DEFAULT_REGION: &str = "us-west-2";

/// Default EKS cluster name hosting task pods
pub const DEFAULT_CLUSTER_NAME: &str = "prion-prod";

/// Errors that can occur during config operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("No identity token found at {0:?}; log in first")]
    TokenNotFound(PathBuf),
}

/// Credential broker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// URL of the pod-exec-info endpoint
    pub endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://nucleus.latch.bio/sdk/pod-exec-info".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Target cluster identity used when rendering the access profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSettings {
    pub region: String,
    pub cluster_name: String,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
        }
    }
}

/// What to run inside the task container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecSettings {
    /// Command to exec
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    /// Container name (None = pod's default container)
    #[serde(default)]
    pub container: Option<String>,
}

fn default_command() -> Vec<String> {
    vec!["/bin/sh".to_string()]
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            container: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerSettings,

    #[serde(default)]
    pub cluster: ClusterSettings,

    #[serde(default)]
    pub exec: ExecSettings,

    /// Identity token file (None = ~/.latch/token)
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        Ok(dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join("taskshell"))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path, falling back to defaults
    /// when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve the identity token file path
    pub fn token_file(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.token_path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(home.join(".latch").join("token"))
    }

    /// Read the caller's identity token.
    ///
    /// `TASKSHELL_TOKEN` wins over the token file.
    pub fn identity_token(&self) -> Result<String, ConfigError> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }

        let path = self.token_file()?;
        if !path.exists() {
            return Err(ConfigError::TokenNotFound(path));
        }
        let token = fs::read_to_string(&path)?.trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::TokenNotFound(path));
        }
        Ok(token)
    }
}
