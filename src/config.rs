// ⚙️ Configuration
// JSON config file; every section and field has a default so an empty file works

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable the server reads the config path from
pub const CONFIG_ENV: &str = "MOMO_CONFIG";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(AppConfig::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Path from `MOMO_CONFIG`, if set
    pub fn env_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV).map(PathBuf::from)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl ServerConfig {
    fn default_host() -> String {
        "127.0.0.1".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The single static credential pair checked by the HTTP layer
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_username")]
    pub username: String,
    #[serde(default = "AuthConfig::default_password")]
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: Self::default_username(),
            password: Self::default_password(),
        }
    }
}

impl AuthConfig {
    fn default_username() -> String {
        "admin".to_string()
    }

    fn default_password() -> String {
        "password123".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DataConfig {
    /// SMS backup export (XML)
    #[serde(default = "DataConfig::default_xml_path")]
    pub xml_path: PathBuf,

    /// JSON snapshot; preferred over the XML when it exists
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Write the snapshot after parsing the XML
    #[serde(default)]
    pub cache_snapshot: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            xml_path: Self::default_xml_path(),
            snapshot_path: None,
            cache_snapshot: false,
        }
    }
}

impl DataConfig {
    fn default_xml_path() -> PathBuf {
        PathBuf::from("modified_sms_v2.xml")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtractorConfig {
    /// Markers that flag a message as financial and terminate an amount
    #[serde(default = "ExtractorConfig::default_currency_markers")]
    pub currency_markers: Vec<String>,

    /// Optional JSON rule table replacing the built-in one
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            currency_markers: Self::default_currency_markers(),
            rules_path: None,
        }
    }
}

impl ExtractorConfig {
    fn default_currency_markers() -> Vec<String> {
        vec!["RWF".to_string()]
    }
}
