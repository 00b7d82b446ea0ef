//! Configuration types for filebrowser

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf};
use utoipa::ToSchema;

/// Environment variable naming the root directory of all file operations
pub const ENV_BASE_PATH: &str = "BASEPATH";
/// Environment variable overriding the API bind address
pub const ENV_BIND: &str = "FILEBROWSER_BIND";
/// Environment variable naming the directory of the bundled web client
pub const ENV_STATIC_DIR: &str = "FILEBROWSER_STATIC";
/// Environment variable naming a JSON config file loaded before the overrides
pub const ENV_CONFIG_FILE: &str = "FILEBROWSER_CONFIG";

/// Main configuration for [`FileManager`](crate::FileManager)
///
/// Every field has a default, so an empty JSON object is a valid config.
/// The `server` sub-config is flattened to keep `api` at the top level.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Root directory of all file operations (default: ".")
    ///
    /// Client paths are resolved below this directory and can never escape it.
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Directory holding the web client, served at `/react-filemanager`
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Batch operation settings
    #[serde(default)]
    pub operations: OperationsConfig,

    /// Broadcast hub settings
    #[serde(default)]
    pub hub: HubConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            static_dir: None,
            operations: OperationsConfig::default(),
            hub: HubConfig::default(),
            server: ServerIntegrationConfig::default(),
        }
    }
}

impl Config {
    /// Build a config from the process environment.
    ///
    /// When `FILEBROWSER_CONFIG` is set the JSON file it names is loaded
    /// first; `BASEPATH`, `FILEBROWSER_BIND` and `FILEBROWSER_STATIC` then
    /// override the corresponding fields. The result is validated.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(&PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(base) = lookup(ENV_BASE_PATH).filter(|v| !v.is_empty()) {
            config.base_path = PathBuf::from(base);
        }
        if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.is_empty()) {
            config.server.api.bind_address = bind.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address '{bind}': {e}"),
                key: Some(ENV_BIND.to_string()),
            })?;
        }
        if let Some(dir) = lookup(ENV_STATIC_DIR).filter(|v| !v.is_empty()) {
            config.static_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {e}", path.display()),
            key: Some(ENV_CONFIG_FILE.to_string()),
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {e}", path.display()),
            key: Some(ENV_CONFIG_FILE.to_string()),
        })
    }

    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.operations.max_concurrent == 0 {
            return Err(Error::Config {
                message: "max_concurrent must be at least 1".to_string(),
                key: Some("operations.max_concurrent".to_string()),
            });
        }
        if self.hub.subscriber_buffer == 0 {
            return Err(Error::Config {
                message: "subscriber_buffer must be at least 1".to_string(),
                key: Some("hub.subscriber_buffer".to_string()),
            });
        }
        Ok(())
    }
}

/// Batch operation settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OperationsConfig {
    /// Maximum number of single-item operations running at once, across
    /// all batches (default: 16)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Broadcast hub settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HubConfig {
    /// Messages buffered per subscriber before it is dropped (default: 256)
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Largest accepted upload request body in bytes (default: 1 GiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_concurrent() -> usize {
    16
}

fn default_subscriber_buffer() -> usize {
    256
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024 * 1024
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
