use crate::PHANTOM_IPC_DEFAULT_URL;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding [`IpcSettings::url`].
pub const IPC_URL_ENV_VAR: &str = "PHANTOM_IPC_URL";
const IPC_URL_OVERRIDE_FIELD: &str =
    const_format::concatcp!("ipc.url (from ", IPC_URL_ENV_VAR, ")");

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcSettings {
    #[serde(default = "default_ipc_url")]
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on the total time spent retrying the first connection.
    #[serde(default = "default_connect_attempts_max_secs")]
    pub connect_attempts_max_secs: u64,
}

impl Default for IpcSettings {
    fn default() -> Self {
        Self {
            url: default_ipc_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_attempts_max_secs: default_connect_attempts_max_secs(),
        }
    }
}

impl IpcSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_attempts_max(&self) -> Duration {
        Duration::from_secs(self.connect_attempts_max_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub ipc: IpcSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ipc: IpcSettings::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_ipc_url() -> String {
    PHANTOM_IPC_DEFAULT_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_connect_attempts_max_secs() -> u64 {
    60
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ClientConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ClientConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::Read {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: ClientConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::Parse {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using atomic write.
    ///
    /// Uses temp file + rename so a crash never leaves a half-written file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - Validation fails
    /// - Directory creation fails
    /// - Serialization fails
    /// - Write or rename fails
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(invalid_field(
                "version",
                self.version,
                format!("supported versions are 1-{CONFIG_VERSION}"),
            ));
        }

        let url = url::Url::parse(&self.ipc.url)
            .map_err(|e| invalid_field("ipc.url", &self.ipc.url, e.to_string()))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(invalid_field(
                "ipc.url",
                &self.ipc.url,
                "the backend is reached over ws:// or wss://",
            ));
        }

        if self.ipc.request_timeout_secs == 0 {
            return Err(invalid_field(
                "ipc.request_timeout_secs",
                self.ipc.request_timeout_secs,
                "must be greater than 0",
            ));
        }

        if self.ipc.connect_attempts_max_secs == 0 {
            return Err(invalid_field(
                "ipc.connect_attempts_max_secs",
                self.ipc.connect_attempts_max_secs,
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Replace the IPC URL with `value` when it is set and non-empty.
    ///
    /// The result is validated; an invalid override is rejected and the
    /// config is left unchanged.
    pub fn apply_ipc_url_override(&mut self, value: Option<String>) -> Result<(), ConfigError> {
        let Some(url) = value.filter(|url| !url.trim().is_empty()) else {
            return Ok(());
        };

        let mut overridden = self.clone();
        overridden.ipc.url = url.trim().to_string();
        overridden.validate().map_err(|e| match e {
            ConfigError::InvalidField {
                location,
                value,
                reason,
                ..
            } => ConfigError::InvalidField {
                location,
                field: IPC_URL_OVERRIDE_FIELD,
                value,
                reason,
            },
            other => other,
        })?;

        info!(
            "IPC URL overridden by {}: {}",
            IPC_URL_ENV_VAR, overridden.ipc.url
        );
        *self = overridden;
        Ok(())
    }

    /// Apply [`IPC_URL_ENV_VAR`] from the process environment.
    pub fn apply_env_override(&mut self) -> Result<(), ConfigError> {
        self.apply_ipc_url_override(std::env::var(IPC_URL_ENV_VAR).ok())
    }
}

#[track_caller]
fn invalid_field(
    field: &'static str,
    value: impl std::fmt::Display,
    reason: impl Into<String>,
) -> ConfigError {
    ConfigError::InvalidField {
        location: ErrorLocation::from(Location::caller()),
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}
