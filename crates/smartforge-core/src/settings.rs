//! Connector settings, loadable from TOML.
//!
//! ```toml
//! [kv]
//! host = "127.0.0.1"
//! password = "secret"
//!
//! [column]
//! host = "cassandra"
//! keyspace = "smartforge"
//!
//! [fieldbus]
//! endpoint = "opc.tcp://plc-01:4840"
//! security = "Basic256Sha256,SignAndEncrypt,cert.der,key.pem"
//!
//! [logging]
//! name = "forge"
//! file_normal = true
//! directory = "/var/log/smartforge"
//! ```

use crate::endpoint::Endpoint;
use crate::exclusion::ExclusionMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub kv: Option<KvSettings>,
    pub column: Option<ColumnSettings>,
    pub fieldbus: Option<FieldBusSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Key/value store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvSettings {
    pub host: String,
    #[serde(default = "default_kv_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: u8,
    #[serde(default)]
    pub exclusion: ExclusionMode,
}

impl KvSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_kv_port(),
            password: String::new(),
            database: 0,
            exclusion: ExclusionMode::default(),
        }
    }
}

/// Column-family database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSettings {
    pub host: String,
    #[serde(default = "default_column_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub keyspace: Option<String>,
    #[serde(default)]
    pub exclusion: ExclusionMode,
}

impl ColumnSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_column_port(),
            username: String::new(),
            password: String::new(),
            keyspace: None,
            exclusion: ExclusionMode::default(),
        }
    }

    /// Credentials, or `None` when both username and password are empty.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.username.is_empty() && self.password.is_empty() {
            None
        } else {
            Some(Credentials::new(&self.username, &self.password))
        }
    }
}

/// Field-bus server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBusSettings {
    pub endpoint: Endpoint,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub security: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default)]
    pub exclusion: ExclusionMode,
}

impl FieldBusSettings {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            username: String::new(),
            password: String::new(),
            security: String::new(),
            timeout_ms: default_timeout_ms(),
            update_interval_ms: default_update_interval_ms(),
            exclusion: ExclusionMode::default(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

/// Username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Process logging setup, see [`crate::logging::init`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub name: String,
    pub console: bool,
    pub file_normal: bool,
    pub file_critical: bool,
    pub directory: Option<PathBuf>,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            name: "smartforge".to_string(),
            console: true,
            file_normal: false,
            file_critical: false,
            directory: None,
            level: "info".to_string(),
        }
    }
}

/// Error loading a settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_kv_port() -> u16 {
    6379
}

fn default_column_port() -> u16 {
    9042
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_update_interval_ms() -> u64 {
    500
}
