//! Configuration file support for routewatchd
//!
//! Loads and validates the YAML configuration. Every field has a default, so
//! an empty file describes a local tracker running `ip route show` every 60
//! seconds. Default location: `config.yaml` in the working directory.

use routewatch_common::ConfigError;
use routewatch_stats::StatsConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::source::DeviceProfile;
use crate::types::{Credentials, RemoteTarget, SourceConfig, SourceMode};

/// Local command configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Command printing the routing table
    #[serde(default = "default_local_command")]
    pub command: String,
}

/// Remote device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Device hostname or address
    #[serde(default)]
    pub host: String,

    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Login user
    #[serde(default)]
    pub username: String,

    /// Password, when not using a key
    #[serde(default)]
    pub password: Option<String>,

    /// Private key path; takes precedence over the password
    #[serde(default)]
    pub key_file: Option<String>,

    /// Passphrase of the private key
    #[serde(default)]
    pub key_passphrase: Option<String>,

    /// Command override; the profile's default when unset
    #[serde(default)]
    pub command: Option<String>,

    /// Device family
    #[serde(default)]
    pub device_profile: DeviceProfile,
}

/// Polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between cycles in daemon mode
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    /// Bound on each fetch in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Snapshot persistence configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot file path
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,

    /// Persist snapshots across runs; in-memory only when false
    #[serde(default = "default_true")]
    pub store_previous: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for log files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log file name prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Log file extension, including the dot
    #[serde(default = "default_log_extension")]
    pub log_extension: String,

    /// Also log to the console
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Minimum level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
}

/// Report sinks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// JSON-lines audit file; disabled when unset
    #[serde(default)]
    pub json_path: Option<PathBuf>,
}

/// Complete routewatchd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteWatchConfig {
    /// Acquisition mode
    #[serde(default)]
    pub mode: SourceMode,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub statistics: StatsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

// Default functions
fn default_local_command() -> String {
    "ip route show".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("snapshots/routes.txt")
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_prefix() -> String {
    "route_changes".to_string()
}

fn default_log_extension() -> String {
    ".svc".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            command: default_local_command(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ssh_port(),
            username: String::new(),
            password: None,
            key_file: None,
            key_passphrase: None,
            command: None,
            device_profile: DeviceProfile::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
            store_previous: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            log_extension: default_log_extension(),
            enable_console: default_true(),
            level: default_level(),
        }
    }
}

/// Parses a level name; `warning` is accepted for `warn`.
pub fn parse_level(name: &str) -> Result<Level, ConfigError> {
    let normalized = name.trim().to_ascii_lowercase();
    let normalized = if normalized == "warning" {
        "warn"
    } else {
        normalized.as_str()
    };
    Level::from_str(normalized)
        .map_err(|_| ConfigError::invalid("logging.level", format!("unknown level '{}'", name)))
}

/// Expands a leading `~/` against `$HOME`.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

impl RouteWatchConfig {
    /// Loads and validates configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), mode = %config.mode, "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document is null in YAML, not an empty mapping
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                path: PathBuf::new(),
                message: e.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Acquisition mode.
    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Interval between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_seconds)
    }

    /// Bound on each fetch.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.poll.timeout_seconds)
    }

    /// Builds the source selection for the configured mode.
    pub fn source_config(&self) -> Result<SourceConfig, ConfigError> {
        match self.mode() {
            SourceMode::Local => Ok(SourceConfig::Local {
                command: self.local.command.clone(),
                timeout: self.timeout(),
            }),
            SourceMode::Remote => {
                let remote = &self.remote;
                let credentials = match (&remote.key_file, &remote.password) {
                    (Some(key_file), _) => Credentials::KeyFile {
                        path: expand_home(key_file),
                        passphrase: remote.key_passphrase.clone(),
                    },
                    (None, Some(password)) => Credentials::Password(password.clone()),
                    (None, None) => {
                        return Err(ConfigError::invalid(
                            "remote.password",
                            "password or key_file is required in remote mode",
                        ))
                    }
                };
                let command = remote
                    .command
                    .clone()
                    .unwrap_or_else(|| remote.device_profile.default_command().to_string());

                Ok(SourceConfig::Remote(RemoteTarget {
                    host: remote.host.clone(),
                    port: remote.port,
                    username: remote.username.clone(),
                    credentials,
                    command,
                    profile: remote.device_profile,
                    timeout: self.timeout(),
                }))
            }
        }
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_seconds == 0 {
            return Err(ConfigError::invalid("poll.interval_seconds", "must be > 0"));
        }
        if self.poll.timeout_seconds == 0 {
            return Err(ConfigError::invalid("poll.timeout_seconds", "must be > 0"));
        }
        if self.statistics.top_ports_count == 0 {
            return Err(ConfigError::invalid("statistics.top_ports_count", "must be > 0"));
        }
        if self.snapshot.store_previous && self.snapshot.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("snapshot.path", "must not be empty"));
        }
        if self.logging.file_prefix.trim().is_empty() {
            return Err(ConfigError::invalid("logging.file_prefix", "must not be empty"));
        }
        parse_level(&self.logging.level)?;

        self.source_config()?.validate()
    }
}
