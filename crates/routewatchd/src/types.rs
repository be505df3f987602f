//! Core data types: route snapshots and source selection.

use routewatch_common::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::source::DeviceProfile;

/// An ordered sequence of routing-table lines captured at one instant.
///
/// Every constructor normalizes its input: trailing whitespace (including
/// `\r`) is stripped from each line and trailing empty lines are dropped.
/// Order and duplicates are preserved. Equality is content equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteSnapshot {
    lines: Vec<String>,
}

impl RouteSnapshot {
    /// The empty snapshot (first run, or an unreadable store).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from raw command output.
    pub fn from_text(text: &str) -> Self {
        let mut lines: Vec<String> = text
            .split('\n')
            .map(|line| line.trim_end().to_string())
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Self { lines }
    }

    /// Builds a snapshot from individual lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = lines
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_text(&joined)
    }

    /// The snapshot lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the snapshot has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Serializes to the on-disk format: one line per route, `\n` terminated.
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if !self.lines.is_empty() {
            text.push('\n');
        }
        text
    }
}

/// Acquisition mode selected in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Run a local shell command.
    #[default]
    Local,
    /// Open an SSH session to a device.
    #[serde(alias = "ssh")]
    Remote,
}

impl SourceMode {
    /// Returns the mode name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Local => "local",
            SourceMode::Remote => "remote",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials for a remote session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Password authentication.
    Password(String),
    /// Public key authentication with an optional key passphrase.
    KeyFile {
        /// Private key path.
        path: PathBuf,
        /// Passphrase protecting the key.
        passphrase: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password(_) => f.write_str("Password(<redacted>)"),
            Credentials::KeyFile { path, .. } => f
                .debug_struct("KeyFile")
                .field("path", path)
                .finish_non_exhaustive(),
        }
    }
}

/// A remote device and how to query it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Device hostname or address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Password or key.
    pub credentials: Credentials,
    /// Command printing the routing table.
    pub command: String,
    /// Output conventions of the device family.
    pub profile: DeviceProfile,
    /// Bound on the whole connect/auth/exec exchange.
    pub timeout: Duration,
}

impl RemoteTarget {
    /// `host:port`, as used in logs and errors.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the routing table comes from. Exactly one variant per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Local shell command.
    Local {
        /// Command printing the routing table.
        command: String,
        /// Bound on command execution.
        timeout: Duration,
    },
    /// Remote SSH session.
    Remote(RemoteTarget),
}

impl SourceConfig {
    /// The acquisition mode of this source.
    pub fn mode(&self) -> SourceMode {
        match self {
            SourceConfig::Local { .. } => SourceMode::Local,
            SourceConfig::Remote(_) => SourceMode::Remote,
        }
    }

    /// Checks the per-variant requirements.
    ///
    /// `Remote` requires a non-empty host and username and a resolvable
    /// credential: a non-empty password, or a key file that exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SourceConfig::Local { command, timeout } => {
                if command.trim().is_empty() {
                    return Err(ConfigError::invalid("local.command", "must not be empty"));
                }
                if timeout.is_zero() {
                    return Err(ConfigError::invalid("poll.timeout_seconds", "must be > 0"));
                }
            }
            SourceConfig::Remote(target) => {
                if target.host.trim().is_empty() {
                    return Err(ConfigError::invalid("remote.host", "must not be empty"));
                }
                if target.username.trim().is_empty() {
                    return Err(ConfigError::invalid("remote.username", "must not be empty"));
                }
                if target.port == 0 {
                    return Err(ConfigError::invalid("remote.port", "must be > 0"));
                }
                if target.command.trim().is_empty() {
                    return Err(ConfigError::invalid("remote.command", "must not be empty"));
                }
                if target.timeout.is_zero() {
                    return Err(ConfigError::invalid("poll.timeout_seconds", "must be > 0"));
                }
                match &target.credentials {
                    Credentials::Password(password) if password.is_empty() => {
                        return Err(ConfigError::invalid("remote.password", "must not be empty"));
                    }
                    Credentials::KeyFile { path, .. } if !path.is_file() => {
                        return Err(ConfigError::invalid(
                            "remote.key_file",
                            format!("{} does not exist", path.display()),
                        ));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
