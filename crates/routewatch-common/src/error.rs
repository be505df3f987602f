//! Error types for routewatch operations.
//!
//! The taxonomy mirrors the three failure domains of a poll cycle:
//!
//! - [`FetchError`]: acquiring the routing table failed. Aborts the current
//!   cycle only and never touches persisted or in-memory state.
//! - [`PersistenceError`]: the snapshot file could not be written. Logged and
//!   tolerated; the in-memory state still advances.
//! - [`ConfigError`]: the configuration is unusable. Fatal at startup only.
//!
//! [`ErrorKind`] is the serializable discriminant carried in cycle reports.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for routing-table acquisition.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors raised by a source adapter while fetching the routing table.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The command or remote exchange did not complete within the bounded wait.
    #[error("Timed out after {after_secs}s waiting for '{target}'")]
    Timeout {
        /// What was being waited on (command or host).
        target: String,
        /// The timeout that elapsed, in seconds.
        after_secs: u64,
    },

    /// The remote device rejected the credentials, or they could not be loaded.
    #[error("Authentication failed for {username}@{host}: {message}")]
    AuthFailure {
        /// Remote host.
        host: String,
        /// Login user.
        username: String,
        /// Reason reported by the transport or key loader.
        message: String,
    },

    /// The command ran but failed (non-zero exit), or could not be spawned.
    #[error("Command '{command}' failed (exit code {exit_code}): {output}")]
    CommandError {
        /// The command that failed.
        command: String,
        /// Exit code, `-1` when the process never produced one.
        exit_code: i32,
        /// Captured stderr/stdout for diagnostics.
        output: String,
    },

    /// The transport to the device could not be established or dropped.
    #[error("Cannot reach {target}: {message}")]
    ConnectivityError {
        /// `host:port` of the device.
        target: String,
        /// Underlying transport error.
        message: String,
    },
}

impl FetchError {
    /// Creates a timeout error.
    pub fn timeout(target: impl Into<String>, after_secs: u64) -> Self {
        Self::Timeout {
            target: target.into(),
            after_secs,
        }
    }

    /// Creates an authentication failure.
    pub fn auth_failure(
        host: impl Into<String>,
        username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AuthFailure {
            host: host.into(),
            username: username.into(),
            message: message.into(),
        }
    }

    /// Creates a command failure.
    pub fn command(command: impl Into<String>, exit_code: i32, output: impl Into<String>) -> Self {
        Self::CommandError {
            command: command.into(),
            exit_code,
            output: output.into(),
        }
    }

    /// Creates a connectivity failure.
    pub fn connectivity(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectivityError {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Returns the report discriminant for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::AuthFailure { .. } => ErrorKind::AuthFailure,
            FetchError::CommandError { .. } => ErrorKind::CommandError,
            FetchError::ConnectivityError { .. } => ErrorKind::ConnectivityError,
        }
    }
}

/// The snapshot file could not be written.
#[derive(Debug, Error)]
#[error("Failed to persist snapshot to {}: {source}", path.display())]
pub struct PersistenceError {
    /// The snapshot path being written.
    pub path: PathBuf,
    /// The underlying IO error.
    #[source]
    pub source: io::Error,
}

impl PersistenceError {
    /// Creates a persistence error for `path`.
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema.
    #[error("Cannot parse config file {}: {message}", path.display())]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A field failed validation.
    #[error("Invalid configuration for {field}: {message}")]
    Invalid {
        /// The offending field, dotted (`remote.host`).
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Serializable error discriminant attached to cycle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Fetch timed out.
    Timeout,
    /// Credentials rejected.
    AuthFailure,
    /// Command failed on the target.
    CommandError,
    /// Transport unavailable.
    ConnectivityError,
    /// Snapshot could not be persisted.
    PersistenceError,
}

impl ErrorKind {
    /// Returns the snake_case name used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::AuthFailure => "auth_failure",
            ErrorKind::CommandError => "command_error",
            ErrorKind::ConnectivityError => "connectivity_error",
            ErrorKind::PersistenceError => "persistence_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = FetchError::timeout("ip route show", 30);
        assert_eq!(
            err.to_string(),
            "Timed out after 30s waiting for 'ip route show'"
        );
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_command_error_display() {
        let err = FetchError::command("ip route show table 999", 2, "Error: ipv4: FIB table does not exist.");
        assert!(err.to_string().contains("exit code 2"));
        assert!(err.to_string().contains("ip route show table 999"));
        assert_eq!(err.kind(), ErrorKind::CommandError);
    }

    #[test]
    fn test_auth_and_connectivity_kinds() {
        let auth = FetchError::auth_failure("192.0.2.1", "admin", "password rejected");
        assert_eq!(
            auth.to_string(),
            "Authentication failed for admin@192.0.2.1: password rejected"
        );
        assert_eq!(auth.kind(), ErrorKind::AuthFailure);

        let conn = FetchError::connectivity("192.0.2.1:22", "connection refused");
        assert_eq!(conn.kind(), ErrorKind::ConnectivityError);
    }

    #[test]
    fn test_persistence_error_display() {
        let err = PersistenceError::new(
            "/ro/routes.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/ro/routes.txt"));
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::invalid("remote.host", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for remote.host: must not be empty"
        );
    }

    #[test]
    fn test_error_kind_serde() {
        let json = serde_json::to_string(&ErrorKind::AuthFailure).unwrap();
        assert_eq!(json, "\"auth_failure\"");
        assert_eq!(ErrorKind::ConnectivityError.to_string(), "connectivity_error");
    }
}
