//! Shell command execution for local routing-table acquisition.
//!
//! Commands run through `/bin/sh -c` so operators can configure pipelines
//! (`ip route show | grep -v linkdown`). Every execution is bounded by a
//! timeout; on expiry the child process is killed.
//!
//! # Example
//!
//! ```ignore
//! use routewatch_common::shell;
//! use std::time::Duration;
//!
//! let stdout = shell::exec_or_fail("ip route show", Duration::from_secs(30)).await?;
//! ```

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{FetchError, FetchResult};

/// Path of the shell used to interpret configured commands.
pub const SH_CMD: &str = "/bin/sh";

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// Raw stdout, not trimmed; line normalization is the caller's concern.
    pub stdout: String,
    /// Trimmed stderr.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the diagnostic output for error messages, preferring stderr.
    pub fn diagnostic_output(&self) -> String {
        if !self.stderr.is_empty() {
            self.stderr.clone()
        } else {
            self.stdout.trim().to_string()
        }
    }
}

/// Executes a shell command, waiting at most `timeout`.
///
/// # Returns
///
/// * `Ok(ExecResult)` - The command ran to completion (any exit code)
/// * `Err(FetchError::CommandError)` - The command could not be spawned
/// * `Err(FetchError::Timeout)` - The command did not finish in time
pub async fn exec(cmd: &str, timeout: Duration) -> FetchResult<ExecResult> {
    tracing::debug!(command = %cmd, timeout_secs = timeout.as_secs(), "Executing shell command");

    let child = Command::new(SH_CMD)
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(FetchError::command(cmd, -1, format!("spawn failed: {}", e)));
        }
        Err(_) => {
            tracing::warn!(command = %cmd, timeout_secs = timeout.as_secs(), "Command timed out");
            return Err(FetchError::timeout(cmd, timeout.as_secs()));
        }
    };

    let exit_code = output.status.code().unwrap_or(-1);
    let result = ExecResult {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    if result.success() {
        tracing::trace!(command = %cmd, bytes = result.stdout.len(), "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a shell command and fails on non-zero exit.
///
/// Returns the untrimmed stdout on success.
pub async fn exec_or_fail(cmd: &str, timeout: Duration) -> FetchResult<String> {
    let result = exec(cmd, timeout).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(FetchError::command(
            cmd,
            result.exit_code,
            result.diagnostic_output(),
        ))
    }
}
