//! Local source: runs a shell command on this host.

use async_trait::async_trait;
use routewatch_common::{shell, FetchResult};
use std::time::Duration;

use super::RouteSource;
use crate::types::{RouteSnapshot, SourceMode};

/// Fetches the routing table by running a local command.
#[derive(Debug, Clone)]
pub struct LocalSource {
    command: String,
    timeout: Duration,
}

impl LocalSource {
    /// Creates a local source for `command`, bounded by `timeout`.
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RouteSource for LocalSource {
    async fn fetch(&self) -> FetchResult<RouteSnapshot> {
        let stdout = shell::exec_or_fail(&self.command, self.timeout).await?;
        let snapshot = RouteSnapshot::from_text(&stdout);
        tracing::info!(
            command = %self.command,
            routes = snapshot.len(),
            "Retrieved local routing table"
        );
        Ok(snapshot)
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Local
    }

    fn describe(&self) -> String {
        format!("local:{}", self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewatch_common::FetchError;

    #[tokio::test]
    async fn test_fetch_strips_trailing_whitespace() {
        let source = LocalSource::new(
            "printf 'default via 10.0.0.1 dev eth0 \\n10.2.2.0/24 dev eth1\\t\\n\\n'",
            Duration::from_secs(5),
        );
        let snapshot = source.fetch().await.unwrap();
        assert_eq!(
            snapshot.lines(),
            &["default via 10.0.0.1 dev eth0", "10.2.2.0/24 dev eth1"]
        );
    }

    #[tokio::test]
    async fn test_fetch_non_zero_exit_is_command_error() {
        let source = LocalSource::new("echo 'no such table' >&2; exit 2", Duration::from_secs(5));
        match source.fetch().await {
            Err(FetchError::CommandError { exit_code, .. }) => assert_eq!(exit_code, 2),
            other => panic!("Expected CommandError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let source = LocalSource::new("sleep 5", Duration::from_millis(100));
        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Timeout { .. })
        ));
    }
}
