//! Source adapters: how the current routing table is obtained.
//!
//! The capability is a single async [`RouteSource::fetch`]. The closed set of
//! production variants lives in [`SourceAdapter`]; the orchestrator is generic
//! over the trait so tests can script fetch outcomes.
//!
//! Adapters return output verbatim modulo line normalization (see
//! [`RouteSnapshot`]); they never reorder or deduplicate lines.

mod local;
mod profile;
mod remote;

pub use local::LocalSource;
pub use profile::DeviceProfile;
pub use remote::RemoteSource;

use async_trait::async_trait;
use routewatch_common::FetchResult;

use crate::types::{RouteSnapshot, SourceConfig, SourceMode};

/// Capability to fetch the current routing table.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Fetches and normalizes the routing table.
    ///
    /// Fails with `Timeout`, `AuthFailure`, `CommandError` or
    /// `ConnectivityError`.
    async fn fetch(&self) -> FetchResult<RouteSnapshot>;

    /// Acquisition mode, recorded in reports.
    fn mode(&self) -> SourceMode;

    /// Human-readable target (`local:ip route show`, `admin@192.0.2.1:22`).
    fn describe(&self) -> String;
}

/// The configured source for this run.
#[derive(Debug, Clone)]
pub enum SourceAdapter {
    /// Local command execution.
    Local(LocalSource),
    /// Remote SSH session.
    Remote(RemoteSource),
}

impl SourceAdapter {
    /// Builds the adapter for a validated [`SourceConfig`].
    pub fn from_config(config: &SourceConfig) -> Self {
        match config {
            SourceConfig::Local { command, timeout } => {
                SourceAdapter::Local(LocalSource::new(command.clone(), *timeout))
            }
            SourceConfig::Remote(target) => SourceAdapter::Remote(RemoteSource::new(target.clone())),
        }
    }
}

#[async_trait]
impl RouteSource for SourceAdapter {
    async fn fetch(&self) -> FetchResult<RouteSnapshot> {
        match self {
            SourceAdapter::Local(source) => source.fetch().await,
            SourceAdapter::Remote(source) => source.fetch().await,
        }
    }

    fn mode(&self) -> SourceMode {
        match self {
            SourceAdapter::Local(source) => source.mode(),
            SourceAdapter::Remote(source) => source.mode(),
        }
    }

    fn describe(&self) -> String {
        match self {
            SourceAdapter::Local(source) => source.describe(),
            SourceAdapter::Remote(source) => source.describe(),
        }
    }
}
