//! Routing table change tracker.
//!
//! Periodically captures the routing table of this host or of a remote
//! device, diffs it against the last persisted snapshot, and reports what was
//! added or removed together with a snapshot of network statistics.
//!
//! # Architecture
//!
//! ```text
//! RouteSource (local shell | SSH)
//!        │ RouteSnapshot
//!        ▼
//! PollOrchestrator ── differ::diff ──► DiffResult
//!        │                │
//!        ▼                ▼
//! SnapshotStore      Reporter (log, JSON lines) ◄── StatsCollector
//! ```

pub mod config_file;
pub mod differ;
pub mod logging;
pub mod orchestrator;
pub mod reporter;
pub mod snapshot_store;
pub mod source;
pub mod types;

pub use config_file::RouteWatchConfig;
pub use differ::{diff, DiffOp, DiffResult};
pub use orchestrator::{CycleOutcome, CyclePhase, PollOrchestrator, PollState};
pub use reporter::{CycleReport, JsonLinesReporter, LogReporter, ReportError, Reporter, ReporterSet};
pub use snapshot_store::{LoadedSnapshot, SnapshotStore};
pub use source::{DeviceProfile, LocalSource, RemoteSource, RouteSource, SourceAdapter};
pub use types::{Credentials, RemoteTarget, RouteSnapshot, SourceConfig, SourceMode};
