//! Poll cycle orchestration.
//!
//! One cycle walks `Idle -> Fetching -> Diffing -> Persisting -> Reporting ->
//! Idle`. A failed fetch skips straight to `Reporting` and leaves both the
//! in-memory [`PollState`] and the snapshot file untouched, so the next
//! successful cycle diffs against the last good snapshot.
//!
//! Continuous mode is a strict sequential loop: the interval sleep starts
//! only after a cycle completes, and shutdown is observed between cycles.

use routewatch_common::ErrorKind;
use routewatch_stats::{StatsCollector, StatsSnapshot};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::differ;
use crate::reporter::{CycleReport, Reporter};
use crate::snapshot_store::{LoadedSnapshot, SnapshotStore};
use crate::source::RouteSource;
use crate::types::RouteSnapshot;

/// Last-known routing table of this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    snapshot: Option<RouteSnapshot>,
    persisted: bool,
}

impl PollState {
    /// State seeded from the snapshot store at startup.
    pub fn from_loaded(loaded: LoadedSnapshot) -> Self {
        if loaded.clean {
            Self {
                snapshot: Some(loaded.snapshot),
                persisted: true,
            }
        } else {
            Self::default()
        }
    }

    /// The last successfully fetched snapshot, if any.
    pub fn snapshot(&self) -> Option<&RouteSnapshot> {
        self.snapshot.as_ref()
    }

    /// True when the snapshot is known to match the file on disk.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// True before the first snapshot has been observed.
    pub fn is_first_run(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// Cycle phase, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Diffing,
    Persisting,
    Reporting,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Fetching => "fetching",
            CyclePhase::Diffing => "diffing",
            CyclePhase::Persisting => "persisting",
            CyclePhase::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Result of one cycle, mapped to the process exit code in single-run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Routing table identical to the previous snapshot.
    Unchanged,
    /// Routes were added or removed.
    Changed,
    /// The fetch failed.
    Failed(ErrorKind),
    /// The diff was computed but the snapshot could not be saved.
    PersistFailed { changed: bool },
}

impl CycleOutcome {
    /// `0` unchanged, `1` changed, `2` error (fetch or save).
    pub fn exit_code(&self) -> u8 {
        match self {
            CycleOutcome::Unchanged => 0,
            CycleOutcome::Changed => 1,
            CycleOutcome::Failed(_) | CycleOutcome::PersistFailed { .. } => 2,
        }
    }
}

/// Drives poll cycles for one source.
pub struct PollOrchestrator<S, R> {
    source: S,
    reporter: R,
    store: Option<SnapshotStore>,
    stats: Option<StatsCollector>,
    state: PollState,
    phase: CyclePhase,
}

impl<S: RouteSource, R: Reporter> PollOrchestrator<S, R> {
    /// Creates an orchestrator. With a store, the previous snapshot is loaded
    /// from disk; without one, comparison is in-memory only.
    pub fn new(source: S, reporter: R, store: Option<SnapshotStore>) -> Self {
        let state = store
            .as_ref()
            .map(|s| PollState::from_loaded(s.load_state()))
            .unwrap_or_default();

        Self {
            source,
            reporter,
            store,
            stats: None,
            state,
            phase: CyclePhase::Idle,
        }
    }

    /// Attaches a statistics collector run after every cycle.
    pub fn with_stats(mut self, collector: StatsCollector) -> Self {
        self.stats = Some(collector);
        self
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    fn enter(&mut self, phase: CyclePhase) {
        tracing::debug!(from = %self.phase, to = %phase, "Cycle phase transition");
        self.phase = phase;
    }

    /// Runs one complete cycle. Never fails: every outcome is reported.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let mode = self.source.mode();
        let target = self.source.describe();

        self.enter(CyclePhase::Fetching);
        let current = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(target_desc = %target, kind = %e.kind(), error = %e, "Failed to fetch routing table");
                let outcome = CycleOutcome::Failed(e.kind());
                let report = CycleReport::failure(mode, target, &e);
                self.report(report).await;
                return outcome;
            }
        };

        self.enter(CyclePhase::Diffing);
        let first_run = self.state.is_first_run();
        if first_run {
            tracing::info!(routes = current.len(), "First run, no previous snapshot to compare against");
        }
        let empty = RouteSnapshot::empty();
        let previous = self.state.snapshot().unwrap_or(&empty);
        let diff = differ::diff(previous, &current);
        tracing::debug!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Snapshot comparison complete"
        );
        let changed = diff.changed;

        self.enter(CyclePhase::Persisting);
        let persist_error = self.persist(&current, changed);
        self.state.snapshot = Some(current);

        let mut report = CycleReport::success(mode, target, diff, first_run);
        let outcome = match persist_error {
            Some(e) => {
                report = report.with_persistence_error(&e);
                CycleOutcome::PersistFailed { changed }
            }
            None if changed => CycleOutcome::Changed,
            None => CycleOutcome::Unchanged,
        };
        self.report(report).await;
        outcome
    }

    /// Saves `current` when needed; returns the error for the report.
    fn persist(
        &mut self,
        current: &RouteSnapshot,
        changed: bool,
    ) -> Option<routewatch_common::PersistenceError> {
        let store = self.store.as_ref()?;

        if !changed && self.state.persisted {
            tracing::debug!(path = %store.path().display(), "Snapshot unchanged and in sync, skipping write");
            return None;
        }

        match store.save(current) {
            Ok(()) => {
                self.state.persisted = true;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not save snapshot, continuing with in-memory state");
                self.state.persisted = false;
                Some(e)
            }
        }
    }

    async fn report(&mut self, report: CycleReport) {
        self.enter(CyclePhase::Reporting);
        let stats = self.collect_stats().await;
        let report = report.with_stats(stats);
        if let Err(e) = self.reporter.report(&report) {
            tracing::warn!(error = %e, "Failed to emit cycle report");
        }
        self.enter(CyclePhase::Idle);
    }

    async fn collect_stats(&self) -> Option<StatsSnapshot> {
        let collector = self.stats.clone().filter(|c| c.config().enabled)?;

        match tokio::task::spawn_blocking(move || collector.collect()).await {
            Ok(Ok(snapshot)) => Some(snapshot),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Error collecting network statistics");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Statistics task failed");
                None
            }
        }
    }

    /// Runs cycles until `shutdown` is cancelled; returns the number run.
    ///
    /// The first cycle starts immediately. Cancellation is honored between
    /// cycles; an in-flight cycle always completes.
    pub async fn run_continuous(&mut self, interval: Duration, shutdown: CancellationToken) -> u64 {
        tracing::info!(
            target_desc = %self.source.describe(),
            interval_secs = interval.as_secs(),
            "Starting continuous monitoring"
        );

        let mut cycles = 0u64;
        loop {
            let outcome = self.run_cycle().await;
            cycles += 1;
            tracing::debug!(cycle = cycles, ?outcome, "Cycle complete");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!(cycles, "Monitoring stopped");
        cycles
    }
}
