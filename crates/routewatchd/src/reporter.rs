//! Cycle reporting.
//!
//! Every cycle produces exactly one [`CycleReport`], success or failure,
//! handed to a [`Reporter`]. The log reporter writes the human-readable
//! change log; the JSON-lines reporter appends a machine-readable audit
//! record.

use chrono::{DateTime, Utc};
use routewatch_common::{ErrorKind, FetchError, PersistenceError};
use routewatch_stats::{format_bytes, StatsConfig, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::differ::DiffResult;
use crate::types::SourceMode;

const RULE_WIDTH: usize = 60;

/// Reporter errors. Logged by the caller; never abort a cycle.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report sink could not be written.
    #[error("Failed to write report to {}: {source}", path.display())]
    Io {
        /// Sink path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The record could not be serialized.
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome record of one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// When the cycle completed.
    pub timestamp: DateTime<Utc>,
    /// Acquisition mode.
    pub mode: SourceMode,
    /// Source description (`local:ip route show`, `admin@host:22`).
    pub target: String,
    /// True when routes were added or removed.
    pub changed: bool,
    /// True when no previous snapshot existed.
    pub first_run: bool,
    /// Lines only in the current snapshot.
    pub added: Vec<String>,
    /// Lines only in the previous snapshot.
    pub removed: Vec<String>,
    /// Unified diff lines.
    pub unified_diff: Vec<String>,
    /// Network statistics, when collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
    /// Failure class, when the cycle failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Failure detail, when the cycle failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CycleReport {
    /// Report for a cycle that fetched and diffed successfully.
    pub fn success(mode: SourceMode, target: impl Into<String>, diff: DiffResult, first_run: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            mode,
            target: target.into(),
            changed: diff.changed,
            first_run,
            added: diff.added,
            removed: diff.removed,
            unified_diff: diff.unified,
            stats: None,
            error: None,
            error_message: None,
        }
    }

    /// Report for a cycle whose fetch failed.
    pub fn failure(mode: SourceMode, target: impl Into<String>, error: &FetchError) -> Self {
        Self {
            timestamp: Utc::now(),
            mode,
            target: target.into(),
            changed: false,
            first_run: false,
            added: Vec::new(),
            removed: Vec::new(),
            unified_diff: Vec::new(),
            stats: None,
            error: Some(error.kind()),
            error_message: Some(error.to_string()),
        }
    }

    /// Attaches a statistics snapshot.
    pub fn with_stats(mut self, stats: Option<StatsSnapshot>) -> Self {
        self.stats = stats;
        self
    }

    /// Records that the snapshot could not be persisted. The diff data is
    /// kept.
    pub fn with_persistence_error(mut self, error: &PersistenceError) -> Self {
        self.error = Some(ErrorKind::PersistenceError);
        self.error_message = Some(error.to_string());
        self
    }

    /// True when the routing table was fetched and diffed.
    pub fn fetched(&self) -> bool {
        !matches!(self.error, Some(kind) if kind != ErrorKind::PersistenceError)
    }
}

/// Sink for cycle reports.
pub trait Reporter: Send {
    /// Emits one record.
    fn report(&mut self, report: &CycleReport) -> Result<(), ReportError>;
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn report(&mut self, report: &CycleReport) -> Result<(), ReportError> {
        (**self).report(report)
    }
}

/// Writes the change log through `tracing`.
#[derive(Debug, Clone)]
pub struct LogReporter {
    top_ports_count: usize,
}

impl Default for LogReporter {
    fn default() -> Self {
        Self {
            top_ports_count: StatsConfig::default().top_ports_count,
        }
    }
}

impl LogReporter {
    /// Creates a log reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the port count shown in the "Top N" headers.
    pub fn with_top_ports(mut self, count: usize) -> Self {
        self.top_ports_count = count;
        self
    }

    /// Renders the log lines for a report.
    pub fn render(&self, report: &CycleReport) -> Vec<String> {
        let mut out = Vec::new();

        if let Some(kind) = report.error {
            out.push(format!(
                "Route check failed ({}): {}",
                kind,
                report.error_message.as_deref().unwrap_or("unknown error")
            ));
        }

        if report.fetched() {
            render_diff(&mut out, report);
        }

        if let Some(stats) = &report.stats {
            render_stats(&mut out, stats, self.top_ports_count);
        }

        out
    }
}

fn render_diff(out: &mut Vec<String>, report: &CycleReport) {
    if !report.changed {
        out.push("No routing table changes detected".to_string());
        return;
    }
    if report.first_run {
        out.push("No previous snapshot, recording current routing table as baseline".to_string());
    }
    out.push("Route change detected!".to_string());
    out.push("-".repeat(RULE_WIDTH));
    if !report.unified_diff.is_empty() {
        out.push("Routing table diff:".to_string());
        out.extend(report.unified_diff.iter().cloned());
    }
    out.push("-".repeat(RULE_WIDTH));
    push_route_list(out, "Added routes:", '+', &report.added);
    push_route_list(out, "Removed routes:", '-', &report.removed);
    out.push("=".repeat(RULE_WIDTH));
}

fn push_route_list(out: &mut Vec<String>, title: &str, marker: char, routes: &[String]) {
    let routes: Vec<&String> = routes.iter().filter(|r| !r.trim().is_empty()).collect();
    if routes.is_empty() {
        return;
    }
    out.push(title.to_string());
    out.extend(routes.into_iter().map(|r| format!("  {} {}", marker, r)));
}

fn render_stats(out: &mut Vec<String>, stats: &StatsSnapshot, top_ports_count: usize) {
    out.push("Network Statistics:".to_string());
    out.push("-".repeat(RULE_WIDTH));

    if let Some(traffic) = &stats.traffic {
        out.push("Network Traffic:".to_string());
        out.push(format!("  Bytes sent: {}", format_bytes(traffic.bytes_sent)));
        out.push(format!("  Bytes received: {}", format_bytes(traffic.bytes_recv)));
        out.push(format!("  Packets sent: {}", traffic.packets_sent));
        out.push(format!("  Packets received: {}", traffic.packets_recv));
        out.push(format!(
            "  Errors in: {}, Errors out: {}",
            traffic.errors_in, traffic.errors_out
        ));
        out.push(format!(
            "  Drops in: {}, Drops out: {}",
            traffic.drops_in, traffic.drops_out
        ));
    }

    if !stats.connections_by_state.is_empty() {
        out.push(format!("Active Connections: {}", stats.total_connections()));
        for (state, count) in stats.states_by_count() {
            out.push(format!("  {}: {}", state, count));
        }
    }

    for (title, ports) in [
        ("Local", &stats.top_local_ports),
        ("Remote", &stats.top_remote_ports),
    ] {
        if ports.is_empty() {
            continue;
        }
        out.push(format!("Top {} {} Ports:", top_ports_count, title));
        for entry in ports.iter() {
            out.push(format!("  Port {}: {} connections", entry.port, entry.count));
        }
    }

    if !stats.interfaces.is_empty() {
        out.push("Network Interfaces:".to_string());
        for iface in &stats.interfaces {
            out.push(format!(
                "  {}: {}, Errors: {}, Drops: {}",
                iface.name,
                if iface.up { "UP" } else { "DOWN" },
                iface.errors,
                iface.drops
            ));
        }
    }

    out.push("=".repeat(RULE_WIDTH));
}

impl Reporter for LogReporter {
    fn report(&mut self, report: &CycleReport) -> Result<(), ReportError> {
        let mut lines = self.render(report).into_iter();
        if report.error.is_some() {
            if let Some(first) = lines.next() {
                tracing::error!(target: "routewatch::report", "{}", first);
            }
        }
        for line in lines {
            tracing::info!(target: "routewatch::report", "{}", line);
        }
        Ok(())
    }
}

/// Appends each report as one JSON line.
#[derive(Debug, Clone)]
pub struct JsonLinesReporter {
    path: PathBuf,
}

impl JsonLinesReporter {
    /// Creates a reporter appending to `path`; parent directories are created
    /// on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reporter for JsonLinesReporter {
    fn report(&mut self, report: &CycleReport) -> Result<(), ReportError> {
        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let io_err = |source: io::Error| ReportError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        Ok(())
    }
}

/// Fans each report out to several reporters.
///
/// A failing member is logged and skipped; the others still receive the
/// record.
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReporterSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reporter.
    pub fn with(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    /// Number of member reporters.
    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    /// True when there are no members.
    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for ReporterSet {
    fn report(&mut self, report: &CycleReport) -> Result<(), ReportError> {
        for reporter in &mut self.reporters {
            if let Err(e) = reporter.report(report) {
                tracing::warn!(error = %e, "Reporter failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use routewatch_stats::{InterfaceStatus, PortCount, TrafficCounters};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn changed_report() -> CycleReport {
        CycleReport::success(
            SourceMode::Local,
            "local:ip route show",
            DiffResult {
                added: vec!["10.2.2.0/24 via 172.17.0.1".to_string()],
                removed: vec!["10.9.9.0/24 dev eth9".to_string()],
                changed: true,
                unified: vec![
                    "--- Previous Routes".to_string(),
                    "+++ Current Routes".to_string(),
                    "@@ -1 +1 @@".to_string(),
                    "-10.9.9.0/24 dev eth9".to_string(),
                    "+10.2.2.0/24 via 172.17.0.1".to_string(),
                ],
            },
            false,
        )
    }

    #[test]
    fn test_render_unchanged() {
        let report = CycleReport::success(SourceMode::Local, "local:x", DiffResult::default(), false);
        assert_eq!(
            LogReporter::new().render(&report),
            vec!["No routing table changes detected"]
        );
    }

    #[test]
    fn test_render_change() {
        let lines = LogReporter::new().render(&changed_report());
        assert_eq!(lines[0], "Route change detected!");
        assert!(lines.contains(&"Routing table diff:".to_string()));
        assert!(lines.contains(&"+10.2.2.0/24 via 172.17.0.1".to_string()));

        let added_at = lines.iter().position(|l| l == "Added routes:").unwrap();
        assert_eq!(lines[added_at + 1], "  + 10.2.2.0/24 via 172.17.0.1");
        let removed_at = lines.iter().position(|l| l == "Removed routes:").unwrap();
        assert_eq!(lines[removed_at + 1], "  - 10.9.9.0/24 dev eth9");
        assert_eq!(lines.last().unwrap(), &"=".repeat(60));
    }

    #[test]
    fn test_render_first_run_banner() {
        let mut report = changed_report();
        report.first_run = true;
        let lines = LogReporter::new().render(&report);
        assert!(lines[0].contains("baseline"));
        assert_eq!(lines[1], "Route change detected!");
    }

    #[test]
    fn test_render_failure() {
        let err = FetchError::timeout("ip route show", 30);
        let report = CycleReport::failure(SourceMode::Local, "local:ip route show", &err);
        let lines = LogReporter::new().render(&report);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Route check failed (timeout)"));
        assert!(!report.fetched());
    }

    #[test]
    fn test_render_persistence_failure_keeps_diff() {
        let err = PersistenceError::new(
            "/ro/routes.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );
        let report = changed_report().with_persistence_error(&err);
        assert!(report.fetched());
        let lines = LogReporter::new().render(&report);
        assert!(lines[0].starts_with("Route check failed (persistence_error)"));
        assert_eq!(lines[1], "Route change detected!");
    }

    #[test]
    fn test_render_stats_block() {
        let stats = StatsSnapshot {
            traffic: Some(TrafficCounters {
                bytes_sent: 1536,
                bytes_recv: 2048,
                packets_sent: 10,
                packets_recv: 20,
                ..Default::default()
            }),
            connections_by_state: [("ESTABLISHED".to_string(), 3), ("LISTEN".to_string(), 5)]
                .into_iter()
                .collect(),
            top_local_ports: vec![PortCount { port: 22, count: 4 }],
            top_remote_ports: Vec::new(),
            interfaces: vec![InterfaceStatus {
                name: "eth0".to_string(),
                up: true,
                errors: 0,
                drops: 1,
            }],
        };
        let report = CycleReport::success(SourceMode::Local, "local:x", DiffResult::default(), false)
            .with_stats(Some(stats));
        let lines = LogReporter::new().with_top_ports(3).render(&report);

        assert!(lines.contains(&"  Bytes sent: 1.50 KB".to_string()));
        assert!(lines.contains(&"  Bytes received: 2.00 KB".to_string()));
        assert!(lines.contains(&"Active Connections: 8".to_string()));
        let states_at = lines.iter().position(|l| l == "Active Connections: 8").unwrap();
        assert_eq!(lines[states_at + 1], "  LISTEN: 5");
        // Header shows the configured count even when fewer ports are in use
        assert!(lines.contains(&"Top 3 Local Ports:".to_string()));
        assert!(lines.contains(&"  Port 22: 4 connections".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Remote Ports")));
        assert!(lines.contains(&"  eth0: UP, Errors: 0, Drops: 1".to_string()));
    }

    #[test]
    fn test_json_lines_appends_one_record_per_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit/report.jsonl");
        let mut reporter = JsonLinesReporter::new(&path);

        reporter.report(&changed_report()).unwrap();
        let err = FetchError::command("ip route show", 2, "boom");
        reporter
            .report(&CycleReport::failure(SourceMode::Local, "local:ip route show", &err))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let records: Vec<CycleReport> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].changed);
        assert_eq!(records[0].added, vec!["10.2.2.0/24 via 172.17.0.1"]);
        assert_eq!(records[1].error, Some(ErrorKind::CommandError));

        let raw: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(raw["mode"], "local");
        assert!(raw.get("error").is_none());
    }

    struct Capture(Arc<Mutex<Vec<CycleReport>>>);

    impl Reporter for Capture {
        fn report(&mut self, report: &CycleReport) -> Result<(), ReportError> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    struct Broken;

    impl Reporter for Broken {
        fn report(&mut self, _report: &CycleReport) -> Result<(), ReportError> {
            Err(ReportError::Io {
                path: PathBuf::from("/dev/full"),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            })
        }
    }

    #[test]
    fn test_reporter_set_survives_failing_member() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut set = ReporterSet::new().with(Broken).with(Capture(seen.clone()));
        assert_eq!(set.len(), 2);

        set.report(&changed_report()).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
