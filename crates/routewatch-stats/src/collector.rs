//! Statistics collection from `/proc` and `/sys`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::procfs::{self, NetDevEntry, SocketEntry, SocketTable};
use crate::types::{InterfaceStatus, PortCount, StatsSnapshot, TrafficCounters};

/// Statistics collection errors.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A required kernel file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Result type alias for statistics collection.
pub type StatsResult<T> = Result<T, StatsError>;

/// Which statistics sections to collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Master switch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Aggregate byte/packet counters.
    #[serde(default = "default_true")]
    pub collect_traffic: bool,

    /// Socket counts by state.
    #[serde(default = "default_true")]
    pub collect_connections: bool,

    /// Busiest local/remote ports.
    #[serde(default = "default_true")]
    pub collect_ports: bool,

    /// How many ports to list in each top-ports ranking.
    #[serde(default = "default_top_ports_count")]
    pub top_ports_count: usize,
}

fn default_true() -> bool {
    true
}

fn default_top_ports_count() -> usize {
    5
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            collect_traffic: default_true(),
            collect_connections: default_true(),
            collect_ports: default_true(),
            top_ports_count: default_top_ports_count(),
        }
    }
}

/// Reads network statistics from the kernel's pseudo filesystems.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    config: StatsConfig,
    proc_root: PathBuf,
    sys_root: PathBuf,
}

impl StatsCollector {
    /// Creates a collector reading the live `/proc` and `/sys`.
    pub fn new(config: StatsConfig) -> Self {
        Self::with_roots(config, "/proc", "/sys")
    }

    /// Creates a collector reading from alternate roots (for testing).
    pub fn with_roots(
        config: StatsConfig,
        proc_root: impl Into<PathBuf>,
        sys_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    /// Returns the collector configuration.
    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Collects a snapshot. Blocking; callers on an async runtime should use
    /// `spawn_blocking`.
    pub fn collect(&self) -> StatsResult<StatsSnapshot> {
        let mut snapshot = StatsSnapshot::default();

        let dev_path = self.proc_root.join("net/dev");
        let devices = procfs::parse_net_dev(&read(&dev_path)?);

        if self.config.collect_traffic {
            snapshot.traffic = Some(sum_traffic(&devices));
        }

        snapshot.interfaces = devices
            .iter()
            .map(|dev| InterfaceStatus {
                name: dev.name.clone(),
                up: self.interface_up(dev),
                errors: dev.rx_errs + dev.tx_errs,
                drops: dev.rx_drop + dev.tx_drop,
            })
            .collect();
        snapshot.interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        if self.config.collect_connections || self.config.collect_ports {
            let sockets = self.read_sockets()?;

            if self.config.collect_connections {
                for socket in &sockets {
                    *snapshot
                        .connections_by_state
                        .entry(socket.state.to_string())
                        .or_insert(0) += 1;
                }
            }

            if self.config.collect_ports {
                let n = self.config.top_ports_count;
                snapshot.top_local_ports = top_ports(sockets.iter().map(|s| s.local_port), n);
                snapshot.top_remote_ports = top_ports(
                    sockets.iter().map(|s| s.remote_port).filter(|p| *p != 0),
                    n,
                );
            }
        }

        tracing::debug!(
            interfaces = snapshot.interfaces.len(),
            connections = snapshot.total_connections(),
            "Collected network statistics"
        );

        Ok(snapshot)
    }

    fn read_sockets(&self) -> StatsResult<Vec<SocketEntry>> {
        let mut sockets = Vec::new();
        for table in SocketTable::ALL {
            let path = self.proc_root.join("net").join(table.file_name());
            match fs::read_to_string(&path) {
                Ok(content) => sockets.extend(procfs::parse_socket_table(&content, table)),
                // tcp6/udp6 are absent when IPv6 is disabled
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::trace!(path = %path.display(), "Socket table not present");
                }
                Err(source) => return Err(StatsError::Read { path, source }),
            }
        }
        Ok(sockets)
    }

    fn interface_up(&self, dev: &NetDevEntry) -> bool {
        let base = self.sys_root.join("class/net").join(&dev.name);
        read_optional(&base.join("flags"))
            .and_then(|f| procfs::parse_iff_up(&f))
            .or_else(|| read_optional(&base.join("operstate")).and_then(|s| procfs::parse_operstate(&s)))
            .unwrap_or(dev.rx_packets > 0 || dev.tx_packets > 0)
    }
}

fn read(path: &Path) -> StatsResult<String> {
    fs::read_to_string(path).map_err(|source| StatsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

fn sum_traffic(devices: &[NetDevEntry]) -> TrafficCounters {
    devices
        .iter()
        .fold(TrafficCounters::default(), |mut acc, dev| {
            acc.bytes_recv += dev.rx_bytes;
            acc.bytes_sent += dev.tx_bytes;
            acc.packets_recv += dev.rx_packets;
            acc.packets_sent += dev.tx_packets;
            acc.errors_in += dev.rx_errs;
            acc.errors_out += dev.tx_errs;
            acc.drops_in += dev.rx_drop;
            acc.drops_out += dev.tx_drop;
            acc
        })
}

/// Ranks ports by use, busiest first, ties broken by port number.
fn top_ports(ports: impl Iterator<Item = u16>, n: usize) -> Vec<PortCount> {
    let mut counts: BTreeMap<u16, usize> = BTreeMap::new();
    for port in ports {
        *counts.entry(port).or_insert(0) += 1;
    }

    let mut ranked: Vec<PortCount> = counts
        .into_iter()
        .map(|(port, count)| PortCount { port, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.port.cmp(&b.port)));
    ranked.truncate(n);
    ranked
}
