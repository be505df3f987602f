//! Statistics snapshot types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// System-wide traffic counters summed over all interfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCounters {
    /// Bytes transmitted.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_recv: u64,
    /// Packets transmitted.
    pub packets_sent: u64,
    /// Packets received.
    pub packets_recv: u64,
    /// Receive errors.
    pub errors_in: u64,
    /// Transmit errors.
    pub errors_out: u64,
    /// Dropped inbound packets.
    pub drops_in: u64,
    /// Dropped outbound packets.
    pub drops_out: u64,
}

/// How many sockets use a given port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCount {
    /// Port number.
    pub port: u16,
    /// Number of sockets.
    pub count: usize,
}

/// Per-interface status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStatus {
    /// Interface name (e.g. "eth0").
    pub name: String,
    /// Administratively up (IFF_UP).
    pub up: bool,
    /// Receive + transmit errors.
    pub errors: u64,
    /// Receive + transmit drops.
    pub drops: u64,
}

/// Point-in-time network statistics attached to a cycle report.
///
/// Sections disabled in [`crate::StatsConfig`] are left empty (`traffic` is `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Aggregate traffic counters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficCounters>,
    /// Socket count keyed by state name (`ESTABLISHED`, `LISTEN`, `NONE`, ...).
    pub connections_by_state: BTreeMap<String, usize>,
    /// Most used local ports, busiest first.
    pub top_local_ports: Vec<PortCount>,
    /// Most used remote ports, busiest first.
    pub top_remote_ports: Vec<PortCount>,
    /// Interface status, sorted by name.
    pub interfaces: Vec<InterfaceStatus>,
}

impl StatsSnapshot {
    /// Total number of sockets counted across all states.
    pub fn total_connections(&self) -> usize {
        self.connections_by_state.values().sum()
    }

    /// Connection states ordered busiest first, ties by name.
    pub fn states_by_count(&self) -> Vec<(&str, usize)> {
        let mut states: Vec<(&str, usize)> = self
            .connections_by_state
            .iter()
            .map(|(state, count)| (state.as_str(), *count))
            .collect();
        states.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        states
    }
}

/// Formats a byte count with binary units, two decimals ("1.50 KB").
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} PB", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GB");
        assert_eq!(format_bytes(3 * 1024u64.pow(5)), "3.00 PB");
    }

    #[test]
    fn test_states_by_count() {
        let mut snapshot = StatsSnapshot::default();
        snapshot
            .connections_by_state
            .insert("LISTEN".to_string(), 4);
        snapshot
            .connections_by_state
            .insert("ESTABLISHED".to_string(), 9);
        snapshot.connections_by_state.insert("NONE".to_string(), 4);

        assert_eq!(snapshot.total_connections(), 17);
        assert_eq!(
            snapshot.states_by_count(),
            vec![("ESTABLISHED", 9), ("LISTEN", 4), ("NONE", 4)]
        );
    }

    #[test]
    fn test_traffic_omitted_when_disabled() {
        let json = serde_json::to_string(&StatsSnapshot::default()).unwrap();
        assert!(!json.contains("traffic"));
    }
}
