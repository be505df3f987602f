//! Network statistics collector for routewatch.
//!
//! Produces a [`StatsSnapshot`] (traffic counters, socket states, busiest
//! ports, interface status) on demand. The snapshot is a best-effort side
//! payload of each poll cycle: callers log a [`StatsError`] and carry on.
//!
//! # Data Sources
//! - `/proc/net/dev` - per-interface byte/packet/error/drop counters
//! - `/proc/net/{tcp,tcp6,udp,udp6}` - socket tables
//! - `/sys/class/net/<if>/{flags,operstate}` - interface up/down

pub mod collector;
pub mod procfs;
pub mod types;

pub use collector::{StatsCollector, StatsConfig, StatsError, StatsResult};
pub use types::{format_bytes, InterfaceStatus, PortCount, StatsSnapshot, TrafficCounters};
