//! Parsers for the Linux `/proc/net` and `/sys/class/net` formats.
//!
//! Parsers take file content so they can be exercised with fixtures; the
//! collector does the file IO.

/// One row of `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetDevEntry {
    /// Interface name.
    pub name: String,
    /// Received bytes.
    pub rx_bytes: u64,
    /// Received packets.
    pub rx_packets: u64,
    /// Receive errors.
    pub rx_errs: u64,
    /// Receive drops.
    pub rx_drop: u64,
    /// Transmitted bytes.
    pub tx_bytes: u64,
    /// Transmitted packets.
    pub tx_packets: u64,
    /// Transmit errors.
    pub tx_errs: u64,
    /// Transmit drops.
    pub tx_drop: u64,
}

/// Socket protocol table under `/proc/net`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketTable {
    /// `/proc/net/tcp`
    Tcp,
    /// `/proc/net/tcp6`
    Tcp6,
    /// `/proc/net/udp`
    Udp,
    /// `/proc/net/udp6`
    Udp6,
}

impl SocketTable {
    /// All inet tables, in read order.
    pub const ALL: [SocketTable; 4] = [
        SocketTable::Tcp,
        SocketTable::Tcp6,
        SocketTable::Udp,
        SocketTable::Udp6,
    ];

    /// File name under `/proc/net`.
    pub fn file_name(&self) -> &'static str {
        match self {
            SocketTable::Tcp => "tcp",
            SocketTable::Tcp6 => "tcp6",
            SocketTable::Udp => "udp",
            SocketTable::Udp6 => "udp6",
        }
    }

    /// Whether the `st` column carries a TCP state.
    pub fn is_tcp(&self) -> bool {
        matches!(self, SocketTable::Tcp | SocketTable::Tcp6)
    }
}

/// One socket from a `/proc/net/{tcp,udp}[6]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    /// Local port.
    pub local_port: u16,
    /// Remote port, 0 when unconnected.
    pub remote_port: u16,
    /// State name; UDP sockets report `NONE`.
    pub state: &'static str,
}

/// Maps the hex `st` column of a TCP table to its state name.
pub fn tcp_state_name(hex: u8) -> &'static str {
    match hex {
        0x01 => "ESTABLISHED",
        0x02 => "SYN_SENT",
        0x03 => "SYN_RECV",
        0x04 => "FIN_WAIT1",
        0x05 => "FIN_WAIT2",
        0x06 => "TIME_WAIT",
        0x07 => "CLOSE",
        0x08 => "CLOSE_WAIT",
        0x09 => "LAST_ACK",
        0x0A => "LISTEN",
        0x0B => "CLOSING",
        _ => "UNKNOWN",
    }
}

/// Parses `/proc/net/dev` content.
pub fn parse_net_dev(content: &str) -> Vec<NetDevEntry> {
    let mut entries = Vec::new();

    // Two header lines
    for line in content.lines().skip(2) {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<u64> = counters
            .split_whitespace()
            .map(|f| f.parse().unwrap_or(0))
            .collect();
        if fields.len() < 12 {
            continue;
        }

        // rx: bytes packets errs drop fifo frame compressed multicast
        // tx: bytes packets errs drop fifo colls carrier compressed
        entries.push(NetDevEntry {
            name: name.trim().to_string(),
            rx_bytes: fields[0],
            rx_packets: fields[1],
            rx_errs: fields[2],
            rx_drop: fields[3],
            tx_bytes: fields[8],
            tx_packets: fields[9],
            tx_errs: fields[10],
            tx_drop: fields[11],
        });
    }

    entries
}

/// Parses a `/proc/net/{tcp,udp}[6]` table.
pub fn parse_socket_table(content: &str, table: SocketTable) -> Vec<SocketEntry> {
    let mut sockets = Vec::new();

    for line in content.lines().skip(1) {
        // sl local_address rem_address st tx_queue:rx_queue ...
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }

        let state = if table.is_tcp() {
            u8::from_str_radix(parts[3], 16)
                .map(tcp_state_name)
                .unwrap_or("UNKNOWN")
        } else {
            "NONE"
        };

        sockets.push(SocketEntry {
            local_port: parse_port(parts[1]),
            remote_port: parse_port(parts[2]),
            state,
        });
    }

    sockets
}

/// Extracts the port from a hex `ADDR:PORT` pair.
fn parse_port(addr_port: &str) -> u16 {
    addr_port
        .rsplit_once(':')
        .and_then(|(_, port)| u16::from_str_radix(port, 16).ok())
        .unwrap_or(0)
}

/// Parses `/sys/class/net/<if>/flags` (hex) and tests IFF_UP.
pub fn parse_iff_up(flags: &str) -> Option<bool> {
    let trimmed = flags.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u32::from_str_radix(hex, 16).ok().map(|f| f & 0x1 != 0)
}

/// Parses `/sys/class/net/<if>/operstate`.
pub fn parse_operstate(state: &str) -> Option<bool> {
    match state.trim() {
        "up" => Some(true),
        "down" | "lowerlayerdown" | "notpresent" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 2776770   11307    0    0    0     0          0         0  2776770   11307    0    0    0     0       0          0
  eth0: 1215645    2751    3    7    0     0          0         0  1782404    4324    1    2    0   427       0          0
";

    #[test]
    fn test_parse_net_dev() {
        let entries = parse_net_dev(NET_DEV);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "lo");
        assert_eq!(entries[0].rx_bytes, 2776770);
        assert_eq!(
            entries[1],
            NetDevEntry {
                name: "eth0".to_string(),
                rx_bytes: 1215645,
                rx_packets: 2751,
                rx_errs: 3,
                rx_drop: 7,
                tx_bytes: 1782404,
                tx_packets: 4324,
                tx_errs: 1,
                tx_drop: 2,
            }
        );
    }

    #[test]
    fn test_parse_net_dev_skips_malformed() {
        let content = "h1\nh2\nbroken line\n  eth1: 1 2 3\n";
        assert!(parse_net_dev(content).is_empty());
    }

    #[test]
    fn test_parse_tcp_table() {
        let content = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:0035 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12345 1 0000000000000000 100 0 0 10 0
   1: 0100007F:0CEA 0100007F:01BB 01 00000000:00000000 00:00000000 00000000  1000        0 67890 1 0000000000000000 20 0 0 10 -1
";
        let sockets = parse_socket_table(content, SocketTable::Tcp);
        assert_eq!(
            sockets,
            vec![
                SocketEntry {
                    local_port: 53,
                    remote_port: 0,
                    state: "LISTEN",
                },
                SocketEntry {
                    local_port: 3306,
                    remote_port: 443,
                    state: "ESTABLISHED",
                },
            ]
        );
    }

    #[test]
    fn test_parse_udp6_table() {
        let content = "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  512: 00000000000000000000000000000000:0222 00000000000000000000000000000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 22222 2 0000000000000000 0
";
        let sockets = parse_socket_table(content, SocketTable::Udp6);
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].local_port, 546);
        assert_eq!(sockets[0].state, "NONE");
    }

    #[test]
    fn test_tcp_state_name() {
        assert_eq!(tcp_state_name(0x06), "TIME_WAIT");
        assert_eq!(tcp_state_name(0xFF), "UNKNOWN");
    }

    #[test]
    fn test_parse_flags_and_operstate() {
        assert_eq!(parse_iff_up("0x1003\n"), Some(true));
        assert_eq!(parse_iff_up("0x1002"), Some(false));
        assert_eq!(parse_iff_up("garbage"), None);
        assert_eq!(parse_operstate("up\n"), Some(true));
        assert_eq!(parse_operstate("down"), Some(false));
        assert_eq!(parse_operstate("unknown"), None);
    }
}
