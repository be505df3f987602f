//! Collector tests against a fabricated `/proc` + `/sys` tree.

use pretty_assertions::assert_eq;
use routewatch_stats::{InterfaceStatus, PortCount, StatsCollector, StatsConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:     100       2    0    0    0     0          0         0      100       2    0    0    0     0       0          0
  eth0:    5000      40    1    2    0     0          0         0     3000      30    0    1    0     0       0          0
  eth1:       0       0    0    0    0     0          0         0        0       0    0    0    0     0       0          0
";

const TCP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1 1 0000000000000000 100 0 0 10 0
   1: 0A00000F:0016 0A000001:D431 01 00000000:00000000 00:00000000 00000000     0        0 2 1 0000000000000000 20 0 0 10 -1
   2: 0A00000F:0016 0A000002:D432 01 00000000:00000000 00:00000000 00000000     0        0 3 1 0000000000000000 20 0 0 10 -1
   3: 0A00000F:9C40 0A000003:01BB 06 00000000:00000000 00:00000000 00000000     0        0 0 1 0000000000000000 20 0 0 10 -1
";

const UDP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  100: 00000000:0044 00000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 9 2 0000000000000000 0
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fake_tree() -> (TempDir, TempDir) {
    let proc_dir = TempDir::new().unwrap();
    let sys_dir = TempDir::new().unwrap();

    write(proc_dir.path(), "net/dev", NET_DEV);
    write(proc_dir.path(), "net/tcp", TCP);
    write(proc_dir.path(), "net/udp", UDP);
    // tcp6/udp6 deliberately absent

    write(sys_dir.path(), "class/net/lo/flags", "0x9\n");
    write(sys_dir.path(), "class/net/eth0/flags", "0x1003\n");
    write(sys_dir.path(), "class/net/eth1/operstate", "down\n");

    (proc_dir, sys_dir)
}

#[test]
fn test_collect_full_snapshot() {
    let (proc_dir, sys_dir) = fake_tree();
    let collector = StatsCollector::with_roots(StatsConfig::default(), proc_dir.path(), sys_dir.path());

    let snapshot = collector.collect().unwrap();

    let traffic = snapshot.traffic.clone().unwrap();
    assert_eq!(traffic.bytes_recv, 5100);
    assert_eq!(traffic.bytes_sent, 3100);
    assert_eq!(traffic.packets_recv, 42);
    assert_eq!(traffic.drops_out, 1);

    assert_eq!(snapshot.connections_by_state.get("ESTABLISHED"), Some(&2));
    assert_eq!(snapshot.connections_by_state.get("LISTEN"), Some(&1));
    assert_eq!(snapshot.connections_by_state.get("TIME_WAIT"), Some(&1));
    assert_eq!(snapshot.connections_by_state.get("NONE"), Some(&1));
    assert_eq!(snapshot.total_connections(), 5);

    assert_eq!(snapshot.top_local_ports[0], PortCount { port: 22, count: 3 });
    assert_eq!(snapshot.top_remote_ports.len(), 3);
    assert!(snapshot.top_remote_ports.iter().all(|p| p.port != 0));

    assert_eq!(
        snapshot.interfaces,
        vec![
            InterfaceStatus {
                name: "eth0".to_string(),
                up: true,
                errors: 1,
                drops: 3,
            },
            InterfaceStatus {
                name: "eth1".to_string(),
                up: false,
                errors: 0,
                drops: 0,
            },
            InterfaceStatus {
                name: "lo".to_string(),
                up: true,
                errors: 0,
                drops: 0,
            },
        ]
    );
}

#[test]
fn test_disabled_sections_are_empty() {
    let (proc_dir, sys_dir) = fake_tree();
    let config = StatsConfig {
        collect_traffic: false,
        collect_connections: false,
        collect_ports: false,
        ..StatsConfig::default()
    };
    let collector = StatsCollector::with_roots(config, proc_dir.path(), sys_dir.path());

    let snapshot = collector.collect().unwrap();
    assert!(snapshot.traffic.is_none());
    assert!(snapshot.connections_by_state.is_empty());
    assert!(snapshot.top_local_ports.is_empty());
    assert_eq!(snapshot.interfaces.len(), 3);
}
