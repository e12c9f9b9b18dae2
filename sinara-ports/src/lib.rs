//! Host port allocation for server containers.
//!
//! A server publishes two fixed container port sets: the Spark UI range
//! (4040-4060) and the single Jupyter UI port (8888). Each container port
//! is mapped to the first free host port found by scanning upward, with
//! strictly increasing host ports inside one allocation pass so ports
//! picked earlier in the pass are never handed out twice.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddrV4, TcpStream};
use std::time::Duration;

use tracing::debug;

pub const SPARK_UI_START_PORT: u16 = 4040;
pub const SPARK_UI_PORT_COUNT: u16 = 20;
pub const JUPYTER_UI_PORT: u16 = 8888;

const PROBE_TIMEOUT_MS: u64 = 200;

/// Container-port to host-port mapping, ordered by container port.
pub type PortsMapping = BTreeMap<u16, u16>;

/// A port is considered free when nothing on loopback accepts a
/// connection to it.
pub fn is_port_free(port: u16) -> bool {
    let addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
    TcpStream::connect_timeout(&addr.into(), Duration::from_millis(PROBE_TIMEOUT_MS)).is_err()
}

/// First free host port at or above `start`. The scan is unbounded; the
/// caller keeps the starting point inside a sane range.
pub fn first_free_port_from(start: u16) -> u16 {
    let mut port = start;
    while !is_port_free(port) {
        port += 1;
    }
    port
}

/// Map container ports `start..=start+count` (inclusive on both ends) to
/// free host ports, ascending by container port. Each scan starts just
/// above the previous pick, so host ports are strictly increasing and
/// never reused within the call.
pub fn allocate_range(container_port_start: u16, count: u16) -> PortsMapping {
    let mut result = PortsMapping::new();
    let mut free_host_port = container_port_start - 1;
    for container_port in container_port_start..=container_port_start + count {
        free_host_port = first_free_port_from(free_host_port + 1);
        result.insert(container_port, free_host_port);
    }
    result
}

/// Map a single container port to a free host port, scanning from the
/// container port itself.
pub fn allocate_single(container_port: u16) -> PortsMapping {
    let mut result = PortsMapping::new();
    result.insert(container_port, first_free_port_from(container_port));
    result
}

/// The full port mapping for a new server: Spark UI range plus the
/// Jupyter UI port. The two scans are independent; their base ranges do
/// not overlap, and no cross-range coordination is attempted.
pub fn server_ports_mapping() -> PortsMapping {
    let mut result = allocate_range(SPARK_UI_START_PORT, SPARK_UI_PORT_COUNT);
    result.extend(allocate_single(JUPYTER_UI_PORT));
    debug!(?result, "allocated server port mapping");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_allocate_range_is_strictly_increasing() {
        let mapping = allocate_range(SPARK_UI_START_PORT, SPARK_UI_PORT_COUNT);
        assert_eq!(mapping.len(), 21);

        let host_ports: Vec<u16> = mapping.values().copied().collect();
        assert!(host_ports.windows(2).all(|w| w[0] < w[1]));

        let container_ports: Vec<u16> = mapping.keys().copied().collect();
        assert_eq!(container_ports.first(), Some(&4040));
        assert_eq!(container_ports.last(), Some(&4060));
    }

    #[test]
    fn test_allocation_skips_bound_listener() {
        // Bind somewhere in a quiet range, then allocate across it
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let bound = listener.local_addr().unwrap().port();

        assert!(!is_port_free(bound));

        let start = bound.saturating_sub(2).max(1024);
        let mapping = allocate_range(start, 4);
        assert!(mapping.values().all(|&host| host != bound));
    }

    #[test]
    fn test_allocate_single_starts_at_container_port() {
        let mapping = allocate_single(JUPYTER_UI_PORT);
        assert_eq!(mapping.len(), 1);
        assert!(mapping[&JUPYTER_UI_PORT] >= JUPYTER_UI_PORT);
    }

    #[test]
    fn test_first_free_port_is_free() {
        let port = first_free_port_from(49000);
        assert!(is_port_free(port));
    }
}
