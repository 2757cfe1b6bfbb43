//! Port selection within a fixed scan window.

use super::types::MockServerError;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing::debug;

/// Inclusive port range scanned when binding the mock listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    /// Order in which ports are tried for a preferred port.
    ///
    /// First pass: the preferred port up to the end of the range. Second pass,
    /// only when the preferred port lies above the range start: the range start
    /// up to (excluding) the preferred port. A preferred port outside the range
    /// degrades to a plain ascending scan of the whole range.
    pub fn scan_order(&self, preferred: u16) -> Vec<u16> {
        if !self.contains(preferred) {
            return (self.start..=self.end).collect();
        }
        (preferred..=self.end).chain(self.start..preferred).collect()
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self::new(9090, 9100)
    }
}

/// Bind the first free port in scan order and keep the listener.
///
/// Ports that are occupied are skipped; any other bind failure aborts the scan.
pub async fn bind_available_port(
    host: &str,
    preferred: u16,
    range: PortRange,
) -> Result<(u16, TcpListener), MockServerError> {
    for port in range.scan_order(preferred) {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok((port, listener)),
            Err(e) if matches!(e.kind(), ErrorKind::AddrInUse | ErrorKind::PermissionDenied) => {
                debug!("Port {} unavailable: {}", port, e);
                continue;
            }
            Err(source) => return Err(MockServerError::Bind { port, source }),
        }
    }

    Err(MockServerError::NoAvailablePorts {
        start: range.start,
        end: range.end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_order_from_range_start() {
        let range = PortRange::new(9090, 9093);
        assert_eq!(range.scan_order(9090), vec![9090, 9091, 9092, 9093]);
    }

    #[test]
    fn test_scan_order_two_passes() {
        let range = PortRange::new(9090, 9094);
        assert_eq!(range.scan_order(9092), vec![9092, 9093, 9094, 9090, 9091]);
    }

    #[test]
    fn test_scan_order_out_of_range_preferred() {
        let range = PortRange::new(9090, 9092);
        assert_eq!(range.scan_order(8080), vec![9090, 9091, 9092]);
        assert_eq!(range.scan_order(9500), vec![9090, 9091, 9092]);
    }

    #[tokio::test]
    async fn test_skips_occupied_port() {
        let range = PortRange::new(39410, 39412);
        let _occupied = TcpListener::bind(("127.0.0.1", 39410)).await.unwrap();

        let (port, _listener) = bind_available_port("127.0.0.1", 39410, range).await.unwrap();
        assert_eq!(port, 39411);
    }

    #[tokio::test]
    async fn test_exhausted_range_fails() {
        let range = PortRange::new(39420, 39421);
        let _a = TcpListener::bind(("127.0.0.1", 39420)).await.unwrap();
        let _b = TcpListener::bind(("127.0.0.1", 39421)).await.unwrap();

        let err = bind_available_port("127.0.0.1", 39420, range).await.unwrap_err();
        assert!(matches!(
            err,
            MockServerError::NoAvailablePorts { start: 39420, end: 39421 }
        ));
        assert_eq!(err.to_string(), "No available ports in range 39420-39421");
    }
}
