// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Network printer discovery: TCP probe sweep of common private subnets.
//
// Thermal printers rarely announce themselves over mDNS, so discovery is a
// brute probe of port 9100 across the usual /24 ranges. Any host that
// accepts the connection is reported; the probe connection is dropped
// immediately. The sweep runs to completion before returning and never
// produces a structural error — no open ports simply means an empty list.

use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use spoolwerk_core::types::{DiscoveredPrinter, PrinterKind};

/// Private /24 prefixes swept during discovery.
const DISCOVERY_SUBNETS: &[&str] = &["192.168.1.", "192.168.0.", "10.0.0."];

/// Raw printing port probed on every host.
const DISCOVERY_PORT: u16 = 9100;

/// Per-host connect timeout.
const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Hosts probed concurrently within a subnet.
const PROBE_CONCURRENCY: usize = 32;

/// Sweep the discovery subnets for listening port-9100 hosts.
pub async fn discover_network_printers() -> Vec<DiscoveredPrinter> {
    let mut discovered = Vec::new();

    for subnet in DISCOVERY_SUBNETS {
        debug!(subnet = %subnet, "sweeping subnet");
        let probes = (1u8..=254).map(|host| {
            let ip = format!("{subnet}{host}");
            async move {
                if probe_host(&ip, DISCOVERY_PORT, PROBE_TIMEOUT).await {
                    Some(ip)
                } else {
                    None
                }
            }
        });

        let mut open: Vec<String> = stream::iter(probes)
            .buffer_unordered(PROBE_CONCURRENCY)
            .filter_map(|ip| async move { ip })
            .collect()
            .await;
        // buffer_unordered yields in completion order; keep results stable.
        open.sort();

        for ip in open {
            discovered.push(DiscoveredPrinter {
                id: format!("network-{ip}"),
                name: format!("Printer at {ip}"),
                kind: PrinterKind::Network,
                address: ip,
                port: DISCOVERY_PORT,
            });
        }
    }

    info!(count = discovered.len(), "network discovery finished");
    discovered
}

/// Whether `host:port` accepts a TCP connection within `timeout`.
pub(crate) async fn probe_host(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn probe_detects_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        assert!(probe_host("127.0.0.1", port, Duration::from_millis(500)).await);
        accept.abort();
    }

    #[tokio::test]
    async fn probe_rejects_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(!probe_host("127.0.0.1", port, Duration::from_millis(200)).await);
    }
}
