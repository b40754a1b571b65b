// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Network thermal printer (raw TCP, typically port 9100).
//
// No connection is held between calls: every print or status check is an
// independent dial. This trades latency for resilience to printers that
// close idle sockets, and it means there is no partial-write recovery — a
// short write is a failed send.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{PrinterDescriptor, PrinterKind, PrinterStatus};

use crate::printer::Printer;

/// Connect timeout for the liveness probe.
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Connect timeout for a print dial.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline covering the whole payload write.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// A thermal printer reached over a raw TCP socket.
pub struct NetworkPrinter {
    id: String,
    name: String,
    address: String,
    port: u16,
}

impl NetworkPrinter {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            port,
        }
    }

    /// Build from a configured descriptor. Fails for non-network kinds.
    pub fn from_descriptor(d: &PrinterDescriptor) -> Result<Self> {
        if d.kind != PrinterKind::Network {
            return Err(SpoolwerkError::UnsupportedTransport(d.kind.to_string()));
        }
        Ok(Self::new(&d.id, &d.name, &d.address, d.port))
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[async_trait]
impl Printer for NetworkPrinter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PrinterKind {
        PrinterKind::Network
    }

    async fn status(&self) -> PrinterStatus {
        // A successful connect within the window means online; the probe
        // connection is dropped immediately.
        match tokio::time::timeout(STATUS_TIMEOUT, TcpStream::connect(self.addr())).await {
            Ok(Ok(_stream)) => PrinterStatus::Online,
            _ => PrinterStatus::Offline,
        }
    }

    async fn print(&self, data: &[u8]) -> Result<()> {
        let addr = self.addr();
        debug!(printer = %self.id, addr = %addr, bytes = data.len(), "dialing printer");

        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| SpoolwerkError::PrinterConnect {
                printer: self.id.clone(),
                detail: format!("connect to {addr} timed out after {}s", CONNECT_TIMEOUT.as_secs()),
            })?
            .map_err(|e| SpoolwerkError::PrinterConnect {
                printer: self.id.clone(),
                detail: e.to_string(),
            })?;

        let write = async {
            stream.write_all(data).await?;
            stream.flush().await?;
            stream.shutdown().await?;
            Ok::<_, std::io::Error>(())
        };

        tokio::time::timeout(WRITE_TIMEOUT, write)
            .await
            .map_err(|_| SpoolwerkError::PrinterWrite {
                printer: self.id.clone(),
                detail: format!("write timed out after {}s", WRITE_TIMEOUT.as_secs()),
            })?
            .map_err(|e| SpoolwerkError::PrinterWrite {
                printer: self.id.clone(),
                detail: e.to_string(),
            })?;

        info!(printer = %self.id, bytes = data.len(), "payload sent");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Nothing is held between calls.
        Ok(())
    }
}
