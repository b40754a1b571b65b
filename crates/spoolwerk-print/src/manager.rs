// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer registry and job routing.
//
// The registry is read concurrently by both cloud transports (per-job prints,
// heartbeat status queries) while the administrative layer edits it, so it
// lives behind a reader/writer lock. The manager owns each printer instance;
// duplicate-id detection is the caller's responsibility — adds are
// last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{DiscoveredPrinter, PrinterDescriptor, PrinterKind, PrinterStatus};

use crate::discovery;
use crate::escpos;
use crate::network::NetworkPrinter;
use crate::printer::Printer;

/// Registry of printers keyed by identifier.
#[derive(Default)]
pub struct PrinterManager {
    printers: RwLock<HashMap<String, Arc<dyn Printer>>>,
}

impl PrinterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured descriptors. Entries whose transport
    /// is not implemented are logged and skipped rather than failing startup.
    pub async fn from_descriptors(descriptors: &[PrinterDescriptor]) -> Self {
        let manager = Self::new();
        for d in descriptors {
            if d.kind != PrinterKind::Network {
                warn!(printer = %d.id, kind = %d.kind, "skipping printer with unimplemented transport");
                continue;
            }
            match NetworkPrinter::from_descriptor(d) {
                Ok(p) => manager.add_printer(Arc::new(p)).await,
                Err(e) => warn!(printer = %d.id, error = %e, "skipping misconfigured printer"),
            }
        }
        manager
    }

    /// Register a printer. Replaces any existing printer with the same id.
    pub async fn add_printer(&self, printer: Arc<dyn Printer>) {
        let id = printer.id().to_owned();
        self.printers.write().await.insert(id.clone(), printer);
        info!(printer = %id, "printer registered");
    }

    /// Remove a printer from the registry, closing it if present.
    pub async fn remove_printer(&self, id: &str) -> Result<()> {
        let removed = self.printers.write().await.remove(id);
        match removed {
            Some(printer) => {
                printer.close().await?;
                info!(printer = %id, "printer removed");
                Ok(())
            }
            None => Err(SpoolwerkError::PrinterNotFound(id.to_owned())),
        }
    }

    /// Look up a printer by id.
    pub async fn get_printer(&self, id: &str) -> Result<Arc<dyn Printer>> {
        self.printers
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SpoolwerkError::PrinterNotFound(id.to_owned()))
    }

    /// Forward a raw payload to a printer, verbatim. Printer-level failures
    /// surface unchanged.
    pub async fn print(&self, printer_id: &str, data: &[u8]) -> Result<()> {
        let printer = self.get_printer(printer_id).await?;
        printer.print(data).await
    }

    /// Send the canned ESC/POS self-test receipt to a printer.
    pub async fn test_print(&self, printer_id: &str) -> Result<()> {
        let printer = self.get_printer(printer_id).await?;
        printer.print(&escpos::build_test_receipt()).await
    }

    /// Probe every registered printer's liveness. Used for heartbeats.
    pub async fn statuses(&self) -> HashMap<String, PrinterStatus> {
        let printers: Vec<Arc<dyn Printer>> =
            self.printers.read().await.values().cloned().collect();

        let mut statuses = HashMap::with_capacity(printers.len());
        for printer in printers {
            let status = printer.status().await;
            statuses.insert(printer.id().to_owned(), status);
        }
        statuses
    }

    /// Ids of all registered printers.
    pub async fn printer_ids(&self) -> Vec<String> {
        self.printers.read().await.keys().cloned().collect()
    }

    /// Scan the local network for printers. Runs to completion; never fails.
    pub async fn discover(&self) -> Vec<DiscoveredPrinter> {
        discovery::discover_network_printers().await
    }
}
