// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The printer capability contract.

use async_trait::async_trait;

use spoolwerk_core::error::Result;
use spoolwerk_core::types::{PrinterKind, PrinterStatus};

/// Capability contract every registered printer fulfils.
///
/// `NetworkPrinter` is the only implementation today; the contract is kept
/// explicit so a USB variant can be added without touching the manager.
#[async_trait]
pub trait Printer: Send + Sync {
    /// Unique, stable identifier.
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn name(&self) -> &str;

    /// Transport kind.
    fn kind(&self) -> PrinterKind;

    /// Liveness probe. Must not hold a connection open afterwards.
    async fn status(&self) -> PrinterStatus;

    /// Deliver the full payload to the hardware. The payload is opaque to
    /// this layer — whatever bytes arrive are written verbatim.
    async fn print(&self, data: &[u8]) -> Result<()>;

    /// Release any resources held by this printer instance.
    async fn close(&self) -> Result<()>;
}
