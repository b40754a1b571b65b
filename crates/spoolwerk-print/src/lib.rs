// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolwerk Print — printer capability trait, dial-per-job raw TCP transport,
// ESC/POS self-test receipt construction, and port-9100 subnet discovery.
// This crate bridges between the core domain types in `spoolwerk-core` and
// the physical thermal printers.

pub mod discovery;
pub mod escpos;
pub mod manager;
pub mod network;
pub mod printer;

pub use manager::PrinterManager;
pub use network::NetworkPrinter;
pub use printer::Printer;
