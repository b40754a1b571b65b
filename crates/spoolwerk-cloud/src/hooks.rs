// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Injected collaborator callbacks.
//
// The transports never call into the administrative layer directly; job
// bookkeeping, heartbeat payloads, sync payloads, and the fallback switch
// all flow through these function fields, set once at construction. This
// keeps the transports testable without a live HTTP server.

use spoolwerk_core::types::{JobStatus, PrinterSyncEntry};

/// Called when a job arrives and decodes successfully: id, printer id,
/// payload size in bytes.
pub type JobReceivedFn = Box<dyn Fn(&str, &str, usize) + Send + Sync>;

/// Called when a job finishes: id, terminal status, error text if failed.
pub type JobCompletedFn = Box<dyn Fn(&str, JobStatus, Option<&str>) + Send + Sync>;

/// Current printer list for sync payloads. Sourced from configuration, which
/// knows paper widths; the printer registry does not.
pub type PrinterListFn = Box<dyn Fn() -> Vec<PrinterSyncEntry> + Send + Sync>;

/// Invoked by the streaming transport when the streaming endpoint is
/// structurally unreachable and the owner should switch to polling.
pub type FallbackFn = Box<dyn Fn() + Send + Sync>;

/// Callback bundle handed to a transport at construction.
pub struct CloudHooks {
    pub on_job_received: JobReceivedFn,
    pub on_job_completed: JobCompletedFn,
    pub printer_list: PrinterListFn,
    pub on_fallback_to_polling: FallbackFn,
}

impl Default for CloudHooks {
    fn default() -> Self {
        Self {
            on_job_received: Box::new(|_, _, _| {}),
            on_job_completed: Box::new(|_, _, _| {}),
            printer_list: Box::new(Vec::new),
            on_fallback_to_polling: Box::new(|| {}),
        }
    }
}

impl std::fmt::Debug for CloudHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudHooks").finish_non_exhaustive()
    }
}
