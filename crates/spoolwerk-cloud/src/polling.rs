// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polling cloud transport.
//
// The fallback when streaming is disabled or unreachable: a poll ticker asks
// the cloud for pending jobs, a heartbeat ticker pushes per-printer status.
// Each pending job is dispatched on its own task; outcomes are reported back
// over plain HTTP. Connectivity here is inferred — any successful request
// marks the transport healthy, any failed one records the error.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use spoolwerk_core::config::CloudConfig;
use spoolwerk_core::error::Result;
use spoolwerk_core::types::{ConnectionStatus, JobStatus};
use spoolwerk_print::PrinterManager;

use crate::api::CloudApi;
use crate::hooks::CloudHooks;
use crate::messages::PolledJob;
use crate::state::TransportState;

/// Heartbeats are on their own cadence, slower than the poll.
const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Persistent polling client. `start` launches the poll and heartbeat
/// tickers as one background task; `stop` signals shutdown and joins it.
pub struct PollingClient {
    inner: Arc<PollingInner>,
    shutdown: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

struct PollingInner {
    config: CloudConfig,
    manager: Arc<PrinterManager>,
    hooks: CloudHooks,
    api: CloudApi,
    state: TransportState,
}

impl PollingClient {
    pub fn new(
        config: CloudConfig,
        manager: Arc<PrinterManager>,
        hooks: CloudHooks,
    ) -> Result<Self> {
        let api = CloudApi::new(&config)?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(PollingInner {
                config,
                manager,
                hooks,
                api,
                state: TransportState::new(),
            }),
            shutdown,
            task: std::sync::Mutex::new(None),
        })
    }

    /// Launch the poll loop. Returns immediately.
    pub fn start(&self) {
        let inner = Arc::clone(&self.inner);
        let shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move { inner.poll_loop(shutdown).await });
        *self.task.lock().expect("task handle lock poisoned") = Some(handle);
    }

    /// Signal shutdown and join background work. In-flight job tasks are
    /// left to finish on their own.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.task.lock().expect("task handle lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Snapshot of the connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.snapshot()
    }

    /// Force a printer sync (e.g. after administrative printer edits).
    pub fn sync_printers(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.push_printer_list().await });
    }
}

impl PollingInner {
    async fn poll_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.poll_interval_secs,
            "polling transport started"
        );

        // Announce ourselves right away rather than waiting a full tick.
        self.push_printer_list().await;
        self.send_heartbeat().await;
        self.poll().await;

        let mut poll = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.poll_interval(),
            self.config.poll_interval(),
        );
        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + HEARTBEAT_INTERVAL,
            HEARTBEAT_INTERVAL,
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("polling transport stopped");
                    return;
                }
                _ = poll.tick() => self.poll().await,
                _ = heartbeat.tick() => self.send_heartbeat().await,
            }
        }
    }

    /// One poll round: fetch waiting jobs and dispatch the pending ones.
    async fn poll(self: &Arc<Self>) {
        let jobs = match self.api.fetch_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "poll failed");
                self.state.mark_disconnected(Some(e.to_string()), false);
                return;
            }
        };
        self.state.mark_connected();

        for job in jobs {
            if !job.is_pending() {
                debug!(job = %job.job_id, status = %job.status, "skipping non-pending job");
                continue;
            }
            let worker = Arc::clone(self);
            tokio::spawn(async move { worker.process_job(job).await });
        }
    }

    async fn process_job(self: Arc<Self>, job: PolledJob) {
        info!(job = %job.job_id, printer = %job.printer_id, "print job received via polling");

        if job.data.is_empty() {
            self.report(&job.job_id, JobStatus::Failed, Some("no print data")).await;
            (self.hooks.on_job_completed)(&job.job_id, JobStatus::Failed, Some("no print data"));
            return;
        }

        let payload = match crate::decode_payload(&job.data) {
            Ok(payload) => payload,
            Err(e) => {
                let detail = e.to_string();
                warn!(job = %job.job_id, error = %detail, "job payload is not valid base64");
                self.report(&job.job_id, JobStatus::Failed, Some(&detail)).await;
                (self.hooks.on_job_completed)(&job.job_id, JobStatus::Failed, Some(&detail));
                return;
            }
        };

        (self.hooks.on_job_received)(&job.job_id, &job.printer_id, payload.len());

        match self.manager.print(&job.printer_id, &payload).await {
            Ok(()) => {
                info!(job = %job.job_id, "print job completed");
                self.report(&job.job_id, JobStatus::Completed, None).await;
                (self.hooks.on_job_completed)(&job.job_id, JobStatus::Completed, None);
            }
            Err(e) => {
                let detail = e.to_string();
                warn!(job = %job.job_id, error = %detail, "print failed");
                self.report(&job.job_id, JobStatus::Failed, Some(&detail)).await;
                (self.hooks.on_job_completed)(&job.job_id, JobStatus::Failed, Some(&detail));
            }
        }
    }

    /// Best-effort status report; a failed report never fails the job.
    async fn report(&self, job_id: &str, status: JobStatus, error: Option<&str>) {
        if let Err(e) = self.api.report_status(job_id, status, error).await {
            warn!(job = %job_id, error = %e, "status report failed");
        }
    }

    async fn send_heartbeat(&self) {
        let statuses: std::collections::HashMap<String, String> = self
            .manager
            .statuses()
            .await
            .into_iter()
            .map(|(id, status)| (id, status.to_string()))
            .collect();
        match self.api.send_heartbeat(&statuses).await {
            Ok(()) => {
                debug!(printers = statuses.len(), "heartbeat sent");
                self.state.mark_connected();
            }
            Err(e) => {
                warn!(error = %e, "heartbeat failed");
                self.state.mark_disconnected(Some(e.to_string()), false);
            }
        }
    }

    async fn push_printer_list(&self) {
        let printers = (self.hooks.printer_list)();
        match self.api.sync_printers(&printers).await {
            Ok(()) => info!(printers = printers.len(), "printer list pushed to cloud"),
            Err(e) => warn!(error = %e, "printer sync failed"),
        }
    }
}
