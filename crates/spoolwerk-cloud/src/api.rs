// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP side of the cloud protocol.
//
// Used by the polling transport for everything, and by the streaming
// transport as the one-shot side channel for printer sync. All requests
// carry the API key header and, when set, the tenant header.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use spoolwerk_core::config::CloudConfig;
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{JobStatus, PrinterSyncEntry};

use crate::messages::{JobsResponse, PolledJob};

pub(crate) const API_KEY_HEADER: &str = "X-API-Key";
pub(crate) const TENANT_HEADER: &str = "X-DB-Name";

/// Per-request deadline for all cloud HTTP calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct StatusBody<'a> {
    status: &'a str,
    error: &'a str,
}

#[derive(Serialize)]
struct HeartbeatBody<'a> {
    printers: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct SyncBody<'a> {
    printers: &'a [PrinterSyncEntry],
}

/// Thin client for the cloud's HTTP endpoints.
pub struct CloudApi {
    http: reqwest::Client,
    endpoint: String,
    server_id: String,
    api_key: String,
    tenant: String,
}

impl CloudApi {
    pub fn new(config: &CloudConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SpoolwerkError::Cloud(format!("http client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            server_id: config.server_id.clone(),
            api_key: config.api_key.clone(),
            tenant: config.tenant.clone(),
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/servers/{}{}", self.endpoint, self.server_id, suffix)
    }

    fn with_headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header(API_KEY_HEADER, &self.api_key);
        if self.tenant.is_empty() {
            req
        } else {
            req.header(TENANT_HEADER, &self.tenant)
        }
    }

    /// `GET /servers/{id}/jobs` — list jobs waiting for this gateway.
    pub async fn fetch_jobs(&self) -> Result<Vec<PolledJob>> {
        let resp = self
            .with_headers(self.http.get(self.url("/jobs")))
            .send()
            .await
            .map_err(|e| SpoolwerkError::Cloud(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpoolwerkError::Cloud(format!(
                "poll returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let result: JobsResponse = resp
            .json()
            .await
            .map_err(|e| SpoolwerkError::Cloud(format!("parse poll response: {e}")))?;
        debug!(jobs = result.jobs.len(), "poll response received");
        Ok(result.jobs)
    }

    /// `PATCH /servers/{id}/jobs/{job_id}` — report a job's status.
    pub async fn report_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let body = StatusBody {
            status: status.as_str(),
            error: error.unwrap_or(""),
        };
        let resp = self
            .with_headers(self.http.patch(self.url(&format!("/jobs/{job_id}"))))
            .json(&body)
            .send()
            .await
            .map_err(|e| SpoolwerkError::Cloud(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpoolwerkError::Cloud(format!(
                "status report returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(())
    }

    /// `POST /servers/{id}/heartbeat` — per-printer status map.
    pub async fn send_heartbeat(&self, printers: &HashMap<String, String>) -> Result<()> {
        let resp = self
            .with_headers(self.http.post(self.url("/heartbeat")))
            .json(&HeartbeatBody { printers })
            .send()
            .await
            .map_err(|e| SpoolwerkError::Cloud(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpoolwerkError::Cloud(format!(
                "heartbeat returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(())
    }

    /// `PUT /servers/{id}/printers` — push the current printer list.
    pub async fn sync_printers(&self, printers: &[PrinterSyncEntry]) -> Result<()> {
        let resp = self
            .with_headers(self.http.put(self.url("/printers")))
            .json(&SyncBody { printers })
            .send()
            .await
            .map_err(|e| SpoolwerkError::Cloud(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpoolwerkError::Cloud(format!(
                "printer sync returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        debug!(printers = printers.len(), "printers synced to cloud");
        Ok(())
    }
}
