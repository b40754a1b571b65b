// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire frames exchanged with the cloud service.
//
// Inbound frames are dispatched on their `type` field by hand rather than an
// internally-tagged enum, so an unknown type is something we can log and
// drop instead of a hard deserialization error.

use serde::{Deserialize, Serialize};

use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::JobStatus;

/// A print job pushed over the streaming connection.
#[derive(Debug, Clone, Deserialize)]
pub struct JobMessage {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub printer_id: String,
    /// Base64-encoded ESC/POS payload.
    #[serde(default)]
    pub data: String,
    pub priority: Option<i64>,
    pub options: Option<serde_json::Value>,
}

/// Messages received from the cloud over the streaming connection.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Job(JobMessage),
    /// Acknowledgement of an application-level ping.
    Pong,
    /// A type this gateway does not understand; logged and dropped.
    Unknown(String),
}

/// Parse one inbound frame. Fails only on malformed JSON or a missing/
/// non-string `type` field.
pub fn parse_inbound(raw: &str) -> Result<InboundMessage> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| SpoolwerkError::Cloud("frame without a type field".into()))?;

    match kind {
        "job" => {
            let job: JobMessage = serde_json::from_value(value.clone())?;
            Ok(InboundMessage::Job(job))
        }
        "pong" => Ok(InboundMessage::Pong),
        other => Ok(InboundMessage::Unknown(other.to_owned())),
    }
}

/// Messages sent to the cloud over the streaming connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Ping,
    Status {
        job_id: String,
        status: JobStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl OutboundMessage {
    pub fn status(job_id: &str, status: JobStatus, error: Option<String>) -> Self {
        Self::Status {
            job_id: job_id.to_owned(),
            status,
            error,
        }
    }
}

/// One job as returned by the polling endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PolledJob {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub printer_id: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub status: String,
}

impl PolledJob {
    /// Only `pending` jobs are ever dispatched to a printer.
    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }
}

/// Response body of `GET /servers/{id}/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<PolledJob>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_frame() {
        let raw = r#"{"type":"job","job_id":"j1","printer_id":"p1","data":"aGVsbG8=","priority":2,"options":{"copies":1}}"#;
        match parse_inbound(raw).unwrap() {
            InboundMessage::Job(job) => {
                assert_eq!(job.job_id, "j1");
                assert_eq!(job.printer_id, "p1");
                assert_eq!(job.data, "aGVsbG8=");
                assert_eq!(job.priority, Some(2));
                assert!(job.options.is_some());
            }
            other => panic!("expected job, got {other:?}"),
        }
    }

    #[test]
    fn parses_job_frame_without_optionals() {
        let raw = r#"{"type":"job","job_id":"j1","printer_id":"p1","data":""}"#;
        assert!(matches!(
            parse_inbound(raw).unwrap(),
            InboundMessage::Job(_)
        ));
    }

    #[test]
    fn parses_pong_frame() {
        assert!(matches!(
            parse_inbound(r#"{"type":"pong"}"#).unwrap(),
            InboundMessage::Pong
        ));
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        match parse_inbound(r#"{"type":"surprise"}"#).unwrap() {
            InboundMessage::Unknown(t) => assert_eq!(t, "surprise"),
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn missing_type_fails() {
        assert!(parse_inbound(r#"{"job_id":"j1"}"#).is_err());
        assert!(parse_inbound("not json").is_err());
    }

    #[test]
    fn ping_wire_shape() {
        let json = serde_json::to_value(&OutboundMessage::Ping).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ping"}));
    }

    #[test]
    fn status_wire_shape() {
        let msg = OutboundMessage::status("j1", JobStatus::Failed, Some("decode error".into()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "status",
                "job_id": "j1",
                "status": "failed",
                "error": "decode error"
            })
        );
    }

    #[test]
    fn status_omits_absent_error() {
        let msg = OutboundMessage::status("j1", JobStatus::Completed, None);
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn jobs_response_defaults_to_empty() {
        let resp: JobsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.jobs.is_empty());

        let resp: JobsResponse = serde_json::from_str(
            r#"{"jobs":[{"job_id":"j1","printer_id":"p1","data":"","status":"pending"}]}"#,
        )
        .unwrap();
        assert!(resp.jobs[0].is_pending());
    }
}
