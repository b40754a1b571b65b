// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Spoolwerk gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a printer is physically reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterKind {
    /// Raw TCP socket, typically port 9100.
    Network,
    /// USB-attached. Declared for configuration compatibility; no transport
    /// is implemented for it.
    Usb,
}

impl PrinterKind {
    /// Wire string used in sync payloads and discovery results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Usb => "usb",
        }
    }
}

impl std::fmt::Display for PrinterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured printer as known to the registry.
///
/// Created from configuration at startup or by the administrative layer;
/// owned exclusively by the `PrinterManager` once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterDescriptor {
    /// Unique, stable identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: PrinterKind,
    /// Network address (for `kind = network`).
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Paper width in millimetres: 58 or 80.
    #[serde(default = "default_paper_width")]
    pub paper_width: u32,
}

fn default_kind() -> PrinterKind {
    PrinterKind::Network
}

fn default_port() -> u16 {
    9100
}

fn default_paper_width() -> u32 {
    80
}

/// Liveness of a single printer as seen by its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterStatus {
    Online,
    Offline,
}

impl PrinterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle states a job reports back to the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Printing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a cloud transport's connectivity, read by the owner for
/// display. Produced under the transport's state lock; never mutated from
/// outside.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub reconnecting: bool,
    pub last_error: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// A printer found by a network discovery scan. Ephemeral — not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPrinter {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PrinterKind,
    pub address: String,
    pub port: u16,
}

/// One entry of the printer list pushed to the cloud on sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterSyncEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PrinterKind,
    pub paper_width: u32,
}

impl From<&PrinterDescriptor> for PrinterSyncEntry {
    fn from(d: &PrinterDescriptor) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            kind: d.kind,
            paper_width: d.paper_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults_apply() {
        let d: PrinterDescriptor = toml::from_str(
            r#"
            id = "front-desk"
            name = "Front Desk"
            address = "192.168.1.50"
            "#,
        )
        .unwrap();
        assert_eq!(d.kind, PrinterKind::Network);
        assert_eq!(d.port, 9100);
        assert_eq!(d.paper_width, 80);
    }

    #[test]
    fn status_wire_strings() {
        assert_eq!(PrinterStatus::Online.as_str(), "online");
        assert_eq!(PrinterStatus::Offline.as_str(), "offline");
        assert_eq!(JobStatus::Printing.as_str(), "printing");
        assert_eq!(JobStatus::Completed.as_str(), "completed");
        assert_eq!(JobStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn sync_entry_uses_type_key() {
        let entry = PrinterSyncEntry {
            id: "p1".into(),
            name: "Kitchen".into(),
            kind: PrinterKind::Network,
            paper_width: 58,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "network");
        assert_eq!(json["paper_width"], 58);
    }
}
