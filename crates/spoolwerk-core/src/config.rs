// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gateway configuration.
//
// Loaded once at startup from a TOML file; durations are plain seconds.
// Persistence (writing edits back to disk) belongs to the administrative
// layer, not here.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoolwerkError};
use crate::types::PrinterDescriptor;

/// Well-known config file locations, probed in order.
const CONFIG_PATHS: &[&str] = &[
    "spoolwerk.toml",
    "configs/spoolwerk.toml",
    "/etc/spoolwerk/spoolwerk.toml",
];

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub cloud: CloudConfig,
    #[serde(rename = "printer")]
    pub printers: Vec<PrinterDescriptor>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cloud: CloudConfig::default(),
            printers: Vec::new(),
        }
    }
}

/// Local administrative HTTP server settings (consumed by the admin layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Cloud connection settings shared by both transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base HTTP endpoint for polling, heartbeats, and printer sync.
    pub endpoint: String,
    /// Identifier of this gateway as registered with the cloud.
    pub server_id: String,
    pub api_key: String,
    /// Tenant identifier; sent as the `X-DB-Name` header when non-empty.
    pub tenant: String,
    /// Optional display identity.
    pub server_name: Option<String>,
    pub location: Option<String>,

    /// When true the streaming (WebSocket) transport is used; otherwise
    /// polling.
    pub use_websocket: bool,
    pub ws_endpoint: String,
    pub ws_reconnect_delay_secs: u64,
    pub ws_max_reconnect_delay_secs: u64,
    pub ws_ping_interval_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.spoolwerk.dev/api/v1/print".into(),
            server_id: String::new(),
            api_key: String::new(),
            tenant: String::new(),
            server_name: None,
            location: None,
            use_websocket: false,
            ws_endpoint: "wss://api.spoolwerk.dev/api/v1/print/ws".into(),
            ws_reconnect_delay_secs: 1,
            ws_max_reconnect_delay_secs: 30,
            ws_ping_interval_secs: 30,
            poll_interval_secs: 5,
        }
    }
}

impl CloudConfig {
    pub fn ws_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.ws_reconnect_delay_secs)
    }

    pub fn ws_max_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.ws_max_reconnect_delay_secs)
    }

    pub fn ws_ping_interval(&self) -> Duration {
        Duration::from_secs(self.ws_ping_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl GatewayConfig {
    /// Load configuration from the first config file found in the well-known
    /// locations. Errors if no file exists — callers typically fall back to
    /// `GatewayConfig::default()` with a warning.
    pub fn load() -> Result<Self> {
        for path in CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::load_from(path);
            }
        }
        Err(SpoolwerkError::Config(
            "no config file found in well-known locations".into(),
        ))
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| SpoolwerkError::Config(e.to_string()))
    }
}
