// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolwerk Cloud — the connectivity layer between the gateway and the
// remote print service. Exactly one transport runs at a time: the streaming
// WebSocket client (push delivery), or the HTTP polling client (pull
// delivery) as fallback. Both route jobs through the `PrinterManager` and
// report outcomes through injected hooks; neither reaches into the
// administrative layer.

pub mod api;
pub mod hooks;
pub mod messages;
pub mod polling;
pub mod reconnect;
pub mod state;
pub mod streaming;

pub use hooks::CloudHooks;
pub use polling::PollingClient;
pub use streaming::StreamingClient;

use base64::Engine;

/// Decode a job's base64 payload into raw printer bytes.
pub(crate) fn decode_payload(data: &str) -> spoolwerk_core::error::Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| spoolwerk_core::error::SpoolwerkError::Decode(e.to_string()))
}
