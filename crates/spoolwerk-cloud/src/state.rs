// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared connection-state model.
//
// One `TransportState` per transport instance, one lock. The read and write
// halves of a connection only share data through this struct, never through
// incidental captures.

use std::sync::Mutex;

use chrono::Utc;

use spoolwerk_core::types::ConnectionStatus;

#[derive(Debug, Default)]
struct StateInner {
    status: ConnectionStatus,
}

/// Connectivity state of one cloud transport, guarded by a single lock.
#[derive(Debug, Default)]
pub struct TransportState {
    inner: Mutex<StateInner>,
}

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for display. Cheap clone under the lock.
    pub fn snapshot(&self) -> ConnectionStatus {
        self.lock().status.clone()
    }

    /// The transport reached the cloud: connected, not reconnecting, error
    /// cleared, last-seen now.
    pub fn mark_connected(&self) {
        let mut inner = self.lock();
        inner.status.connected = true;
        inner.status.reconnecting = false;
        inner.status.last_error = None;
        inner.status.last_seen = Some(Utc::now());
    }

    /// The transport lost or failed to reach the cloud.
    pub fn mark_disconnected(&self, error: Option<String>, reconnecting: bool) {
        let mut inner = self.lock();
        inner.status.connected = false;
        inner.status.reconnecting = reconnecting;
        if error.is_some() {
            inner.status.last_error = error;
        }
    }

    /// Flip only the reconnecting flag (terminal failures clear it).
    pub fn set_reconnecting(&self, reconnecting: bool) {
        self.lock().status.reconnecting = reconnecting;
    }

    /// Record activity on a live connection.
    pub fn touch(&self) {
        self.lock().status.last_seen = Some(Utc::now());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateInner> {
        self.inner.lock().expect("transport state lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let state = TransportState::new();
        let status = state.snapshot();
        assert!(!status.connected);
        assert!(!status.reconnecting);
        assert!(status.last_error.is_none());
        assert!(status.last_seen.is_none());
    }

    #[test]
    fn connect_clears_error_and_sets_last_seen() {
        let state = TransportState::new();
        state.mark_disconnected(Some("poll returned 500".into()), false);
        assert!(!state.snapshot().connected);

        // A later success (e.g. heartbeat) is sufficient to mark healthy.
        state.mark_connected();
        let status = state.snapshot();
        assert!(status.connected);
        assert!(status.last_error.is_none());
        assert!(status.last_seen.is_some());
    }

    #[test]
    fn disconnect_keeps_previous_error_when_none_given() {
        let state = TransportState::new();
        state.mark_disconnected(Some("dial failed".into()), true);
        state.mark_disconnected(None, true);
        let status = state.snapshot();
        assert_eq!(status.last_error.as_deref(), Some("dial failed"));
        assert!(status.reconnecting);
    }

    #[test]
    fn terminal_failure_clears_reconnecting() {
        let state = TransportState::new();
        state.mark_disconnected(Some("authentication failed (HTTP 401)".into()), true);
        state.set_reconnecting(false);
        let status = state.snapshot();
        assert!(!status.connected);
        assert!(!status.reconnecting);
    }
}
