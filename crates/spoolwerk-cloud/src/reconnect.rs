// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconnect policy for the streaming transport.
//
// The cloud closes streaming connections with application close codes that
// carry retry semantics; everything else gets exponential backoff. The
// decisions live here as pure functions so the policy table is testable
// without a socket.

use std::time::Duration;

/// A newer connection from the same gateway replaced this one.
pub const CLOSE_REPLACED: u16 = 4000;
/// Missing headers, invalid API key, or unknown gateway.
pub const CLOSE_AUTH_FAILURE: u16 = 4001;
/// Too many concurrent connections.
pub const CLOSE_LIMIT_EXCEEDED: u16 = 4002;
/// Reached an API container instead of the streaming worker — routing
/// misconfigured; streaming will never work until the proxy is fixed.
pub const CLOSE_WRONG_WORKER: u16 = 4003;

/// Wait imposed by a limit-exceeded close, independent of backoff state.
const LIMIT_EXCEEDED_DELAY: Duration = Duration::from_secs(30);

/// What the reconnect loop should do after a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Stop permanently; the credentials are wrong.
    Terminal,
    /// Stop permanently and ask the owner to switch to polling.
    FallbackToPolling,
    /// Another instance took over; retry promptly from the base delay.
    ResetAndReconnect,
    /// Retry after a fixed delay, leaving the backoff counter untouched.
    FixedDelay(Duration),
    /// Generic failure: exponential backoff.
    Backoff,
}

/// Map a close code (if any) to the action the reconnect loop takes.
pub fn action_for_disconnect(close_code: Option<u16>) -> ReconnectAction {
    match close_code {
        Some(CLOSE_AUTH_FAILURE) => ReconnectAction::Terminal,
        Some(CLOSE_WRONG_WORKER) => ReconnectAction::FallbackToPolling,
        Some(CLOSE_REPLACED) => ReconnectAction::ResetAndReconnect,
        Some(CLOSE_LIMIT_EXCEEDED) => ReconnectAction::FixedDelay(LIMIT_EXCEEDED_DELAY),
        _ => ReconnectAction::Backoff,
    }
}

/// Equivalent close code for an HTTP rejection at the handshake.
///
/// 401/403 mean the credentials are bad; 404/502/503 mean the streaming
/// endpoint is structurally unreachable (wrong routing), same as 4003.
pub fn close_code_for_http_status(status: u16) -> Option<u16> {
    match status {
        401 | 403 => Some(CLOSE_AUTH_FAILURE),
        404 | 502 | 503 => Some(CLOSE_WRONG_WORKER),
        _ => None,
    }
}

/// Exponential backoff: `min(base * 2^n, max)` across consecutive failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    /// The delay to wait now, advancing the counter for the next failure.
    pub fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// The delay that `next` would return, without advancing.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Reset to the base delay (after a successful connection or a
    /// replaced-signal).
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_code_policy_table() {
        assert_eq!(
            action_for_disconnect(Some(CLOSE_REPLACED)),
            ReconnectAction::ResetAndReconnect
        );
        assert_eq!(
            action_for_disconnect(Some(CLOSE_AUTH_FAILURE)),
            ReconnectAction::Terminal
        );
        assert_eq!(
            action_for_disconnect(Some(CLOSE_LIMIT_EXCEEDED)),
            ReconnectAction::FixedDelay(Duration::from_secs(30))
        );
        assert_eq!(
            action_for_disconnect(Some(CLOSE_WRONG_WORKER)),
            ReconnectAction::FallbackToPolling
        );
        // Unknown codes and codeless disconnects both back off.
        assert_eq!(action_for_disconnect(Some(4005)), ReconnectAction::Backoff);
        assert_eq!(action_for_disconnect(Some(1006)), ReconnectAction::Backoff);
        assert_eq!(action_for_disconnect(None), ReconnectAction::Backoff);
    }

    #[test]
    fn handshake_status_mapping() {
        assert_eq!(close_code_for_http_status(401), Some(CLOSE_AUTH_FAILURE));
        assert_eq!(close_code_for_http_status(403), Some(CLOSE_AUTH_FAILURE));
        assert_eq!(close_code_for_http_status(404), Some(CLOSE_WRONG_WORKER));
        assert_eq!(close_code_for_http_status(502), Some(CLOSE_WRONG_WORKER));
        assert_eq!(close_code_for_http_status(503), Some(CLOSE_WRONG_WORKER));
        assert_eq!(close_code_for_http_status(500), None);
        assert_eq!(close_code_for_http_status(200), None);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        let mut backoff = Backoff::new(base, max);

        // delay after N consecutive failures = min(base * 2^N, max)
        let expected = [1u64, 2, 4, 8, 16, 30, 30, 30];
        for want in expected {
            assert_eq!(backoff.next(), Duration::from_secs(want));
        }
    }

    #[test]
    fn backoff_resets_to_base() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        backoff.next();
        backoff.next();
        assert_eq!(backoff.current(), Duration::from_secs(4));

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_secs(1));
        assert_eq!(backoff.next(), Duration::from_secs(1));
    }
}
