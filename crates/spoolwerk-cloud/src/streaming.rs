// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Streaming cloud transport: one long-lived WebSocket.
//
// A reconnect loop dials the streaming endpoint, authenticating via request
// headers. While connected, a single session task multiplexes the read side
// (job frames, pong acknowledgements), a bounded outbound queue (status
// frames from concurrently-running jobs), and a keepalive ping ticker. Close
// signals from the cloud drive the retry policy in `reconnect`; a wrong-
// worker signal asks the owner to switch to the polling transport instead.

use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use spoolwerk_core::config::CloudConfig;
use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::{ConnectionStatus, JobStatus};
use spoolwerk_print::PrinterManager;

use crate::api::{API_KEY_HEADER, CloudApi, TENANT_HEADER};
use crate::hooks::CloudHooks;
use crate::messages::{InboundMessage, JobMessage, OutboundMessage, parse_inbound};
use crate::reconnect::{Backoff, ReconnectAction, action_for_disconnect, close_code_for_http_status};
use crate::state::TransportState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Capacity of the outbound frame queue. On overflow the newest frame is
/// dropped with a warning — the writer is never blocked by slow jobs.
const OUTBOUND_QUEUE_CAPACITY: usize = 10;

const HANDSHAKE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Per-frame write deadline.
const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Why a session (or a dial attempt) ended.
#[derive(Debug)]
struct Disconnect {
    close_code: Option<u16>,
    reason: String,
}

impl Disconnect {
    fn generic(reason: impl Into<String>) -> Self {
        Self {
            close_code: None,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Disconnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.close_code {
            Some(code) => write!(f, "{} (close code {})", self.reason, code),
            None => f.write_str(&self.reason),
        }
    }
}

enum SessionEnd {
    /// Local shutdown requested.
    Shutdown,
    /// The dial or the session failed; `connected` records whether a
    /// connection was established at all (it resets the backoff).
    Dropped {
        connected: bool,
        disconnect: Disconnect,
    },
}

/// Persistent streaming client. `start` launches the reconnect loop as a
/// background task; `stop` signals shutdown and joins it.
pub struct StreamingClient {
    inner: Arc<StreamingInner>,
    shutdown: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

struct StreamingInner {
    config: CloudConfig,
    manager: Arc<PrinterManager>,
    hooks: CloudHooks,
    api: CloudApi,
    state: TransportState,
}

impl StreamingClient {
    pub fn new(
        config: CloudConfig,
        manager: Arc<PrinterManager>,
        hooks: CloudHooks,
    ) -> Result<Self> {
        let api = CloudApi::new(&config)?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(StreamingInner {
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

    /// Launch the reconnect loop. Returns immediately.
    pub fn start(&self) {
        let inner = Arc::clone(&self.inner);
        let shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move { inner.connection_loop(shutdown).await });
        *self.task.lock().expect("task handle lock poisoned") = Some(handle);
    }

    /// Signal shutdown (a graceful close frame is sent when connected) and
    /// join background work.
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

    /// Force a printer sync over the HTTP side channel (e.g. after
    /// administrative printer edits).
    pub fn sync_printers(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.push_printer_list().await });
    }
}

impl StreamingInner {
    async fn connection_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(
            self.config.ws_reconnect_delay(),
            self.config.ws_max_reconnect_delay(),
        );

        loop {
            if *shutdown.borrow() {
                return;
            }

            match self.connect_and_run(&mut shutdown).await {
                SessionEnd::Shutdown => return,
                SessionEnd::Dropped {
                    connected,
                    disconnect,
                } => {
                    if connected {
                        // A session was established; consecutive-failure
                        // accounting starts over.
                        backoff.reset();
                    }
                    self.state
                        .mark_disconnected(Some(disconnect.to_string()), true);

                    let delay = match action_for_disconnect(disconnect.close_code) {
                        ReconnectAction::Terminal => {
                            error!(
                                error = %disconnect,
                                "streaming authentication failed; check API key and tenant; not reconnecting"
                            );
                            self.state.set_reconnecting(false);
                            return;
                        }
                        ReconnectAction::FallbackToPolling => {
                            warn!(
                                error = %disconnect,
                                "streaming endpoint not available; falling back to polling"
                            );
                            self.state.set_reconnecting(false);
                            (self.hooks.on_fallback_to_polling)();
                            return;
                        }
                        ReconnectAction::ResetAndReconnect => {
                            backoff.reset();
                            backoff.current()
                        }
                        ReconnectAction::FixedDelay(delay) => delay,
                        ReconnectAction::Backoff => backoff.next(),
                    };

                    info!(
                        delay_ms = delay.as_millis() as u64,
                        error = %disconnect,
                        "streaming disconnected; reconnecting after delay"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn connect_and_run(
        self: &Arc<Self>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                return SessionEnd::Dropped {
                    connected: false,
                    disconnect: Disconnect::generic(e.to_string()),
                };
            }
        };

        info!(endpoint = %self.config.ws_endpoint, "connecting to streaming endpoint");

        let ws = tokio::select! {
            _ = shutdown.changed() => return SessionEnd::Shutdown,
            result = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(request)) => {
                match result {
                    Err(_) => {
                        return SessionEnd::Dropped {
                            connected: false,
                            disconnect: Disconnect::generic("handshake timed out"),
                        };
                    }
                    Ok(Err(WsError::Http(response))) => {
                        let status = response.status().as_u16();
                        return SessionEnd::Dropped {
                            connected: false,
                            disconnect: Disconnect {
                                close_code: close_code_for_http_status(status),
                                reason: format!("handshake rejected (HTTP {status})"),
                            },
                        };
                    }
                    Ok(Err(e)) => {
                        return SessionEnd::Dropped {
                            connected: false,
                            disconnect: Disconnect::generic(format!("dial failed: {e}")),
                        };
                    }
                    Ok(Ok((ws, _response))) => ws,
                }
            }
        };

        self.state.mark_connected();
        info!("streaming connection established");

        // Keep the remote printer view current. This rides the HTTP side
        // channel, independent of the streaming socket.
        let sync = Arc::clone(self);
        tokio::spawn(async move { sync.push_printer_list().await });

        let end = self.run_session(ws, shutdown).await;
        info!("streaming connection closed");
        if matches!(end, SessionEnd::Shutdown) {
            self.state.mark_disconnected(None, false);
        }
        end
    }

    async fn run_session(
        self: &Arc<Self>,
        ws: WsStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE_CAPACITY);

        let mut ping = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.ws_ping_interval(),
            self.config.ws_ping_interval(),
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = tokio::time::timeout(
                        WRITE_TIMEOUT,
                        sink.send(Message::Close(None)),
                    )
                    .await;
                    return SessionEnd::Shutdown;
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.state.touch();
                        self.handle_frame(text.as_str(), &tx);
                    }
                    Some(Ok(Message::Close(close))) => {
                        let code = close.as_ref().map(|f| u16::from(f.code));
                        let reason = close
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| match code {
                                Some(code) => SpoolwerkError::ConnectionClosed(code).to_string(),
                                None => SpoolwerkError::ConnectionLost.to_string(),
                            });
                        return SessionEnd::Dropped {
                            connected: true,
                            disconnect: Disconnect { close_code: code, reason },
                        };
                    }
                    // Protocol-level pings/pongs are handled by tungstenite;
                    // binary frames are not part of this protocol.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return SessionEnd::Dropped {
                            connected: true,
                            disconnect: Disconnect::generic(format!("read error: {e}")),
                        };
                    }
                    None => {
                        return SessionEnd::Dropped {
                            connected: true,
                            disconnect: Disconnect::generic(
                                SpoolwerkError::ConnectionLost.to_string(),
                            ),
                        };
                    }
                },
                Some(outbound) = rx.recv() => {
                    if let Err(end) = self.write_frame(&mut sink, &outbound).await {
                        return end;
                    }
                }
                _ = ping.tick() => {
                    if let Err(end) = self.write_frame(&mut sink, &OutboundMessage::Ping).await {
                        return end;
                    }
                }
            }
        }
    }

    async fn write_frame(
        &self,
        sink: &mut WsSink,
        message: &OutboundMessage,
    ) -> std::result::Result<(), SessionEnd> {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize outbound frame");
                return Ok(());
            }
        };

        match tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::text(payload))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionEnd::Dropped {
                connected: true,
                disconnect: Disconnect::generic(format!("write error: {e}")),
            }),
            Err(_) => Err(SessionEnd::Dropped {
                connected: true,
                disconnect: Disconnect::generic("write timed out"),
            }),
        }
    }

    fn handle_frame(self: &Arc<Self>, raw: &str, tx: &mpsc::Sender<OutboundMessage>) {
        match parse_inbound(raw) {
            Ok(InboundMessage::Job(job)) => {
                // One task per job: a slow print must not stall reads or
                // keepalives.
                let worker = Arc::clone(self);
                let tx = tx.clone();
                tokio::spawn(async move { worker.handle_job(job, tx).await });
            }
            Ok(InboundMessage::Pong) => {
                debug!("keepalive acknowledged");
            }
            Ok(InboundMessage::Unknown(kind)) => {
                warn!(kind = %kind, "unknown streaming message type");
            }
            Err(e) => {
                warn!(error = %e, "failed to parse streaming message");
            }
        }
    }

    async fn handle_job(self: Arc<Self>, job: JobMessage, tx: mpsc::Sender<OutboundMessage>) {
        info!(job = %job.job_id, printer = %job.printer_id, "print job received over streaming");

        if job.data.is_empty() {
            Self::queue_status(&tx, &job.job_id, JobStatus::Failed, Some("no print data".into()));
            (self.hooks.on_job_completed)(&job.job_id, JobStatus::Failed, Some("no print data"));
            return;
        }

        let payload = match crate::decode_payload(&job.data) {
            Ok(payload) => payload,
            Err(e) => {
                let detail = e.to_string();
                warn!(job = %job.job_id, error = %detail, "job payload is not valid base64");
                Self::queue_status(&tx, &job.job_id, JobStatus::Failed, Some(detail.clone()));
                (self.hooks.on_job_completed)(&job.job_id, JobStatus::Failed, Some(&detail));
                return;
            }
        };

        (self.hooks.on_job_received)(&job.job_id, &job.printer_id, payload.len());
        Self::queue_status(&tx, &job.job_id, JobStatus::Printing, None);

        match self.manager.print(&job.printer_id, &payload).await {
            Ok(()) => {
                info!(job = %job.job_id, "print job completed");
                Self::queue_status(&tx, &job.job_id, JobStatus::Completed, None);
                (self.hooks.on_job_completed)(&job.job_id, JobStatus::Completed, None);
            }
            Err(e) => {
                let detail = e.to_string();
                warn!(job = %job.job_id, error = %detail, "print failed");
                Self::queue_status(&tx, &job.job_id, JobStatus::Failed, Some(detail.clone()));
                (self.hooks.on_job_completed)(&job.job_id, JobStatus::Failed, Some(&detail));
            }
        }
    }

    /// Non-blocking enqueue toward the writer. On a full queue the new frame
    /// is dropped — never block the connection on a slow writer.
    fn queue_status(
        tx: &mpsc::Sender<OutboundMessage>,
        job_id: &str,
        status: JobStatus,
        error: Option<String>,
    ) {
        match tx.try_send(OutboundMessage::status(job_id, status, error)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(job = %job_id, "outbound queue full, dropping status frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(job = %job_id, "connection gone, status frame dropped");
            }
        }
    }

    async fn push_printer_list(self: Arc<Self>) {
        let printers = (self.hooks.printer_list)();
        match self.api.sync_printers(&printers).await {
            Ok(()) => info!(printers = printers.len(), "printer list pushed to cloud"),
            Err(e) => warn!(error = %e, "printer sync failed"),
        }
    }

    fn build_request(&self) -> Result<Request> {
        let mut request = self
            .config
            .ws_endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| SpoolwerkError::Cloud(format!("bad streaming endpoint: {e}")))?;

        let headers = request.headers_mut();
        if !self.config.api_key.is_empty() {
            headers.insert(
                API_KEY_HEADER,
                HeaderValue::from_str(&self.config.api_key)
                    .map_err(|e| SpoolwerkError::Cloud(format!("bad API key header: {e}")))?,
            );
        }
        if !self.config.tenant.is_empty() {
            headers.insert(
                TENANT_HEADER,
                HeaderValue::from_str(&self.config.tenant)
                    .map_err(|e| SpoolwerkError::Cloud(format!("bad tenant header: {e}")))?,
            );
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::{Duration, sleep};

    use spoolwerk_core::error::Result as CoreResult;
    use spoolwerk_core::types::{PrinterKind, PrinterStatus};
    use spoolwerk_print::Printer;

    struct RecordingPrinter {
        prints: Mutex<Vec<Vec<u8>>>,
        fail_with: Option<String>,
    }

    impl RecordingPrinter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prints: Mutex::new(Vec::new()),
                fail_with: None,
            })
        }

        fn failing(detail: &str) -> Arc<Self> {
            Arc::new(Self {
                prints: Mutex::new(Vec::new()),
                fail_with: Some(detail.into()),
            })
        }

        fn print_count(&self) -> usize {
            self.prints.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Printer for RecordingPrinter {
        fn id(&self) -> &str {
            "p1"
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn kind(&self) -> PrinterKind {
            PrinterKind::Network
        }

        async fn status(&self) -> PrinterStatus {
            PrinterStatus::Online
        }

        async fn print(&self, data: &[u8]) -> CoreResult<()> {
            if let Some(detail) = &self.fail_with {
                return Err(SpoolwerkError::PrinterWrite {
                    printer: "p1".into(),
                    detail: detail.clone(),
                });
            }
            self.prints.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn close(&self) -> CoreResult<()> {
            Ok(())
        }
    }

    async fn test_inner(
        printer: Arc<RecordingPrinter>,
        hooks: CloudHooks,
    ) -> Arc<StreamingInner> {
        let manager = Arc::new(PrinterManager::new());
        manager.add_printer(printer).await;
        let config = CloudConfig::default();
        Arc::new(StreamingInner {
            api: CloudApi::new(&config).unwrap(),
            config,
            manager,
            hooks,
            state: TransportState::new(),
        })
    }

    fn job(job_id: &str, printer_id: &str, data: &str) -> JobMessage {
        JobMessage {
            job_id: job_id.into(),
            printer_id: printer_id.into(),
            data: data.into(),
            priority: None,
            options: None,
        }
    }

    fn expect_status(msg: OutboundMessage) -> (String, JobStatus, Option<String>) {
        match msg {
            OutboundMessage::Status {
                job_id,
                status,
                error,
            } => (job_id, status, error),
            other => panic!("expected status frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_base64_reports_failed_and_never_prints() {
        let printer = RecordingPrinter::new();
        let inner = test_inner(printer.clone(), CloudHooks::default()).await;
        let (tx, mut rx) = mpsc::channel(10);

        inner.handle_job(job("j1", "p1", "!!!not-base64!!!"), tx).await;

        let (job_id, status, error) = expect_status(rx.recv().await.unwrap());
        assert_eq!(job_id, "j1");
        assert_eq!(status, JobStatus::Failed);
        assert!(error.unwrap().contains("decode error"));
        assert_eq!(printer.print_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_payload_fails_without_touching_hardware() {
        let printer = RecordingPrinter::new();
        let inner = test_inner(printer.clone(), CloudHooks::default()).await;
        let (tx, mut rx) = mpsc::channel(10);

        inner.handle_job(job("j1", "p1", ""), tx).await;

        let (_, status, error) = expect_status(rx.recv().await.unwrap());
        assert_eq!(status, JobStatus::Failed);
        assert_eq!(error.as_deref(), Some("no print data"));
        assert_eq!(printer.print_count(), 0);
    }

    #[tokio::test]
    async fn successful_job_reports_printing_then_completed() {
        let completions: Arc<Mutex<Vec<(String, JobStatus)>>> = Arc::default();
        let seen = completions.clone();
        let hooks = CloudHooks {
            on_job_completed: Box::new(move |id, status, _| {
                seen.lock().unwrap().push((id.into(), status));
            }),
            ..CloudHooks::default()
        };

        let printer = RecordingPrinter::new();
        let inner = test_inner(printer.clone(), hooks).await;
        let (tx, mut rx) = mpsc::channel(10);

        let data = BASE64.encode(b"\x1b@receipt");
        inner.handle_job(job("j1", "p1", &data), tx).await;

        let (_, first, _) = expect_status(rx.recv().await.unwrap());
        let (_, second, _) = expect_status(rx.recv().await.unwrap());
        assert_eq!(first, JobStatus::Printing);
        assert_eq!(second, JobStatus::Completed);

        assert_eq!(printer.print_count(), 1);
        assert_eq!(printer.prints.lock().unwrap()[0], b"\x1b@receipt");
        assert_eq!(
            completions.lock().unwrap().as_slice(),
            &[("j1".to_string(), JobStatus::Completed)]
        );
    }

    #[tokio::test]
    async fn printer_failure_reports_failed_with_error_text() {
        let printer = RecordingPrinter::failing("connection reset by printer");
        let inner = test_inner(printer, CloudHooks::default()).await;
        let (tx, mut rx) = mpsc::channel(10);

        let data = BASE64.encode(b"bytes");
        inner.handle_job(job("j1", "p1", &data), tx).await;

        let (_, first, _) = expect_status(rx.recv().await.unwrap());
        assert_eq!(first, JobStatus::Printing);
        let (_, second, error) = expect_status(rx.recv().await.unwrap());
        assert_eq!(second, JobStatus::Failed);
        assert!(error.unwrap().contains("connection reset by printer"));
    }

    #[tokio::test]
    async fn unknown_printer_reports_failed_not_found() {
        let printer = RecordingPrinter::new();
        let inner = test_inner(printer.clone(), CloudHooks::default()).await;
        let (tx, mut rx) = mpsc::channel(10);

        let data = BASE64.encode(b"bytes");
        inner.handle_job(job("j1", "missing-id", &data), tx).await;

        let (_, _, _) = expect_status(rx.recv().await.unwrap()); // printing
        let (_, status, error) = expect_status(rx.recv().await.unwrap());
        assert_eq!(status, JobStatus::Failed);
        assert!(error.unwrap().contains("printer not found"));
        assert_eq!(printer.print_count(), 0);
    }

    #[tokio::test]
    async fn full_outbound_queue_drops_the_new_frame() {
        let (tx, mut rx) = mpsc::channel(2);
        StreamingInner::queue_status(&tx, "j1", JobStatus::Printing, None);
        StreamingInner::queue_status(&tx, "j2", JobStatus::Printing, None);
        StreamingInner::queue_status(&tx, "j3", JobStatus::Completed, None);

        let (first, ..) = expect_status(rx.recv().await.unwrap());
        let (second, ..) = expect_status(rx.recv().await.unwrap());
        assert_eq!(first, "j1");
        assert_eq!(second, "j2");
        assert!(rx.try_recv().is_err());
    }

    /// Minimal HTTP responder that rejects every upgrade with a fixed
    /// status line, counting accepted connections.
    async fn rejecting_server(status_line: &'static str) -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicUsize::new(0));
        let counter = accepts.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });

        (port, accepts)
    }

    fn local_ws_config(port: u16) -> CloudConfig {
        CloudConfig {
            ws_endpoint: format!("ws://127.0.0.1:{port}/ws"),
            // unroutable; keeps the on-connect printer sync local
            endpoint: "http://127.0.0.1:1/api/v1/print".into(),
            api_key: "key".into(),
            // zero base delay: were the client to retry, attempts would pile
            // up within the assertion window
            ws_reconnect_delay_secs: 0,
            ws_max_reconnect_delay_secs: 0,
            ..CloudConfig::default()
        }
    }

    #[tokio::test]
    async fn handshake_404_falls_back_to_polling_exactly_once() {
        let (port, accepts) = rejecting_server("404 Not Found").await;
        let fallbacks = Arc::new(AtomicUsize::new(0));
        let counter = fallbacks.clone();
        let hooks = CloudHooks {
            on_fallback_to_polling: Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            ..CloudHooks::default()
        };

        let client = StreamingClient::new(
            local_ws_config(port),
            Arc::new(PrinterManager::new()),
            hooks,
        )
        .unwrap();
        client.start();
        sleep(Duration::from_millis(400)).await;

        assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(accepts.load(Ordering::SeqCst), 1);
        let status = client.status();
        assert!(!status.connected);
        assert!(!status.reconnecting);
        client.stop().await;
    }

    #[tokio::test]
    async fn handshake_401_is_terminal_without_fallback() {
        let (port, accepts) = rejecting_server("401 Unauthorized").await;
        let fallbacks = Arc::new(AtomicUsize::new(0));
        let counter = fallbacks.clone();
        let hooks = CloudHooks {
            on_fallback_to_polling: Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            ..CloudHooks::default()
        };

        let client = StreamingClient::new(
            local_ws_config(port),
            Arc::new(PrinterManager::new()),
            hooks,
        )
        .unwrap();
        client.start();
        sleep(Duration::from_millis(400)).await;

        // Terminal: no fallback, no further connection attempts.
        assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
        assert_eq!(accepts.load(Ordering::SeqCst), 1);
        let status = client.status();
        assert!(!status.connected);
        assert!(!status.reconnecting);
        assert!(status.last_error.unwrap().contains("HTTP 401"));
        client.stop().await;
    }

    /// WebSocket server that completes the upgrade, then immediately closes
    /// with the given application close code.
    async fn closing_ws_server(code: u16) -> (u16, Arc<AtomicUsize>) {
        use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicUsize::new(0));
        let counter = accepts.clone();

        tokio::spawn(async move {
            loop {
                let Ok((sock, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let Ok(mut ws) = tokio_tungstenite::accept_async(sock).await else {
                    continue;
                };
                let _ = ws
                    .send(Message::Close(Some(CloseFrame {
                        code: code.into(),
                        reason: "".into(),
                    })))
                    .await;
                while let Some(Ok(_)) = ws.next().await {}
            }
        });

        (port, accepts)
    }

    #[tokio::test]
    async fn close_code_4001_stops_reconnecting() {
        let (port, accepts) = closing_ws_server(4001).await;
        let client = StreamingClient::new(
            local_ws_config(port),
            Arc::new(PrinterManager::new()),
            CloudHooks::default(),
        )
        .unwrap();
        client.start();
        sleep(Duration::from_millis(400)).await;

        assert_eq!(accepts.load(Ordering::SeqCst), 1);
        let status = client.status();
        assert!(!status.connected);
        assert!(!status.reconnecting);
        assert!(status.last_error.unwrap().contains("4001"));
        client.stop().await;
    }

    #[tokio::test]
    async fn close_code_4000_reconnects_promptly() {
        let (port, accepts) = closing_ws_server(4000).await;
        let client = StreamingClient::new(
            local_ws_config(port),
            Arc::new(PrinterManager::new()),
            CloudHooks::default(),
        )
        .unwrap();
        client.start();
        sleep(Duration::from_millis(400)).await;
        client.stop().await;

        // Replaced means retry from the base delay, so several sessions fit
        // in the window.
        assert!(accepts.load(Ordering::SeqCst) >= 2);
    }
}
