// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolwerk — local cloud-to-thermal-printer gateway
//
// Entry point. Initialises logging, loads configuration, builds the printer
// registry, and runs exactly one cloud transport at a time: streaming when
// configured, polling otherwise. The streaming client can ask for a switch
// to polling at runtime via the fallback hook; ctrl-c stops whichever
// transport is active.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use spoolwerk_cloud::{CloudHooks, PollingClient, StreamingClient};
use spoolwerk_core::config::GatewayConfig;
use spoolwerk_core::error::Result;
use spoolwerk_core::types::{PrinterKind, PrinterSyncEntry};
use spoolwerk_print::PrinterManager;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Spoolwerk gateway starting");

    let config = match GatewayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "configuration not loaded, running with defaults");
            GatewayConfig::default()
        }
    };

    let manager = Arc::new(PrinterManager::from_descriptors(&config.printers).await);
    info!(
        printers = manager.printer_ids().await.len(),
        "printer registry built"
    );

    // Sync payloads come from configuration: it knows paper widths, the
    // registry does not. Usb entries were never registered, so skip them
    // here too.
    let sync_entries: Vec<PrinterSyncEntry> = config
        .printers
        .iter()
        .filter(|d| d.kind == PrinterKind::Network)
        .map(PrinterSyncEntry::from)
        .collect();

    if config.cloud.use_websocket {
        run_streaming(config, manager, sync_entries).await?;
    } else {
        run_polling(config, manager, sync_entries).await?;
    }

    info!("Spoolwerk gateway stopped");
    Ok(())
}

/// Run the streaming transport, switching to polling if it signals fallback.
async fn run_streaming(
    config: GatewayConfig,
    manager: Arc<PrinterManager>,
    sync_entries: Vec<PrinterSyncEntry>,
) -> Result<()> {
    let (fallback_tx, mut fallback_rx) = mpsc::channel::<()>(1);

    let streaming = StreamingClient::new(
        config.cloud.clone(),
        Arc::clone(&manager),
        gateway_hooks(sync_entries.clone(), Some(fallback_tx)),
    )?;
    streaming.start();
    info!(endpoint = %config.cloud.ws_endpoint, "streaming transport selected");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            streaming.stop().await;
            Ok(())
        }
        Some(()) = fallback_rx.recv() => {
            streaming.stop().await;
            run_polling(config, manager, sync_entries).await
        }
    }
}

/// Run the polling transport until ctrl-c.
async fn run_polling(
    config: GatewayConfig,
    manager: Arc<PrinterManager>,
    sync_entries: Vec<PrinterSyncEntry>,
) -> Result<()> {
    let polling = PollingClient::new(
        config.cloud.clone(),
        manager,
        gateway_hooks(sync_entries, None),
    )?;
    polling.start();
    info!(endpoint = %config.cloud.endpoint, "polling transport selected");

    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    polling.stop().await;
    Ok(())
}

/// Callback bundle for a transport. The fallback sender is wired only for
/// streaming; polling has nothing to fall back to.
fn gateway_hooks(
    printers: Vec<PrinterSyncEntry>,
    fallback: Option<mpsc::Sender<()>>,
) -> CloudHooks {
    let mut hooks = CloudHooks {
        printer_list: Box::new(move || printers.clone()),
        ..CloudHooks::default()
    };
    if let Some(tx) = fallback {
        hooks.on_fallback_to_polling = Box::new(move || {
            let _ = tx.try_send(());
        });
    }
    hooks
}
