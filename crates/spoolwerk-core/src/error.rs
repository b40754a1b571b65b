// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Spoolwerk.

use thiserror::Error;

/// Top-level error type for all Spoolwerk operations.
#[derive(Debug, Error)]
pub enum SpoolwerkError {
    // -- Printer errors --
    #[error("printer not found: {0}")]
    PrinterNotFound(String),

    #[error("failed to connect to printer {printer}: {detail}")]
    PrinterConnect { printer: String, detail: String },

    #[error("failed to send data to printer {printer}: {detail}")]
    PrinterWrite { printer: String, detail: String },

    #[error("printer transport not implemented: {0}")]
    UnsupportedTransport(String),

    // -- Job errors --
    #[error("decode error: {0}")]
    Decode(String),

    // -- Cloud errors --
    #[error("cloud request failed: {0}")]
    Cloud(String),

    #[error("connection closed with code {0}")]
    ConnectionClosed(u16),

    #[error("connection lost")]
    ConnectionLost,

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    // -- Passthrough --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpoolwerkError>;
