// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS command construction for the self-test receipt.
//
// The byte sequence here is wire-compatible with common thermal hardware
// (Epson TM series and clones): initialize, centered bold double-size
// banner, normal body lines with a timestamp, centered footer, partial cut.

/// ESC @ — initialize printer.
pub const INIT: [u8; 2] = [0x1B, 0x40];
/// ESC a 0 — left align.
pub const ALIGN_LEFT: [u8; 3] = [0x1B, 0x61, 0x00];
/// ESC a 1 — center align.
pub const ALIGN_CENTER: [u8; 3] = [0x1B, 0x61, 0x01];
/// ESC E n — bold on/off.
pub const BOLD_ON: [u8; 3] = [0x1B, 0x45, 0x01];
pub const BOLD_OFF: [u8; 3] = [0x1B, 0x45, 0x00];
/// GS ! n — character size (0x11 = double width + double height).
pub const SIZE_DOUBLE: [u8; 3] = [0x1D, 0x21, 0x11];
pub const SIZE_NORMAL: [u8; 3] = [0x1D, 0x21, 0x00];
/// GS V 66 0 — partial paper cut.
pub const PARTIAL_CUT: [u8; 4] = [0x1D, 0x56, 0x42, 0x00];

/// Build the canned self-test receipt.
pub fn build_test_receipt() -> Vec<u8> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    let mut data = Vec::with_capacity(128);
    data.extend_from_slice(&INIT);
    data.extend_from_slice(&ALIGN_CENTER);
    data.extend_from_slice(&BOLD_ON);
    data.extend_from_slice(&SIZE_DOUBLE);
    data.extend_from_slice(b"SPOOLWERK\n");
    data.extend_from_slice(&SIZE_NORMAL);
    data.extend_from_slice(&BOLD_OFF);
    data.extend_from_slice(b"Print Server\n");
    data.extend_from_slice(b"-------------------\n");
    data.extend_from_slice(b"\n");
    data.extend_from_slice(&ALIGN_LEFT);
    data.extend_from_slice(b"Test Print\n");
    data.extend_from_slice(format!("Time: {timestamp}\n").as_bytes());
    data.extend_from_slice(b"\n");
    data.extend_from_slice(&ALIGN_CENTER);
    data.extend_from_slice(b"-------------------\n");
    data.extend_from_slice(b"Printer OK!\n");
    data.extend_from_slice(b"\n\n\n");
    data.extend_from_slice(&PARTIAL_CUT);
    data
}
