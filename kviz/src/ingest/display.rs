//! Human-readable per-record decode lines for `--text`.
//!
//! Diagnostic only, never machine-consumed. Lines go to stderr so they
//! interleave with the error channel rather than any model output.

use std::fmt;

/// Timestamped line: `SSSS.NNNNNNNNN [tidhex] EVTNAME fields...`
pub(crate) fn regular(ns: u64, tid: u32, rest: fmt::Arguments<'_>) {
    eprintln!("{:04}.{:09} [{:08x}] {}", ns / 1_000_000_000, ns % 1_000_000_000, tid, rest);
}

/// Name and calibration records carry no usable timestamp; the line
/// starts with spaces in lieu of one.
pub(crate) fn special(rest: fmt::Arguments<'_>) {
    eprintln!("                          {rest}");
}
