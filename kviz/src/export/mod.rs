//! Trace export functionality
//!
//! Exports the finalized model to the Chrome Trace Event Format for
//! inspection in chrome://tracing alongside the native viewer.

pub mod chrome_trace;

pub use chrome_trace::ChromeTraceExporter;
