//! Chrome-trace export and the file loading path.

mod common;

use std::io::Write;

use common::{context_switch, ingest, rec32, rec_name, ticks_per_ms};
use kviz_common::{EVT_MSGPIPE_CREATE, EVT_MSGPIPE_READ, EVT_MSGPIPE_WRITE, EVT_PROC_NAME};
use kviz::export::ChromeTraceExporter;
use kviz::ingest::IngestOptions;
use kviz::load_file;

fn sample_trace_bytes() -> Vec<u8> {
    let mut bytes = ticks_per_ms(1000);
    bytes.extend(rec_name(EVT_PROC_NAME, 0x10, 0, "app"));
    bytes.extend(context_switch(1_000, 0, 0x111, 1, 0, 0, 0));
    bytes.extend(rec32(EVT_MSGPIPE_CREATE, 0x111, 1_100, 0xA, 0xB, 0, 0));
    bytes.extend(rec32(EVT_MSGPIPE_WRITE, 0x111, 1_200, 0xA, 8, 1, 0));
    bytes.extend(rec32(EVT_MSGPIPE_READ, 0x222, 1_300, 0xB, 8, 1, 0));
    bytes.extend(context_switch(2_000, 0x111, 0x222, 3, 0, 0, 0));
    bytes
}

#[test]
fn export_creates_valid_json() {
    let (trace, _) = ingest(&sample_trace_bytes());
    let exporter = ChromeTraceExporter::from_trace(&trace);
    let mut buffer = Vec::new();
    exporter.export(&mut buffer).expect("Failed to export trace");

    let json_str = String::from_utf8(buffer).expect("Invalid UTF-8");
    let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("Invalid JSON");

    assert!(parsed.get("traceEvents").is_some());
    assert_eq!(parsed["displayTimeUnit"], "ms");
}

#[test]
fn export_contains_running_slices_and_flow_pairs() {
    let (trace, _) = ingest(&sample_trace_bytes());
    let exporter = ChromeTraceExporter::from_trace(&trace);
    let mut buffer = Vec::new();
    exporter.export(&mut buffer).expect("Failed to export trace");
    let parsed: serde_json::Value = serde_json::from_slice(&buffer).expect("Invalid JSON");
    let events = parsed["traceEvents"].as_array().expect("traceEvents array");

    let phase = |ph: &str| events.iter().filter(|e| e["ph"] == ph).count();
    assert!(phase("X") >= 1, "expected a Running slice");
    assert!(phase("M") >= 2, "expected name metadata");

    // One flow pair with matching ids, start at the write, finish at
    // the read.
    let starts: Vec<_> = events.iter().filter(|e| e["ph"] == "s").collect();
    let finishes: Vec<_> = events.iter().filter(|e| e["ph"] == "f").collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(finishes.len(), 1);
    assert_eq!(starts[0]["id"], finishes[0]["id"]);
    assert!(starts[0]["ts"].as_f64() <= finishes[0]["ts"].as_f64());
}

#[test]
fn export_counts_events() {
    let (trace, _) = ingest(&sample_trace_bytes());
    let exporter = ChromeTraceExporter::from_trace(&trace);
    assert!(exporter.event_count() > 0);
}

#[test]
fn load_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(&sample_trace_bytes()).expect("write trace");

    let (trace, stats) = load_file(file.path(), &IngestOptions::default(), None)
        .expect("load_file failed");
    assert_eq!(stats.errors, 0);
    assert!(trace.groups().any(|g| g.name == "app"));
}

#[test]
fn load_file_honors_limit() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(&sample_trace_bytes()).expect("write trace");

    let (_, stats) = load_file(file.path(), &IngestOptions::default(), Some(1))
        .expect("load_file failed");
    assert_eq!(stats.events, 1);
}

#[test]
fn load_file_missing_path_is_io_error() {
    let err = load_file(
        std::path::Path::new("does-not-exist.ktrace"),
        &IngestOptions::default(),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, kviz::domain::TraceError::Io(_)));
}
