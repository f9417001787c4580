// Time conversions intentionally lose precision for display purposes;
// track indices are 16-bit by construction.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use kviz_common::{
    evt_name, is_probe, tag_evt, TaskState, EVT_MSGPIPE_READ, EVT_SYSCALL_ENTER, EVT_SYSCALL_EXIT,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::model::{Trace, Track};

/// Chrome Trace Event format
/// Spec: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU/preview
#[derive(Debug, Clone, Serialize)]
struct ChromeTraceEvent {
    /// Event name
    name: String,
    /// Category for filtering/coloring
    cat: String,
    /// Phase: "X" = complete, "i" = instant, "s"/"f" = flow, "M" = metadata
    ph: String,
    /// Timestamp in microseconds
    ts: f64,
    /// Duration in microseconds ("X" events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    dur: Option<f64>,
    /// Process ID (group index here)
    pid: u32,
    /// Thread ID (track index here)
    tid: u32,
    /// Flow binding id ("s"/"f" events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    /// Flow binding point; "e" attaches the finish to the enclosing slice
    #[serde(skip_serializing_if = "Option::is_none")]
    bp: Option<String>,
    /// Optional arguments (metadata)
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<HashMap<String, JsonValue>>,
}

/// Chrome Trace Format container
#[derive(Debug, Serialize)]
struct ChromeTrace {
    #[serde(rename = "traceEvents")]
    trace_events: Vec<ChromeTraceEvent>,
    #[serde(rename = "displayTimeUnit")]
    display_time_unit: String,
}

fn us(ts: i64) -> f64 {
    ts as f64 / 1000.0
}

/// Chrome trace exporter over a finalized model.
pub struct ChromeTraceExporter {
    events: Vec<ChromeTraceEvent>,
}

impl ChromeTraceExporter {
    /// Walk the model once and collect every exportable event: group
    /// and track name metadata, Running segments as complete events,
    /// point events as instants, and IPC pairs as flow begin/end.
    #[must_use]
    pub fn from_trace(trace: &Trace) -> Self {
        let mut events = Vec::new();

        for (gi, group) in trace.groups().enumerate() {
            let pid = gi as u32;
            events.push(metadata(pid, 0, "process_name", &group.name));
            for track in trace.group_tracks(group) {
                events.push(metadata(pid, u32::from(track.idx.0), "thread_name", &track.name));
            }
        }

        for idx in 0..trace.track_count() {
            let track = trace.track(crate::domain::TrackIdx(idx as u16));
            let pid = track_pid(track);
            let tid = u32::from(track.idx.0);

            for w in track.task.windows(2) {
                if w[0].state == TaskState::Running {
                    let mut args = HashMap::new();
                    args.insert("cpu".to_string(), serde_json::json!(w[0].cpu));
                    events.push(ChromeTraceEvent {
                        name: "running".to_string(),
                        cat: "sched".to_string(),
                        ph: "X".to_string(),
                        ts: us(w[0].ts),
                        dur: Some(us(w[1].ts - w[0].ts)),
                        pid,
                        tid,
                        id: None,
                        bp: None,
                        args: Some(args),
                    });
                }
            }

            for event in &track.events {
                let evt = tag_evt(event.tag);
                let name = match evt {
                    EVT_SYSCALL_ENTER | EVT_SYSCALL_EXIT => trace
                        .syscall_name(event.a)
                        .map_or_else(|| evt_name(evt).to_string(), ToString::to_string),
                    e if is_probe(e) => trace
                        .probe_name(event.tag)
                        .map_or_else(|| evt_name(evt).to_string(), ToString::to_string),
                    e => evt_name(e).to_string(),
                };
                let mut args = HashMap::new();
                args.insert("a".to_string(), serde_json::json!(event.a));
                args.insert("b".to_string(), serde_json::json!(event.b));
                events.push(ChromeTraceEvent {
                    name,
                    cat: "event".to_string(),
                    ph: "i".to_string(),
                    ts: us(event.ts),
                    dur: None,
                    pid,
                    tid,
                    id: None,
                    bp: None,
                    args: Some(args),
                });

                // A paired read becomes a flow arc from its write.
                if evt == EVT_MSGPIPE_READ {
                    if let Some((wtrack, wevent)) = trace.follow(event) {
                        let flow_id =
                            format!("{}:{}", event.trackidx.0, event.eventidx.0);
                        events.push(flow(
                            "s",
                            us(wevent.ts),
                            track_pid(wtrack),
                            u32::from(wtrack.idx.0),
                            &flow_id,
                        ));
                        events.push(flow("f", us(event.ts), pid, tid, &flow_id));
                    }
                }
            }
        }

        Self { events }
    }

    /// Export the trace to any writer (file, stdout, buffer, etc.).
    pub fn export<W: Write>(&self, writer: W) -> Result<()> {
        let trace = ChromeTrace {
            trace_events: self.events.clone(),
            display_time_unit: "ms".to_string(),
        };
        serde_json::to_writer_pretty(writer, &trace).context("Failed to write trace JSON")?;
        Ok(())
    }

    /// Number of events collected.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

fn track_pid(track: &Track) -> u32 {
    track.group.map_or(u32::from(u16::MAX), |g| u32::from(g.0))
}

fn metadata(pid: u32, tid: u32, kind: &str, name: &str) -> ChromeTraceEvent {
    let mut args = HashMap::new();
    args.insert("name".to_string(), serde_json::json!(name));
    ChromeTraceEvent {
        name: kind.to_string(),
        cat: String::new(),
        ph: "M".to_string(),
        ts: 0.0,
        dur: None,
        pid,
        tid,
        id: None,
        bp: None,
        args: Some(args),
    }
}

fn flow(ph: &str, ts: f64, pid: u32, tid: u32, flow_id: &str) -> ChromeTraceEvent {
    ChromeTraceEvent {
        name: "msgpipe".to_string(),
        cat: "flow".to_string(),
        ph: ph.to_string(),
        ts,
        dur: None,
        pid,
        tid,
        id: Some(flow_id.to_string()),
        bp: if ph == "f" { Some("e".to_string()) } else { None },
        args: None,
    }
}
