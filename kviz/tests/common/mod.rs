//! Synthetic trace builders shared by the integration tests.
//!
//! Records are assembled byte-by-byte the way the kernel producer lays
//! them out, so these tests exercise the real framing path.

#![allow(dead_code, clippy::cast_possible_truncation)]

use kviz_common::{tag, EVT_CONTEXT_SWITCH, EVT_TICKS_PER_MS, KTRACE_NAMESIZE};
use kviz::ingest::{IngestOptions, IngestStats, Ingestor};
use kviz::model::Trace;
use kviz::reader::RecordReader;

/// 32-byte record: header plus four payload words.
pub fn rec32(evt: u16, tid: u32, ts: u64, a: u32, b: u32, c: u32, d: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend_from_slice(&tag(evt, 32).to_le_bytes());
    out.extend_from_slice(&tid.to_le_bytes());
    out.extend_from_slice(&ts.to_le_bytes());
    for word in [a, b, c, d] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

/// Header-only 16-byte record (IRQ, syscall, argument-less probe).
pub fn rec16(evt: u16, tid: u32, ts: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&tag(evt, 16).to_le_bytes());
    out.extend_from_slice(&tid.to_le_bytes());
    out.extend_from_slice(&ts.to_le_bytes());
    out
}

/// 24-byte record: header plus two payload words (probes with args).
pub fn rec24(evt: u16, tid: u32, ts: u64, a: u32, b: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&tag(evt, 24).to_le_bytes());
    out.extend_from_slice(&tid.to_le_bytes());
    out.extend_from_slice(&ts.to_le_bytes());
    out.extend_from_slice(&a.to_le_bytes());
    out.extend_from_slice(&b.to_le_bytes());
    out
}

/// Name record: header plus id, arg, and a NUL-padded name field.
pub fn rec_name(evt: u16, id: u32, arg: u32, name: &str) -> Vec<u8> {
    let len = 16 + 8 + KTRACE_NAMESIZE;
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&tag(evt, len as u8).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&arg.to_le_bytes());
    let mut field = [0u8; KTRACE_NAMESIZE];
    let bytes = name.as_bytes();
    field[..bytes.len()].copy_from_slice(bytes);
    out.extend_from_slice(&field);
    out
}

pub fn ticks_per_ms(value: u64) -> Vec<u8> {
    rec32(EVT_TICKS_PER_MS, 0, 0, value as u32, (value >> 32) as u32, 0, 0)
}

/// Context switch away from `oldtid` (entering `state`) to `newtid`
/// (now Running) on `cpu`; kernel vaddrs stand in when a tid is 0.
pub fn context_switch(
    ts: u64,
    oldtid: u32,
    newtid: u32,
    state: u8,
    cpu: u16,
    old_kva: u32,
    new_kva: u32,
) -> Vec<u8> {
    let state_cpu = (u32::from(state) << 16) | u32::from(cpu);
    rec32(EVT_CONTEXT_SWITCH, oldtid, ts, newtid, state_cpu, old_kva, new_kva)
}

pub fn ingest(bytes: &[u8]) -> (Trace, IngestStats) {
    ingest_with(bytes, &IngestOptions::default())
}

pub fn ingest_with(bytes: &[u8], options: &IngestOptions) -> (Trace, IngestStats) {
    let mut reader = RecordReader::new(bytes);
    let mut ingestor = Ingestor::new(options);
    ingestor.run(&mut reader).expect("ingestion failed");
    ingestor.finish()
}
