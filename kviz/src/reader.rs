//! Sequential ktrace record reader.
//!
//! Pulls validated records off a byte stream: a fixed 16-byte header
//! `(tag, tid, ts)` followed by `len - 16` body bytes, where `len` is
//! the total record length encoded in the tag. The reader stops at end
//! of stream, at an explicit zero tag, or at the optional byte limit;
//! malformed or truncated frames end the sequence with an error that
//! carries the byte offset. No record is partially emitted.

use std::io::Read;

use kviz_common::{tag_evt, tag_len, KTRACE_HDRSIZE, KTRACE_NAMESIZE, KTRACE_RECSIZE_MAX};
use log::info;

use crate::domain::TraceError;

/// Largest possible record body.
const BODY_MAX: usize = KTRACE_RECSIZE_MAX - KTRACE_HDRSIZE;

/// The `-limit` flag counts in 32-byte units.
pub const LIMIT_UNIT: u64 = 32;

/// One validated record.
#[derive(Clone)]
pub struct Record {
    pub tag: u32,
    pub tid: u32,
    pub ts: u64,
    body: [u8; BODY_MAX],
    body_len: usize,
}

impl Record {
    /// Event number (low 16 bits of the tag).
    #[must_use]
    pub fn evt(&self) -> u16 {
        tag_evt(self.tag)
    }

    /// Four little-endian payload words, zero-filled where the body is
    /// shorter than 16 bytes.
    #[must_use]
    pub fn args(&self) -> [u32; 4] {
        let mut words = [0u32; 4];
        for (i, w) in words.iter_mut().enumerate() {
            let off = i * 4;
            if off + 4 <= self.body_len {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&self.body[off..off + 4]);
                *w = u32::from_le_bytes(raw);
            }
        }
        words
    }

    /// Name payload: `(id, arg, name)`.
    ///
    /// The name is the NUL-terminated UTF-8 prefix of the fixed
    /// `KTRACE_NAMESIZE` field; undecodable tails are cut off.
    #[must_use]
    pub fn name(&self) -> (u32, u32, &str) {
        let [id, arg, _, _] = self.args();
        let raw = if self.body_len > 8 { &self.body[8..self.body_len] } else { &[][..] };
        let raw = &raw[..raw.len().min(KTRACE_NAMESIZE)];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let name = match std::str::from_utf8(&raw[..end]) {
            Ok(s) => s,
            Err(e) => std::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or(""),
        };
        (id, arg, name)
    }
}

/// Lazily yields records from a byte source until EOF, a zero tag, or
/// the configured limit.
pub struct RecordReader<R> {
    src: R,
    offset: u64,
    limit: Option<u64>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(src: R) -> Self {
        Self { src, offset: 0, limit: None }
    }

    /// Cap consumption at `units * 32` bytes. A record already started
    /// when the cap is crossed is still delivered whole.
    pub fn with_limit(src: R, units: u64) -> Self {
        Self { src, offset: 0, limit: Some(units.saturating_mul(LIMIT_UNIT)) }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next validated record, `None` at the end of the sequence.
    pub fn next_record(&mut self) -> Result<Option<Record>, TraceError> {
        if let Some(limit) = self.limit {
            if self.offset >= limit {
                return Ok(None);
            }
        }

        let mut hdr = [0u8; KTRACE_HDRSIZE];
        let got = fill(&mut self.src, &mut hdr)?;
        if got == 0 {
            return Ok(None);
        }
        if got < KTRACE_HDRSIZE {
            return Err(TraceError::Truncated {
                offset: self.offset,
                wanted: KTRACE_HDRSIZE,
                got,
            });
        }

        let tag = u32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
        if tag == 0 {
            info!("eof: zero tag at offset {:#x}", self.offset);
            return Ok(None);
        }
        let len = tag_len(tag);
        if len < KTRACE_HDRSIZE {
            return Err(TraceError::BadLength { offset: self.offset, len });
        }

        let tid = u32::from_le_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
        let mut ts_raw = [0u8; 8];
        ts_raw.copy_from_slice(&hdr[8..16]);
        let ts = u64::from_le_bytes(ts_raw);

        let body_len = len - KTRACE_HDRSIZE;
        let mut body = [0u8; BODY_MAX];
        let got = fill(&mut self.src, &mut body[..body_len])?;
        if got < body_len {
            return Err(TraceError::Truncated {
                offset: self.offset,
                wanted: len,
                got: KTRACE_HDRSIZE + got,
            });
        }

        self.offset += len as u64;
        Ok(Some(Record { tag, tid, ts, body, body_len }))
    }
}

/// Read until `buf` is full or the stream ends; returns bytes read.
fn fill<R: Read>(src: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match src.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kviz_common::{tag, EVT_THREAD_NAME, EVT_TICKS_PER_MS};

    fn rec32(evt: u16, tid: u32, ts: u64, args: [u32; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&tag(evt, 32).to_le_bytes());
        out.extend_from_slice(&tid.to_le_bytes());
        out.extend_from_slice(&ts.to_le_bytes());
        for a in args {
            out.extend_from_slice(&a.to_le_bytes());
        }
        out
    }

    #[test]
    fn empty_stream_is_clean_eof() {
        let mut r = RecordReader::new(&[][..]);
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn zero_tag_at_offset_zero_is_clean_eof() {
        let bytes = [0u8; 32];
        let mut r = RecordReader::new(&bytes[..]);
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn decodes_args_payload() {
        let bytes = rec32(EVT_TICKS_PER_MS, 0, 7, [1000, 0, 3, 4]);
        let mut r = RecordReader::new(&bytes[..]);
        let rec = r.next_record().unwrap().unwrap();
        assert_eq!(rec.evt(), EVT_TICKS_PER_MS);
        assert_eq!(rec.ts, 7);
        assert_eq!(rec.args(), [1000, 0, 3, 4]);
        assert!(r.next_record().unwrap().is_none());
        assert_eq!(r.offset(), 32);
    }

    #[test]
    fn decodes_name_payload() {
        let mut out = Vec::new();
        out.extend_from_slice(&tag(EVT_THREAD_NAME, 48).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        out.extend_from_slice(&0x20u32.to_le_bytes()); // id
        out.extend_from_slice(&0x10u32.to_le_bytes()); // arg
        let mut name = [0u8; KTRACE_NAMESIZE];
        name[..6].copy_from_slice(b"worker");
        out.extend_from_slice(&name);
        let mut r = RecordReader::new(&out[..]);
        let rec = r.next_record().unwrap().unwrap();
        let (id, arg, name) = rec.name();
        assert_eq!(id, 0x20);
        assert_eq!(arg, 0x10);
        assert_eq!(name, "worker");
    }

    #[test]
    fn length_below_header_is_malformed() {
        let mut bytes = rec32(EVT_TICKS_PER_MS, 0, 0, [0; 4]);
        // Corrupt the length field down to 8 bytes.
        let bad = tag(EVT_TICKS_PER_MS, 8).to_le_bytes();
        bytes[..4].copy_from_slice(&bad);
        let mut r = RecordReader::new(&bytes[..]);
        assert!(matches!(r.next_record(), Err(TraceError::BadLength { offset: 0, len: 8 })));
    }

    #[test]
    fn short_body_is_truncated() {
        let mut bytes = rec32(EVT_TICKS_PER_MS, 0, 0, [0; 4]);
        bytes.truncate(24);
        let mut r = RecordReader::new(&bytes[..]);
        assert!(matches!(r.next_record(), Err(TraceError::Truncated { .. })));
    }

    #[test]
    fn short_header_is_truncated() {
        let bytes = [1u8; 7];
        let mut r = RecordReader::new(&bytes[..]);
        assert!(matches!(
            r.next_record(),
            Err(TraceError::Truncated { offset: 0, wanted: 16, got: 7 })
        ));
    }

    #[test]
    fn limit_zero_yields_nothing() {
        let bytes = rec32(EVT_TICKS_PER_MS, 0, 0, [1000, 0, 0, 0]);
        let mut r = RecordReader::with_limit(&bytes[..], 0);
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn limit_caps_consumption() {
        let mut bytes = rec32(EVT_TICKS_PER_MS, 0, 0, [1000, 0, 0, 0]);
        bytes.extend(rec32(EVT_TICKS_PER_MS, 0, 0, [2000, 0, 0, 0]));
        let mut r = RecordReader::with_limit(&bytes[..], 1);
        assert!(r.next_record().unwrap().is_some());
        assert!(r.next_record().unwrap().is_none());
    }
}
