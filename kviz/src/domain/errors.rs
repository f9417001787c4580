//! Structured error types for kviz
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! Only `Io` and the framing errors stop ingestion; everything else is
//! surfaced on the error channel and the trace continues, because real
//! traces do contain kind mismatches and double creates.

use thiserror::Error;

use super::types::{Koid, ObjectKind};

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("malformed record at offset {offset:#x}: length {len} below header size")]
    BadLength { offset: u64, len: usize },

    #[error("truncated record at offset {offset:#x}: wanted {wanted} bytes, got {got}")]
    Truncated { offset: u64, wanted: usize, got: usize },

    #[error("object {id} is {found} not {expected}")]
    KindMismatch { id: Koid, found: ObjectKind, expected: ObjectKind },

    #[error("{kind} {id} already created")]
    DoubleResolve { kind: ObjectKind, id: Koid },

    #[error("{context} references unresolved object {id}")]
    DanglingReference { id: Koid, context: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mismatch_display() {
        let err = TraceError::KindMismatch {
            id: Koid(0x50),
            found: ObjectKind::Process,
            expected: ObjectKind::MsgPipe,
        };
        assert_eq!(err.to_string(), "object 00000050 is PROC not MPIP");
    }

    #[test]
    fn double_resolve_display() {
        let err = TraceError::DoubleResolve { kind: ObjectKind::Thread, id: Koid(0x20) };
        assert_eq!(err.to_string(), "THRD 00000020 already created");
    }
}
