//! Typed object registry keyed by koid.
//!
//! Objects live in per-kind arenas; a fixed 1024-bucket FNV-1a hash
//! maps a koid to its `(kind, arena index)` entry. Sibling references
//! (a pipe's `other`) are arena indices, so arena growth never
//! invalidates them. Lookups are kind-checked: an event referencing an
//! id with the wrong semantic surfaces a `KindMismatch` instead of
//! silently aliasing.

use std::collections::VecDeque;

use crate::domain::{EventIdx, GroupIdx, Koid, ObjectKind, TraceError, TrackIdx};

/// Set once a create record has been observed for the object; objects
/// referenced before their create record exist unresolved.
pub const OBJ_RESOLVED: u32 = 1 << 0;

const FNV32_PRIME: u32 = 16_777_619;
const FNV32_OFFSET_BASIS: u32 = 2_166_136_261;

const HASH_BITS: u32 = 10;
pub const BUCKETS: usize = 1 << HASH_BITS;

// for bits 0..15
fn fnv1a_tiny(mut n: u32, bits: u32) -> u32 {
    let mut hash = FNV32_OFFSET_BASIS;
    hash = (hash ^ (n & 0xFF)).wrapping_mul(FNV32_PRIME);
    n >>= 8;
    hash = (hash ^ (n & 0xFF)).wrapping_mul(FNV32_PRIME);
    n >>= 8;
    hash = (hash ^ (n & 0xFF)).wrapping_mul(FNV32_PRIME);
    n >>= 8;
    hash = (hash ^ n).wrapping_mul(FNV32_PRIME);
    ((hash >> bits) ^ hash) & ((1 << bits) - 1)
}

fn bucket(id: u32) -> usize {
    fnv1a_tiny(id, HASH_BITS) as usize
}

/// Kind-tagged arena reference, the registry's unit of storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjRef {
    Process(usize),
    Thread(usize),
    MsgPipe(usize),
    Port(usize),
}

impl ObjRef {
    #[must_use]
    pub fn kind(self) -> ObjectKind {
        match self {
            Self::Process(_) => ObjectKind::Process,
            Self::Thread(_) => ObjectKind::Thread,
            Self::MsgPipe(_) => ObjectKind::MsgPipe,
            Self::Port(_) => ObjectKind::Port,
        }
    }
}

#[derive(Debug)]
pub struct Process {
    pub id: u32,
    pub flags: u32,
    pub creator: u32,
    /// The timeline group displayed for this process.
    pub group: GroupIdx,
}

#[derive(Debug)]
pub struct Thread {
    pub id: u32,
    pub flags: u32,
    pub creator: u32,
    /// The thread's timeline track.
    pub track: TrackIdx,
}

/// Identifies a pending write event awaiting its matching read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageDescriptor {
    pub trackidx: TrackIdx,
    pub eventidx: EventIdx,
}

#[derive(Debug)]
pub struct MsgPipe {
    pub id: u32,
    pub flags: u32,
    pub creator: u32,
    /// Arena index of the sibling endpoint; a relation, never ownership.
    pub other: Option<usize>,
    /// Writes on the sibling queued here in FIFO order; the next read
    /// on this endpoint consumes the head.
    pub pending_writes: VecDeque<MessageDescriptor>,
}

#[derive(Debug)]
pub struct Port {
    pub id: u32,
    pub flags: u32,
    pub creator: u32,
}

/// Per-kind arenas behind the shared koid hash.
#[derive(Debug)]
pub struct Registry {
    buckets: Vec<Vec<(u32, ObjRef)>>,
    pub processes: Vec<Process>,
    pub threads: Vec<Thread>,
    pub pipes: Vec<MsgPipe>,
    pub ports: Vec<Port>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: (0..BUCKETS).map(|_| Vec::new()).collect(),
            processes: Vec::new(),
            threads: Vec::new(),
            pipes: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// Look an id up, optionally insisting on a kind.
    ///
    /// A hit of the wrong kind is a `KindMismatch`; the caller decides
    /// whether that is fatal (it never is during ingestion).
    pub fn find(&self, id: u32, expected: Option<ObjectKind>) -> Result<Option<ObjRef>, TraceError> {
        for &(entry_id, obj) in &self.buckets[bucket(id)] {
            if entry_id == id {
                if let Some(expected) = expected {
                    if obj.kind() != expected {
                        return Err(TraceError::KindMismatch {
                            id: Koid(id),
                            found: obj.kind(),
                            expected,
                        });
                    }
                }
                return Ok(Some(obj));
            }
        }
        Ok(None)
    }

    pub fn find_process(&self, id: u32) -> Result<Option<usize>, TraceError> {
        match self.find(id, Some(ObjectKind::Process))? {
            Some(ObjRef::Process(i)) => Ok(Some(i)),
            _ => Ok(None),
        }
    }

    pub fn find_thread(&self, id: u32) -> Result<Option<usize>, TraceError> {
        match self.find(id, Some(ObjectKind::Thread))? {
            Some(ObjRef::Thread(i)) => Ok(Some(i)),
            _ => Ok(None),
        }
    }

    pub fn find_msgpipe(&self, id: u32) -> Result<Option<usize>, TraceError> {
        match self.find(id, Some(ObjectKind::MsgPipe))? {
            Some(ObjRef::MsgPipe(i)) => Ok(Some(i)),
            _ => Ok(None),
        }
    }

    pub fn find_port(&self, id: u32) -> Result<Option<usize>, TraceError> {
        match self.find(id, Some(ObjectKind::Port))? {
            Some(ObjRef::Port(i)) => Ok(Some(i)),
            _ => Ok(None),
        }
    }

    /// Insert a new id. The caller has already checked for duplicates
    /// via `find`; a duplicate here would shadow the older entry.
    pub fn add(&mut self, id: u32, obj: ObjRef) {
        self.buckets[bucket(id)].push((id, obj));
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_stays_in_range() {
        for id in [0u32, 1, 0x10, 0xDEAD_BEEF, u32::MAX] {
            assert!(bucket(id) < BUCKETS);
        }
    }

    #[test]
    fn find_missing_is_none() {
        let reg = Registry::new();
        assert!(reg.find(42, None).unwrap().is_none());
    }

    #[test]
    fn kind_checked_lookup() {
        let mut reg = Registry::new();
        reg.processes.push(Process { id: 0x50, flags: 0, creator: 0, group: GroupIdx(0) });
        reg.add(0x50, ObjRef::Process(0));

        assert_eq!(reg.find_process(0x50).unwrap(), Some(0));
        let err = reg.find_msgpipe(0x50).unwrap_err();
        assert!(matches!(
            err,
            TraceError::KindMismatch {
                found: ObjectKind::Process,
                expected: ObjectKind::MsgPipe,
                ..
            }
        ));
    }

    #[test]
    fn colliding_ids_chain_in_buckets() {
        let mut reg = Registry::new();
        // Plenty of ids to force bucket collisions in 1024 buckets.
        for id in 0..4096u32 {
            let idx = reg.ports.len();
            reg.ports.push(Port { id, flags: 0, creator: 0 });
            reg.add(id, ObjRef::Port(idx));
        }
        for id in (0..4096u32).step_by(97) {
            assert_eq!(reg.find_port(id).unwrap(), Some(id as usize));
        }
    }
}
