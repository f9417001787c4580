//! Identifier newtypes.
//!
//! Cross-track references travel as plain integers (arena indices), so
//! the index spaces get their own types to keep a track index from ever
//! standing in for an event index or a koid.

use std::fmt;

/// Kernel object id, 32 bits in this trace format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Koid(pub u32);

impl fmt::Display for Koid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Position of a track in the global track array.
///
/// 16 bits wide on purpose: events embed this to reference other tracks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackIdx(pub u16);

/// 1-based position of an event within a track's event sequence.
///
/// Zero encodes "no reference"; see [`EventIdx::NONE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventIdx(pub u16);

impl EventIdx {
    /// The "unpaired" marker.
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Position of a group in the group array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupIdx(pub u16);

/// Discriminant of the four kernel object kinds the trace can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Process,
    Thread,
    MsgPipe,
    Port,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Process => "PROC",
            Self::Thread => "THRD",
            Self::MsgPipe => "MPIP",
            Self::Port => "PORT",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn koid_displays_as_hex() {
        assert_eq!(Koid(0x10).to_string(), "00000010");
    }

    #[test]
    fn event_idx_zero_is_none() {
        assert!(EventIdx::NONE.is_none());
        assert!(!EventIdx(1).is_none());
    }
}
