//! Groups, tracks, and their time-indexed sequences.

use kviz_common::TaskState;

use crate::domain::{EventIdx, GroupIdx, TrackIdx};

/// One step of a thread's scheduler-state step function: the thread is
/// in `state` on `cpu` from `ts` until the next sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSample {
    pub ts: i64,
    pub state: TaskState,
    pub cpu: u8,
}

/// A point event on a track.
///
/// `trackidx`/`eventidx` form the cross-track reference: for a paired
/// read they name the matching write event (`eventidx` is 1-based, 0
/// means unpaired). Indices survive arena growth where pointers would
/// not.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub ts: i64,
    /// Wire event number (probe events keep their full probe number).
    pub tag: u32,
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub trackidx: TrackIdx,
    pub eventidx: EventIdx,
}

/// Per-thread timeline: parallel task-state and event sequences, both
/// append-only and non-decreasing in timestamp.
#[derive(Debug)]
pub struct Track {
    pub name: String,
    /// Position in the global track array; events reference tracks by
    /// this index.
    pub idx: TrackIdx,
    /// Group this track has been bound to, if any. A track joins a
    /// group at most once.
    pub group: Option<GroupIdx>,
    pub task: Vec<TaskSample>,
    pub events: Vec<Event>,
    /// Layout scratch for the viewer; the core never reads it.
    pub y: f32,
}

impl Track {
    pub(crate) fn new(idx: TrackIdx) -> Self {
        Self {
            name: "unknown".to_string(),
            idx,
            group: None,
            // Implicit zeroth sentinel: no information before the first
            // real sample.
            task: vec![TaskSample { ts: 0, state: TaskState::None, cpu: 0 }],
            events: Vec::new(),
            y: 0.0,
        }
    }
}

/// A named, ordered collection of tracks, one per process.
#[derive(Debug)]
pub struct Group {
    pub name: String,
    /// Collapsed in the viewer.
    pub folded: bool,
    pub(crate) tracks: Vec<TrackIdx>,
}

impl Group {
    pub(crate) fn new() -> Self {
        Self { name: "unknown".to_string(), folded: false, tracks: Vec::new() }
    }

    /// Track indices in group-local display order.
    #[must_use]
    pub fn track_indices(&self) -> &[TrackIdx] {
        &self.tracks
    }
}
