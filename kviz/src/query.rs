//! Read-only query surface for the viewer.
//!
//! Everything here runs against the finalized model: group enumeration,
//! track lookup, binary-searched time-window iteration over the task
//! and event sequences, cross-track de-reference, and name lookups.
//! Sequences are sorted by construction, so window queries locate their
//! left edge with `partition_point` over the timestamp key.

use crate::domain::TrackIdx;
use crate::model::{Event, Group, TaskSample, Trace, Track};

/// A task-state interval: the thread is in `state` on `cpu` for
/// `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSegment {
    pub start: i64,
    pub end: i64,
    pub state: kviz_common::TaskState,
    pub cpu: u8,
}

impl From<[&TaskSample; 2]> for TaskSegment {
    fn from([a, b]: [&TaskSample; 2]) -> Self {
        Self { start: a.ts, end: b.ts, state: a.state, cpu: a.cpu }
    }
}

impl Trace {
    /// Groups in display order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// The track at a cross-track reference index.
    #[must_use]
    pub fn track(&self, idx: TrackIdx) -> &Track {
        &self.tracks[usize::from(idx.0)]
    }

    /// Tracks of a group, in group-local order.
    pub fn group_tracks<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Track> {
        group.track_indices().iter().map(move |&idx| self.track(idx))
    }

    /// Number of tracks in the global array.
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Resolve a read event's cross-track reference to its matching
    /// write. `None` when the event is unpaired.
    #[must_use]
    pub fn follow(&self, event: &Event) -> Option<(&Track, &Event)> {
        if event.eventidx.is_none() {
            return None;
        }
        let track = self.tracks.get(usize::from(event.trackidx.0))?;
        // Event indices are 1-based; 0 was the unpaired marker above.
        let referenced = track.events.get(usize::from(event.eventidx.0) - 1)?;
        Some((track, referenced))
    }

    #[must_use]
    pub fn syscall_name(&self, num: u32) -> Option<&str> {
        self.syscall_names.get(&num).map(String::as_str)
    }

    /// Name of a probe event, keyed by the probe event number carried
    /// in the event's tag.
    #[must_use]
    pub fn probe_name(&self, tag: u32) -> Option<&str> {
        self.probe_names.get(&(tag & 0xFFFF)).map(String::as_str)
    }
}

impl Track {
    /// Task-state segments intersecting the window `[t0, t1)`.
    ///
    /// The first yielded segment is the one in effect at `t0` (its
    /// start may lie before the window); iteration stops at the first
    /// segment starting at or past `t1`. Segments are not clipped.
    pub fn task_segments_in(&self, t0: i64, t1: i64) -> impl Iterator<Item = TaskSegment> + '_ {
        // Lower-bound over the samples past the sentinel, then step
        // back one so the sample in effect at t0 is included.
        let start = if self.task.len() < 2 {
            self.task.len()
        } else {
            self.task[1..].partition_point(|s| s.ts < t0)
        };
        self.task[start.min(self.task.len())..]
            .windows(2)
            .take_while(move |w| w[0].ts < t1)
            .map(|w| TaskSegment::from([&w[0], &w[1]]))
    }

    /// Events with `t0 <= ts < t1`.
    #[must_use]
    pub fn events_in(&self, t0: i64, t1: i64) -> &[Event] {
        let lo = self.events.partition_point(|e| e.ts < t0);
        let hi = self.events.partition_point(|e| e.ts < t1).max(lo);
        &self.events[lo..hi]
    }
}
