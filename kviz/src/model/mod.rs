//! The reconstructed trace model.
//!
//! [`Trace`] owns every arena: groups, tracks, the typed object
//! registry, the kernel-thread table, and the name-lookup tables. It is
//! mutated only by ingestion; after finalization the viewer holds read
//! references and queries it through the surface in [`crate::query`].

pub mod object;
pub mod track;

use std::collections::HashMap;

use kviz_common::TaskState;
use log::debug;

pub use object::{MessageDescriptor, MsgPipe, ObjRef, Port, Process, Registry, Thread, OBJ_RESOLVED};
pub use track::{Event, Group, TaskSample, Track};

use crate::domain::{EventIdx, GroupIdx, TraceError, TrackIdx};

/// A kernel-only thread, identified by kernel virtual address rather
/// than koid. Kept out of the koid registry because the two id spaces
/// can collide.
#[derive(Debug)]
pub struct KernelThread {
    pub id: u32,
    pub track: TrackIdx,
}

#[derive(Debug)]
pub struct Trace {
    /// Payload of the VERSION record, when one was seen.
    pub version: Option<u32>,
    pub(crate) groups: Vec<Group>,
    pub(crate) tracks: Vec<Track>,
    pub(crate) registry: Registry,
    kthreads: Vec<KernelThread>,
    kernel_group: GroupIdx,
    pub(crate) syscall_names: HashMap<u32, String>,
    pub(crate) probe_names: HashMap<u32, String>,
}

/// Index spaces are 16 bits on the wire; a trace that overflows one is
/// beyond the format and saturates rather than panics.
fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

impl Trace {
    /// An empty model holding only the synthetic kernel process
    /// (koid 0) and its group.
    #[must_use]
    pub fn new() -> Self {
        let mut trace = Self {
            version: None,
            groups: Vec::new(),
            tracks: Vec::new(),
            registry: Registry::new(),
            kthreads: Vec::new(),
            kernel_group: GroupIdx(0),
            syscall_names: HashMap::new(),
            probe_names: HashMap::new(),
        };
        let group = trace.group_create();
        trace.groups[usize::from(group.0)].name = "Magenta Kernel".to_string();
        trace.kernel_group = group;
        let idx = trace.registry.processes.len();
        trace.registry.processes.push(Process { id: 0, flags: 0, creator: 0, group });
        trace.registry.add(0, ObjRef::Process(idx));
        trace
    }

    // ---- arenas -------------------------------------------------------

    pub(crate) fn group_create(&mut self) -> GroupIdx {
        let idx = GroupIdx(to_u16(self.groups.len()));
        self.groups.push(Group::new());
        idx
    }

    pub(crate) fn track_create(&mut self) -> TrackIdx {
        let idx = TrackIdx(to_u16(self.tracks.len()));
        self.tracks.push(Track::new(idx));
        idx
    }

    /// Bind a track to a group, keeping group-local order. Repeat binds
    /// are ignored.
    pub(crate) fn group_add_track(&mut self, group: GroupIdx, track: TrackIdx) {
        let t = &mut self.tracks[usize::from(track.0)];
        if t.group.is_none() {
            t.group = Some(group);
            self.groups[usize::from(group.0)].tracks.push(track);
        }
    }

    /// Sole mutator of a track's task sequence.
    pub(crate) fn track_append(&mut self, track: TrackIdx, ts: i64, state: TaskState, cpu: u8) {
        self.tracks[usize::from(track.0)].task.push(TaskSample { ts, state, cpu });
    }

    /// Sole mutator of a track's event sequence. Returns the new
    /// event's 1-based index (for cross-track descriptors) and a
    /// reference for the caller to fill the payload.
    pub(crate) fn track_add_event(
        &mut self,
        track: TrackIdx,
        ts: i64,
        tag: u32,
    ) -> (EventIdx, &mut Event) {
        let t = &mut self.tracks[usize::from(track.0)];
        let pos = t.events.len();
        // 1-based so 0 keeps meaning "unpaired"; an event past u16::MAX
        // can no longer be referenced and saturates to none.
        let idx = u16::try_from(pos + 1).map_or(EventIdx::NONE, EventIdx);
        t.events.push(Event {
            ts,
            tag,
            a: 0,
            b: 0,
            c: 0,
            d: 0,
            trackidx: TrackIdx::default(),
            eventidx: EventIdx::NONE,
        });
        (idx, &mut t.events[pos])
    }

    pub(crate) fn group_mut(&mut self, group: GroupIdx) -> &mut Group {
        &mut self.groups[usize::from(group.0)]
    }

    pub(crate) fn track_mut(&mut self, track: TrackIdx) -> &mut Track {
        &mut self.tracks[usize::from(track.0)]
    }

    // ---- find-or-create (lazy object lifecycle) -----------------------

    /// A kind mismatch on the id leaves the model untouched and is the
    /// caller's to surface.
    pub(crate) fn find_or_create_process(&mut self, id: u32) -> Result<usize, TraceError> {
        if let Some(i) = self.registry.find_process(id)? {
            return Ok(i);
        }
        let group = self.group_create();
        let i = self.registry.processes.len();
        self.registry.processes.push(Process { id, flags: 0, creator: 0, group });
        self.registry.add(id, ObjRef::Process(i));
        Ok(i)
    }

    pub(crate) fn find_or_create_thread(&mut self, id: u32) -> Result<usize, TraceError> {
        if let Some(i) = self.registry.find_thread(id)? {
            return Ok(i);
        }
        let track = self.track_create();
        let i = self.registry.threads.len();
        self.registry.threads.push(Thread { id, flags: 0, creator: 0, track });
        self.registry.add(id, ObjRef::Thread(i));
        Ok(i)
    }

    pub(crate) fn find_or_create_msgpipe(&mut self, id: u32) -> Result<usize, TraceError> {
        if let Some(i) = self.registry.find_msgpipe(id)? {
            return Ok(i);
        }
        let i = self.registry.pipes.len();
        self.registry.pipes.push(MsgPipe {
            id,
            flags: 0,
            creator: 0,
            other: None,
            pending_writes: std::collections::VecDeque::new(),
        });
        self.registry.add(id, ObjRef::MsgPipe(i));
        Ok(i)
    }

    pub(crate) fn find_or_create_port(&mut self, id: u32) -> Result<usize, TraceError> {
        if let Some(i) = self.registry.find_port(id)? {
            return Ok(i);
        }
        let i = self.registry.ports.len();
        self.registry.ports.push(Port { id, flags: 0, creator: 0 });
        self.registry.add(id, ObjRef::Port(i));
        Ok(i)
    }

    /// Track of the kernel thread at `id` (a kernel vaddr), creating it
    /// on first reference: named from the high bit, bound to the kernel
    /// group, resolved from the start.
    pub(crate) fn kthread_track(&mut self, id: u32) -> TrackIdx {
        if let Some(k) = self.kthreads.iter().find(|k| k.id == id) {
            return k.track;
        }
        debug!("new kernel thread {id:08x}");
        let track = self.track_create();
        let base = if id & 0x8000_0000 != 0 { "idle" } else { "kernel" };
        self.tracks[usize::from(track.0)].name = format!("{base} ({id:08x})");
        self.group_add_track(self.kernel_group, track);
        self.kthreads.push(KernelThread { id, track });
        track
    }

    #[must_use]
    pub fn kernel_group(&self) -> GroupIdx {
        self.kernel_group
    }

    // ---- read-only arena access ---------------------------------------

    #[must_use]
    pub fn group(&self, group: GroupIdx) -> &Group {
        &self.groups[usize::from(group.0)]
    }

    #[must_use]
    pub fn process(&self, idx: usize) -> &Process {
        &self.registry.processes[idx]
    }

    #[must_use]
    pub fn thread(&self, idx: usize) -> &Thread {
        &self.registry.threads[idx]
    }

    #[must_use]
    pub fn pipe(&self, idx: usize) -> &MsgPipe {
        &self.registry.pipes[idx]
    }

    pub(crate) fn process_mut(&mut self, idx: usize) -> &mut Process {
        &mut self.registry.processes[idx]
    }

    pub(crate) fn thread_mut(&mut self, idx: usize) -> &mut Thread {
        &mut self.registry.threads[idx]
    }

    pub(crate) fn pipe_mut(&mut self, idx: usize) -> &mut MsgPipe {
        &mut self.registry.pipes[idx]
    }

    pub(crate) fn port_mut(&mut self, idx: usize) -> &mut Port {
        &mut self.registry.ports[idx]
    }

    /// Look a process up by koid without creating it.
    #[must_use]
    pub fn find_process(&self, id: u32) -> Option<&Process> {
        match self.registry.find_process(id) {
            Ok(Some(i)) => Some(&self.registry.processes[i]),
            _ => None,
        }
    }

    /// Look a thread up by koid without creating it.
    #[must_use]
    pub fn find_thread(&self, id: u32) -> Option<&Thread> {
        match self.registry.find_thread(id) {
            Ok(Some(i)) => Some(&self.registry.threads[i]),
            _ => None,
        }
    }

    /// Look a message pipe up by koid without creating it. Returns the
    /// arena index alongside so sibling links can be chased.
    #[must_use]
    pub fn find_msgpipe(&self, id: u32) -> Option<(usize, &MsgPipe)> {
        match self.registry.find_msgpipe(id) {
            Ok(Some(i)) => Some((i, &self.registry.pipes[i])),
            _ => None,
        }
    }

    pub(crate) fn add_syscall_name(&mut self, num: u32, name: String) {
        self.syscall_names.insert(num, name);
    }

    pub(crate) fn add_probe_name(&mut self, evt: u32, name: String) {
        self.probe_names.insert(evt, name);
    }

    // ---- finalization -------------------------------------------------

    /// Apply terminal states, rebase to the trace zero, and float idle
    /// tracks to the front of the kernel group. After this the model is
    /// immutable.
    pub(crate) fn finalize(&mut self, ts_last: i64) {
        let thread_tracks: Vec<TrackIdx> = self
            .registry
            .threads
            .iter()
            .map(|t| t.track)
            .chain(self.kthreads.iter().map(|k| k.track))
            .collect();
        for track in thread_tracks {
            self.track_append(track, ts_last, TaskState::None, 0);
        }
        self.rebase_timestamps();
        self.reorder_idle_tracks();
    }

    /// Shift every timestamp so the earliest real activity lands at 0.
    ///
    /// The index-0 sentinel of each task sequence stays put, which also
    /// makes a second application subtract 0 (a no-op).
    pub fn rebase_timestamps(&mut self) {
        let mut tszero = i64::MAX;
        for track in &self.tracks {
            if let Some(first) = track.task.get(1) {
                tszero = tszero.min(first.ts);
            }
        }
        if tszero == i64::MAX || tszero == 0 {
            return;
        }
        for track in &mut self.tracks {
            for sample in track.task.iter_mut().skip(1) {
                sample.ts -= tszero;
            }
            for event in &mut track.events {
                event.ts -= tszero;
            }
        }
    }

    /// Kernel-group tracks whose name begins with "idle" move to the
    /// front; relative order is preserved on both sides.
    fn reorder_idle_tracks(&mut self) {
        let tracks = &self.tracks;
        let group = &mut self.groups[usize::from(self.kernel_group.0)];
        let (idle, rest): (Vec<_>, Vec<_>) = group
            .tracks
            .iter()
            .copied()
            .partition(|t| tracks[usize::from(t.0)].name.starts_with("idle"));
        group.tracks = idle;
        group.tracks.extend(rest);
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trace_has_kernel_group() {
        let trace = Trace::new();
        let kernel = trace.group(trace.kernel_group());
        assert_eq!(kernel.name, "Magenta Kernel");
        assert!(trace.find_process(0).is_some());
    }

    #[test]
    fn tracks_start_with_sentinel() {
        let mut trace = Trace::new();
        let t = trace.find_or_create_thread(0x20).unwrap();
        let track = &trace.tracks[usize::from(trace.thread(t).track.0)];
        assert_eq!(track.task.len(), 1);
        assert_eq!(track.task[0], TaskSample { ts: 0, state: TaskState::None, cpu: 0 });
    }

    #[test]
    fn group_bind_is_idempotent() {
        let mut trace = Trace::new();
        let p = trace.find_or_create_process(0x10).unwrap();
        let group = trace.process(p).group;
        let t = trace.find_or_create_thread(0x20).unwrap();
        let track = trace.thread(t).track;
        trace.group_add_track(group, track);
        trace.group_add_track(group, track);
        assert_eq!(trace.group(group).track_indices(), &[track]);
    }

    #[test]
    fn event_indices_are_one_based() {
        let mut trace = Trace::new();
        let t = trace.find_or_create_thread(0x20).unwrap();
        let track = trace.thread(t).track;
        let (first, _) = trace.track_add_event(track, 10, 1);
        let (second, _) = trace.track_add_event(track, 20, 1);
        assert_eq!(first, EventIdx(1));
        assert_eq!(second, EventIdx(2));
    }

    #[test]
    fn kthread_naming_follows_high_bit() {
        let mut trace = Trace::new();
        let idle = trace.kthread_track(0x8000_0010);
        let kernel = trace.kthread_track(0x0000_0010);
        assert!(trace.tracks[usize::from(idle.0)].name.starts_with("idle"));
        assert!(trace.tracks[usize::from(kernel.0)].name.starts_with("kernel"));
        // Same vaddr resolves to the same track.
        assert_eq!(trace.kthread_track(0x8000_0010), idle);
    }

    #[test]
    fn rebase_skips_sentinel_and_is_idempotent() {
        let mut trace = Trace::new();
        let t = trace.find_or_create_thread(0x20).unwrap();
        let track = trace.thread(t).track;
        trace.track_append(track, 20_000, TaskState::Running, 0);
        trace.track_append(track, 30_000, TaskState::Blocked, 0);
        trace.track_add_event(track, 25_000, 1);

        trace.rebase_timestamps();
        let samples: Vec<i64> =
            trace.tracks[usize::from(track.0)].task.iter().map(|s| s.ts).collect();
        assert_eq!(samples, vec![0, 0, 10_000]);
        assert_eq!(trace.tracks[usize::from(track.0)].events[0].ts, 5_000);

        trace.rebase_timestamps();
        let again: Vec<i64> =
            trace.tracks[usize::from(track.0)].task.iter().map(|s| s.ts).collect();
        assert_eq!(again, vec![0, 0, 10_000]);
    }
}
