//! # Record dispatch and model construction
//!
//! Consumes records from the reader and routes each to the semantic
//! handler for its event kind, building the [`Trace`] model as it goes:
//!
//! - lifecycle records resolve objects in the registry
//! - name records label groups, tracks, and the lookup tables
//! - context switches drive the per-thread task-state step functions
//!   and the per-CPU active-thread table
//! - message-pipe records feed the flow-pair engine
//! - IRQ/syscall/page-fault records attach to whichever thread is
//!   running on the originating CPU
//!
//! Anomalies short of I/O failure are surfaced on the error channel and
//! counted; the trace continues degraded rather than terminating.

// CPU and state fields are range-checked before narrowing.
#![allow(clippy::cast_possible_truncation)]

mod display;

use kviz_common::{
    evt_name, is_probe, TaskState, EVT_CONTEXT_SWITCH, EVT_IRQ_ENTER, EVT_IRQ_EXIT,
    EVT_KTHREAD_NAME, EVT_MSGPIPE_CREATE, EVT_MSGPIPE_READ, EVT_MSGPIPE_WRITE, EVT_OBJECT_DELETE,
    EVT_PAGE_FAULT, EVT_PORT_CREATE, EVT_PORT_QUEUE, EVT_PORT_WAIT, EVT_PORT_WAIT_DONE,
    EVT_PROBE_NAME, EVT_PROC_CREATE, EVT_PROC_NAME, EVT_PROC_START, EVT_SYSCALL_ENTER,
    EVT_SYSCALL_EXIT, EVT_SYSCALL_NAME, EVT_THREAD_CREATE, EVT_THREAD_NAME, EVT_THREAD_START,
    EVT_TICKS_PER_MS, EVT_VERSION, EVT_WAIT_ONE, EVT_WAIT_ONE_DONE,
};
use log::{debug, error, warn};

use crate::clock::TickClock;
use crate::domain::{Koid, ObjectKind, TraceError, TrackIdx};
use crate::model::{MessageDescriptor, ObjRef, Trace, OBJ_RESOLVED};
use crate::reader::{Record, RecordReader};

/// Size of the per-CPU active-thread table.
pub const MAX_CPU: usize = 32;

/// What to do with a message-pipe write that finds earlier writes still
/// unread on the sibling endpoint.
///
/// `DropOnBacklog` keeps the observed producer behavior: the write event
/// still appears on its track but is left out of flow pairing. `Fifo`
/// queues every write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PairPolicy {
    #[default]
    DropOnBacklog,
    Fifo,
}

#[derive(Clone, Debug, Default)]
pub struct IngestOptions {
    /// Echo a decode line per record to stderr.
    pub text: bool,
    pub pair_policy: PairPolicy,
}

/// Ingest counters, dumped by `--stats`.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub events: u64,
    pub context_switches: u64,
    pub msgpipe_created: u64,
    pub msgpipe_deleted: u64,
    pub msgpipe_writes: u64,
    pub msgpipe_reads: u64,
    pub pair_drops: u64,
    pub threads_created: u64,
    pub threads_deleted: u64,
    pub processes_created: u64,
    pub processes_deleted: u64,
    pub ports_created: u64,
    pub ports_deleted: u64,
    pub syscalls: u64,
    pub irqs: u64,
    pub page_faults: u64,
    pub probes: u64,
    pub errors: u64,
    /// Nanoseconds of the first and last timestamped records.
    pub ts_first: u64,
    pub ts_last: u64,
}

impl IngestStats {
    pub fn dump(&self) {
        eprintln!("-----------------------------------------");
        let duration = self.ts_last.saturating_sub(self.ts_first);
        eprintln!(
            "elapsed time:     {}.{:06} s",
            duration / 1_000_000_000,
            (duration % 1_000_000_000) / 1_000
        );
        eprintln!("total events:     {}", self.events);
        eprintln!("context switches: {}", self.context_switches);
        eprintln!("msgpipe created:  {}", self.msgpipe_created);
        eprintln!("msgpipe deleted:  {}", self.msgpipe_deleted);
        eprintln!("msgpipe writes:   {}", self.msgpipe_writes);
        eprintln!("msgpipe reads:    {}", self.msgpipe_reads);
        eprintln!("pair drops:       {}", self.pair_drops);
        eprintln!("thread created:   {}", self.threads_created);
        eprintln!("process created:  {}", self.processes_created);
        eprintln!("port created:     {}", self.ports_created);
        eprintln!("syscalls:         {}", self.syscalls);
        eprintln!("irqs:             {}", self.irqs);
        eprintln!("page faults:      {}", self.page_faults);
        eprintln!("probes:           {}", self.probes);
        eprintln!("errors:           {}", self.errors);
    }
}

/// Timestamps cross into the signed model domain here; a trace long
/// enough to overflow i64 nanoseconds saturates.
fn ns_i64(ns: u64) -> i64 {
    i64::try_from(ns).unwrap_or(i64::MAX)
}

/// Encapsulates ingestion state: the model under construction, the tick
/// clock, the per-CPU active table, and the counters.
pub struct Ingestor {
    trace: Trace,
    clock: TickClock,
    active: [Option<TrackIdx>; MAX_CPU],
    stats: IngestStats,
    text: bool,
    pair_policy: PairPolicy,
    ts_last: u64,
}

impl Ingestor {
    #[must_use]
    pub fn new(options: &IngestOptions) -> Self {
        Self {
            trace: Trace::new(),
            clock: TickClock::new(),
            active: [None; MAX_CPU],
            stats: IngestStats::default(),
            text: options.text,
            pair_policy: options.pair_policy,
            ts_last: 0,
        }
    }

    /// Drain the reader into the model.
    ///
    /// Framing errors stop ingestion but keep everything built so far;
    /// only I/O failure propagates.
    pub fn run<R: std::io::Read>(
        &mut self,
        reader: &mut RecordReader<R>,
    ) -> Result<(), TraceError> {
        loop {
            match reader.next_record() {
                Ok(Some(rec)) => self.dispatch(&rec),
                Ok(None) => return Ok(()),
                Err(TraceError::Io(e)) => return Err(TraceError::Io(e)),
                Err(err) => {
                    self.report(err);
                    return Ok(());
                }
            }
        }
    }

    /// Finalize and hand the model over. Empty inputs skip finalization
    /// so a zero-record file yields a pristine empty model.
    #[must_use]
    pub fn finish(mut self) -> (Trace, IngestStats) {
        if self.stats.events > 0 {
            self.stats.ts_last = self.ts_last;
            self.trace.finalize(ns_i64(self.ts_last));
        }
        (self.trace, self.stats)
    }

    fn report(&mut self, err: TraceError) {
        self.stats.errors += 1;
        error!("{err}");
    }

    fn note_ts(&mut self, ns: u64) {
        if self.stats.ts_first == 0 {
            self.stats.ts_first = ns;
        }
        self.ts_last = self.ts_last.max(ns);
    }

    fn active_track(&self, cpu: u32) -> Option<TrackIdx> {
        self.active.get(cpu as usize).copied().flatten()
    }

    // ---- dispatch -----------------------------------------------------

    fn dispatch(&mut self, rec: &Record) {
        let evt = rec.evt();
        let ns = self.clock.ticks_to_ns(rec.ts);
        self.stats.events += 1;

        match evt {
            EVT_VERSION => self.evt_version(rec),
            EVT_TICKS_PER_MS => self.evt_ticks_per_ms(rec),
            EVT_KTHREAD_NAME | EVT_THREAD_NAME | EVT_PROC_NAME | EVT_SYSCALL_NAME
            | EVT_PROBE_NAME => self.evt_name_record(evt, rec),
            EVT_CONTEXT_SWITCH => self.evt_context_switch(ns, rec),
            EVT_IRQ_ENTER | EVT_IRQ_EXIT => self.evt_irq(evt, ns, rec),
            EVT_SYSCALL_ENTER | EVT_SYSCALL_EXIT => self.evt_syscall(evt, ns, rec),
            EVT_PAGE_FAULT => self.evt_page_fault(ns, rec),
            _ => self.dispatch_regular(evt, ns, rec),
        }
    }

    /// Events carried by a calling thread. A tid of 0 is the kernel
    /// itself; those records have no track to land on.
    fn dispatch_regular(&mut self, evt: u16, ns: u64, rec: &Record) {
        if rec.tid == 0 {
            return;
        }
        self.note_ts(ns);
        let ts = ns_i64(ns);
        let caller = match self.trace.find_or_create_thread(rec.tid) {
            Ok(i) => i,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        let track = self.trace.thread(caller).track;
        let [a, b, c, d] = rec.args();

        match evt {
            EVT_OBJECT_DELETE => self.evt_object_delete(ns, rec.tid, a),
            EVT_PROC_CREATE => self.evt_process_create(ns, rec.tid, a),
            EVT_PROC_START => {
                if self.text {
                    display::regular(ns, rec.tid, format_args!("PROC_START  id={b:08x} tid={a:08x}"));
                }
            }
            EVT_THREAD_CREATE => self.evt_thread_create(ns, rec.tid, a, b),
            EVT_THREAD_START => {
                if self.text {
                    display::regular(ns, rec.tid, format_args!("THRD_START  id={a:08x}"));
                }
            }
            EVT_MSGPIPE_CREATE => self.evt_msgpipe_create(ns, ts, rec.tid, track, a, b, c),
            EVT_MSGPIPE_WRITE => self.evt_msgpipe_write(ns, ts, rec.tid, track, a, b, c),
            EVT_MSGPIPE_READ => self.evt_msgpipe_read(ns, ts, rec.tid, track, a, b, c),
            EVT_PORT_CREATE => self.evt_port_create(ns, rec.tid, a),
            EVT_PORT_QUEUE | EVT_PORT_WAIT | EVT_PORT_WAIT_DONE => {
                self.evt_port_op(evt, ns, ts, rec.tid, track, [a, b, c, d]);
            }
            EVT_WAIT_ONE | EVT_WAIT_ONE_DONE => {
                self.evt_wait_one(evt, ns, ts, rec.tid, track, [a, b, c, d]);
            }
            e if is_probe(e) => self.evt_probe(e, ns, ts, rec.tid, track, a, b),
            _ => {
                if self.text {
                    display::regular(ns, rec.tid, format_args!("UNKNOWN_TAG tag={:08x}", rec.tag));
                }
                debug!("unknown event {evt:#x}");
            }
        }
    }

    // ---- metadata and names -------------------------------------------

    fn evt_version(&mut self, rec: &Record) {
        let [version, ..] = rec.args();
        self.trace.version = Some(version);
        if self.text {
            display::special(format_args!("VERSION      n={version:08x}"));
        }
    }

    fn evt_ticks_per_ms(&mut self, rec: &Record) {
        let [lo, hi, ..] = rec.args();
        let ticks_per_ms = u64::from(lo) | (u64::from(hi) << 32);
        self.clock.calibrate(ticks_per_ms);
        if self.text {
            display::special(format_args!("TICKS_PER_MS n={ticks_per_ms}"));
        }
    }

    fn evt_name_record(&mut self, evt: u16, rec: &Record) {
        let (id, arg, name) = rec.name();
        if self.text {
            display::special(format_args!("{:<12} id={id:08x} '{name}'", evt_name(evt)));
        }
        match evt {
            EVT_PROC_NAME => match self.trace.find_or_create_process(id) {
                Ok(p) => {
                    let group = self.trace.process(p).group;
                    self.trace.group_mut(group).name = name.to_string();
                }
                Err(e) => self.report(e),
            },
            EVT_THREAD_NAME => self.evt_thread_name(id, arg, name),
            EVT_KTHREAD_NAME => {
                let track = self.trace.kthread_track(id);
                self.trace.track_mut(track).name = format!("{name} ({id:08x})");
            }
            EVT_SYSCALL_NAME => self.trace.add_syscall_name(id, name.to_string()),
            EVT_PROBE_NAME => self.trace.add_probe_name(id, name.to_string()),
            _ => {}
        }
    }

    fn evt_thread_name(&mut self, tid: u32, pid: u32, name: &str) {
        let thread = match self.trace.find_or_create_thread(tid) {
            Ok(t) => t,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        let track = self.trace.thread(thread).track;
        self.trace.track_mut(track).name = format!("{name} ({tid})");
        // A name record can precede the create record; bind the track
        // to its process as soon as the owner is known.
        if pid != 0 && self.trace.track(track).group.is_none() {
            match self.trace.find_or_create_process(pid) {
                Ok(p) => {
                    let group = self.trace.process(p).group;
                    self.trace.group_add_track(group, track);
                }
                Err(e) => self.report(e),
            }
        }
    }

    // ---- scheduler ----------------------------------------------------

    fn evt_context_switch(&mut self, ns: u64, rec: &Record) {
        self.note_ts(ns);
        self.stats.context_switches += 1;
        let ts = ns_i64(ns);
        let [newtid, state_cpu, old_kva, new_kva] = rec.args();
        let oldtid = rec.tid;
        let state_raw = state_cpu >> 16;
        let cpu_slot = (state_cpu & 0xFFFF) as usize;
        if self.text {
            display::regular(
                ns,
                oldtid,
                format_args!(
                    "CTXT_SWITCH to={newtid:08x} st={state_raw} cpu={cpu_slot} old={old_kva:08x} new={new_kva:08x}"
                ),
            );
        }
        if cpu_slot >= MAX_CPU {
            warn!("context switch on cpu {cpu_slot} beyond table");
            return;
        }
        let cpu = cpu_slot as u8;
        let state = TaskState::from_wire(u8::try_from(state_raw).unwrap_or(u8::MAX));

        let outgoing = if oldtid != 0 {
            match self.trace.find_or_create_thread(oldtid) {
                Ok(t) => Some(self.trace.thread(t).track),
                Err(e) => {
                    self.report(e);
                    None
                }
            }
        } else if old_kva != 0 {
            Some(self.trace.kthread_track(old_kva))
        } else {
            None
        };
        if let Some(track) = outgoing {
            self.trace.track_append(track, ts, state, cpu);
        }

        let incoming = if newtid != 0 {
            match self.trace.find_or_create_thread(newtid) {
                Ok(t) => Some(self.trace.thread(t).track),
                Err(e) => {
                    self.report(e);
                    None
                }
            }
        } else if new_kva != 0 {
            Some(self.trace.kthread_track(new_kva))
        } else {
            None
        };
        if let Some(track) = incoming {
            self.trace.track_append(track, ts, TaskState::Running, cpu);
        }
        self.active[cpu_slot] = incoming;
    }

    // ---- CPU-scoped events --------------------------------------------

    fn evt_irq(&mut self, evt: u16, ns: u64, rec: &Record) {
        self.note_ts(ns);
        self.stats.irqs += 1;
        let cpu = rec.tid & 0xFF;
        let irq = rec.tid >> 8;
        if self.text {
            display::regular(ns, rec.tid, format_args!("{:<11} cpu={cpu} irq={irq}", evt_name(evt)));
        }
        let Some(track) = self.active_track(cpu) else {
            debug!("irq {irq} on cpu {cpu} with no running thread");
            return;
        };
        let (_, ev) = self.trace.track_add_event(track, ns_i64(ns), u32::from(evt));
        ev.a = cpu;
        ev.b = irq;
    }

    fn evt_syscall(&mut self, evt: u16, ns: u64, rec: &Record) {
        self.note_ts(ns);
        self.stats.syscalls += 1;
        let cpu = rec.tid & 0xFF;
        let num = rec.tid >> 8;
        if self.text {
            display::regular(ns, rec.tid, format_args!("{:<11} n={num} cpu={cpu}", evt_name(evt)));
        }
        let Some(track) = self.active_track(cpu) else {
            debug!("syscall {num} on cpu {cpu} with no running thread");
            return;
        };
        let (_, ev) = self.trace.track_add_event(track, ns_i64(ns), u32::from(evt));
        ev.a = num;
        ev.b = cpu;
    }

    fn evt_page_fault(&mut self, ns: u64, rec: &Record) {
        self.note_ts(ns);
        self.stats.page_faults += 1;
        let [hi, lo, flags, cpu] = rec.args();
        if self.text {
            display::regular(
                ns,
                rec.tid,
                format_args!("PAGE_FAULT  addr={hi:08x}{lo:08x} flags={flags:08x} cpu={cpu}"),
            );
        }
        let Some(track) = self.active_track(cpu) else {
            debug!("page fault on cpu {cpu} with no running thread");
            return;
        };
        let (_, ev) = self.trace.track_add_event(track, ns_i64(ns), u32::from(EVT_PAGE_FAULT));
        ev.a = hi;
        ev.b = lo;
        ev.c = flags;
        ev.d = cpu;
    }

    // ---- object lifecycle ---------------------------------------------

    fn evt_object_delete(&mut self, ns: u64, tid: u32, id: u32) {
        match self.trace.registry.find(id, None) {
            Ok(Some(obj)) => {
                if self.text {
                    display::regular(ns, tid, format_args!("{}_DELETE id={id:08x}", obj.kind()));
                }
                match obj {
                    ObjRef::MsgPipe(_) => self.stats.msgpipe_deleted += 1,
                    ObjRef::Thread(_) => self.stats.threads_deleted += 1,
                    ObjRef::Process(_) => self.stats.processes_deleted += 1,
                    ObjRef::Port(_) => self.stats.ports_deleted += 1,
                }
            }
            Ok(None) => {
                if self.text {
                    display::regular(ns, tid, format_args!("OBJT_DELETE id={id:08x}"));
                }
                debug!("delete of unknown object {id:08x}");
            }
            Err(e) => self.report(e),
        }
    }

    fn evt_process_create(&mut self, ns: u64, tid: u32, pid: u32) {
        self.stats.processes_created += 1;
        if self.text {
            display::regular(ns, tid, format_args!("PROC_CREATE id={pid:08x}"));
        }
        match self.trace.find_or_create_process(pid) {
            Ok(p) => {
                if self.trace.process(p).flags & OBJ_RESOLVED != 0 {
                    self.report(TraceError::DoubleResolve {
                        kind: ObjectKind::Process,
                        id: Koid(pid),
                    });
                    return;
                }
                let process = self.trace.process_mut(p);
                process.flags |= OBJ_RESOLVED;
                process.creator = tid;
            }
            Err(e) => self.report(e),
        }
    }

    fn evt_thread_create(&mut self, ns: u64, tid: u32, new_tid: u32, pid: u32) {
        self.stats.threads_created += 1;
        if self.text {
            display::regular(ns, tid, format_args!("THRD_CREATE id={new_tid:08x} pid={pid:08x}"));
        }
        let thread = match self.trace.find_or_create_thread(new_tid) {
            Ok(t) => t,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        if self.trace.thread(thread).flags & OBJ_RESOLVED != 0 {
            self.report(TraceError::DoubleResolve { kind: ObjectKind::Thread, id: Koid(new_tid) });
        } else {
            let t = self.trace.thread_mut(thread);
            t.flags |= OBJ_RESOLVED;
            t.creator = tid;
        }
        let track = self.trace.thread(thread).track;
        match self.trace.find_or_create_process(pid) {
            Ok(p) => {
                let group = self.trace.process(p).group;
                self.trace.group_add_track(group, track);
            }
            Err(e) => self.report(e),
        }
    }

    // ---- message pipes and flow pairing -------------------------------

    fn evt_msgpipe_create(
        &mut self,
        ns: u64,
        ts: i64,
        tid: u32,
        track: TrackIdx,
        id: u32,
        otherid: u32,
        flags: u32,
    ) {
        self.stats.msgpipe_created += 2;
        if self.text {
            display::regular(
                ns,
                tid,
                format_args!("MPIP_CREATE id={id:08x} other={otherid:08x} flags={flags:x}"),
            );
        }
        let p0 = match self.trace.find_or_create_msgpipe(id) {
            Ok(p) => p,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        let p1 = match self.trace.find_or_create_msgpipe(otherid) {
            Ok(p) => p,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        if self.trace.pipe(p0).flags & OBJ_RESOLVED != 0 {
            self.report(TraceError::DoubleResolve { kind: ObjectKind::MsgPipe, id: Koid(id) });
            return;
        }
        if self.trace.pipe(p1).flags & OBJ_RESOLVED != 0 {
            self.report(TraceError::DoubleResolve { kind: ObjectKind::MsgPipe, id: Koid(otherid) });
            return;
        }
        {
            let end = self.trace.pipe_mut(p0);
            end.flags |= OBJ_RESOLVED;
            end.creator = tid;
            end.other = Some(p1);
        }
        {
            let end = self.trace.pipe_mut(p1);
            end.flags |= OBJ_RESOLVED;
            end.creator = tid;
            end.other = Some(p0);
        }
        let (_, ev) = self.trace.track_add_event(track, ts, u32::from(EVT_MSGPIPE_CREATE));
        ev.a = id;
        ev.b = otherid;
        ev.c = flags;
    }

    /// A write lands as an event on the writer's track and, when the
    /// pipe has a sibling, registers a descriptor on the **sibling's**
    /// pending queue: the next read over there consumes it.
    fn evt_msgpipe_write(
        &mut self,
        ns: u64,
        ts: i64,
        tid: u32,
        track: TrackIdx,
        id: u32,
        bytes: u32,
        handles: u32,
    ) {
        self.stats.msgpipe_writes += 1;
        if self.text {
            display::regular(
                ns,
                tid,
                format_args!("MPIP_WRITE  id={id:08x} bytes={bytes} handles={handles}"),
            );
        }
        let pipe = match self.trace.find_or_create_msgpipe(id) {
            Ok(p) => p,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        let (eventidx, ev) = self.trace.track_add_event(track, ts, u32::from(EVT_MSGPIPE_WRITE));
        ev.a = bytes;
        ev.b = handles;
        ev.c = id;
        match self.trace.pipe(pipe).other {
            None => self.report(TraceError::DanglingReference {
                id: Koid(id),
                context: "msgpipe write pairing",
            }),
            Some(sibling) => {
                let backlog = !self.trace.pipe(sibling).pending_writes.is_empty();
                if backlog && self.pair_policy == PairPolicy::DropOnBacklog {
                    self.stats.pair_drops += 1;
                } else {
                    self.trace
                        .pipe_mut(sibling)
                        .pending_writes
                        .push_back(MessageDescriptor { trackidx: track, eventidx });
                }
            }
        }
    }

    /// A read consumes the head of this endpoint's pending queue, if
    /// any, and stores the write's `(trackidx, eventidx)` as its
    /// cross-track reference. An empty queue leaves the read unpaired.
    fn evt_msgpipe_read(
        &mut self,
        ns: u64,
        ts: i64,
        tid: u32,
        track: TrackIdx,
        id: u32,
        bytes: u32,
        handles: u32,
    ) {
        self.stats.msgpipe_reads += 1;
        if self.text {
            display::regular(
                ns,
                tid,
                format_args!("MPIP_READ   id={id:08x} bytes={bytes} handles={handles}"),
            );
        }
        let pipe = match self.trace.find_or_create_msgpipe(id) {
            Ok(p) => p,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        if self.trace.pipe(pipe).other.is_none() {
            self.report(TraceError::DanglingReference {
                id: Koid(id),
                context: "msgpipe read pairing",
            });
        }
        let desc = self.trace.pipe_mut(pipe).pending_writes.pop_front();
        let (_, ev) = self.trace.track_add_event(track, ts, u32::from(EVT_MSGPIPE_READ));
        ev.a = bytes;
        ev.b = handles;
        ev.c = id;
        if let Some(desc) = desc {
            ev.trackidx = desc.trackidx;
            ev.eventidx = desc.eventidx;
        }
    }

    // ---- ports and handle waits ---------------------------------------

    fn evt_port_create(&mut self, ns: u64, tid: u32, id: u32) {
        self.stats.ports_created += 1;
        if self.text {
            display::regular(ns, tid, format_args!("PORT_CREATE id={id:08x}"));
        }
        match self.trace.find_or_create_port(id) {
            Ok(p) => {
                if self.trace.registry.ports[p].flags & OBJ_RESOLVED != 0 {
                    self.report(TraceError::DoubleResolve { kind: ObjectKind::Port, id: Koid(id) });
                    return;
                }
                let port = self.trace.port_mut(p);
                port.flags |= OBJ_RESOLVED;
                port.creator = tid;
            }
            Err(e) => self.report(e),
        }
    }

    fn evt_port_op(
        &mut self,
        evt: u16,
        ns: u64,
        ts: i64,
        tid: u32,
        track: TrackIdx,
        args: [u32; 4],
    ) {
        if self.text {
            display::regular(ns, tid, format_args!("{:<11} id={:08x}", evt_name(evt), args[0]));
        }
        let (_, ev) = self.trace.track_add_event(track, ts, u32::from(evt));
        ev.a = args[0];
        ev.b = args[1];
        ev.c = args[2];
        ev.d = args[3];
    }

    fn evt_wait_one(
        &mut self,
        evt: u16,
        ns: u64,
        ts: i64,
        tid: u32,
        track: TrackIdx,
        args: [u32; 4],
    ) {
        if self.text {
            if evt == EVT_WAIT_ONE {
                let timeout = u64::from(args[2]) | (u64::from(args[3]) << 32);
                display::regular(
                    ns,
                    tid,
                    format_args!(
                        "WAIT_ONE    id={:08x} signals={:08x} timeout={timeout}",
                        args[0], args[1]
                    ),
                );
            } else {
                display::regular(
                    ns,
                    tid,
                    format_args!(
                        "WAIT_DONE   id={:08x} pending={:08x} result={:08x}",
                        args[0], args[1], args[2]
                    ),
                );
            }
        }
        let (_, ev) = self.trace.track_add_event(track, ts, u32::from(evt));
        ev.a = args[0];
        ev.b = args[1];
        ev.c = args[2];
        ev.d = args[3];
    }

    // ---- probes -------------------------------------------------------

    /// User-defined point event; 16-byte probes carry no arguments,
    /// 24-byte probes carry two.
    fn evt_probe(
        &mut self,
        evt: u16,
        ns: u64,
        ts: i64,
        tid: u32,
        track: TrackIdx,
        a: u32,
        b: u32,
    ) {
        self.stats.probes += 1;
        if self.text {
            display::regular(ns, tid, format_args!("PROBE       n={:03x} a={a} b={b}", evt & 0x7FF));
        }
        let (_, ev) = self.trace.track_add_event(track, ts, u32::from(evt));
        ev.a = a;
        ev.b = b;
    }
}
