//! Synchronization facility: two counting-semaphore groups and the typed message channel.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use crate::error::{Facility, SortError};

/// How often a blocked receive re-checks whether the facility was closed.
const CLOSE_POLL: Duration = Duration::from_millis(20);

struct SemaphoreState {
    count: usize,
    closed: bool,
}

/// Counting semaphore. `wait` blocks until the count is positive, then decrements it.
pub struct Semaphore {
    state: Mutex<SemaphoreState>,
    cvar: Condvar,
}

impl Default for Semaphore {
    fn default() -> Self {
        Self {
            state: Mutex::new(SemaphoreState {
                count: 0,
                closed: false,
            }),
            cvar: Condvar::new(),
        }
    }
}

impl Semaphore {
    // A panicking unit closes the facility on its way out, so a poisoned lock carries no broken
    // invariant worth propagating.
    fn lock(&self) -> MutexGuard<'_, SemaphoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn signal(&self) {
        let mut state = self.lock();
        state.count += 1;
        self.cvar.notify_one();
    }

    /// Returns `false` if the semaphore was closed instead of signaled.
    pub fn wait(&self) -> bool {
        let mut state = self.lock();
        while state.count == 0 && !state.closed {
            state = self.cvar.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        if state.closed {
            return false;
        }
        state.count -= 1;
        true
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.cvar.notify_all();
    }

    #[cfg(test)]
    fn count(&self) -> usize {
        self.lock().count
    }
}

/// Fixed set of semaphores addressed by member index.
pub struct SemaphoreGroup {
    facility: Facility,
    members: Vec<Semaphore>,
}

impl SemaphoreGroup {
    pub fn new(facility: Facility, size: usize) -> Self {
        Self {
            facility,
            members: (0..size).map(|_| Semaphore::default()).collect(),
        }
    }

    #[inline(always)]
    pub fn signal(&self, member: usize) {
        self.members[member].signal()
    }

    #[inline(always)]
    pub fn wait(&self, member: usize) -> Result<(), SortError> {
        if self.members[member].wait() {
            Ok(())
        } else {
            Err(SortError::FacilityClosed(self.facility))
        }
    }

    pub fn close(&self) {
        for member in &self.members {
            member.close();
        }
    }
}

/// The two points per pass at which the coordinator releases workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Phase {
    /// Buckets are filled, workers may count and report.
    Collect = 0,
    /// Write-back is done and the matrix is reset, workers may start the next pass.
    NextPass = 1,
}

/// Phase handshakes between the workers and the coordinator.
pub struct PhaseSync {
    participants: usize,
    // Signaled by workers, one member.
    worker_done: SemaphoreGroup,
    // Signaled by the coordinator, one member per `Phase`.
    release: SemaphoreGroup,
    closed: AtomicBool,
}

impl PhaseSync {
    pub fn new(participants: usize) -> Self {
        Self {
            participants,
            worker_done: SemaphoreGroup::new(Facility::WorkerSemaphores, 1),
            release: SemaphoreGroup::new(Facility::CoordinatorSemaphores, 2),
            closed: AtomicBool::new(false),
        }
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Worker side: announce the end of a phase, then block until released into `next`.
    pub fn arrive_and_wait(&self, next: Phase) -> Result<(), SortError> {
        self.arrive();
        self.release.wait(next as usize)
    }

    /// Worker side: announce the end of a phase without waiting.
    pub fn arrive(&self) {
        self.worker_done.signal(0);
    }

    /// Coordinator side: block until every worker has arrived.
    pub fn await_all(&self) -> Result<(), SortError> {
        for _ in 0..self.participants {
            self.worker_done.wait(0)?;
        }
        Ok(())
    }

    /// Coordinator side: let every worker through `phase`.
    pub fn release_all(&self, phase: Phase) {
        for _ in 0..self.participants {
            self.release.signal(phase as usize);
        }
    }

    /// Wakes every blocked unit with [`SortError::FacilityClosed`]. Used when a unit fails so the
    /// rest of the run unwinds instead of waiting forever.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.worker_done.close();
        self.release.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Sent worker to coordinator once per pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub worker_id: usize,
    pub bucket_count: usize,
}

/// Sent coordinator to worker once per pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetAssignment {
    pub worker_id: usize,
    pub start_offset: usize,
}

/// Coordinator end of the message channel.
pub struct CoordinatorLink {
    reports: Receiver<PassReport>,
    offsets: Vec<Sender<OffsetAssignment>>,
}

/// Worker end of the message channel. Offsets are addressed to one worker id only.
pub struct WorkerLink {
    id: usize,
    reports: Sender<PassReport>,
    offsets: Receiver<OffsetAssignment>,
}

/// Creates the channel for `workers` workers: one shared report queue, one offset queue per id.
pub fn message_channel(workers: usize) -> (CoordinatorLink, Vec<WorkerLink>) {
    let (report_tx, report_rx) = channel();
    let mut offsets = Vec::with_capacity(workers);
    let mut links = Vec::with_capacity(workers);
    for id in 0..workers {
        let (tx, rx) = channel();
        offsets.push(tx);
        links.push(WorkerLink {
            id,
            reports: report_tx.clone(),
            offsets: rx,
        });
    }
    (
        CoordinatorLink {
            reports: report_rx,
            offsets,
        },
        links,
    )
}

fn recv_unless_closed<T>(
    rx: &Receiver<T>,
    sync: &PhaseSync,
    facility: Facility,
) -> Result<T, SortError> {
    loop {
        match rx.recv_timeout(CLOSE_POLL) {
            Ok(msg) => return Ok(msg),
            Err(RecvTimeoutError::Timeout) if !sync.is_closed() => continue,
            Err(_) => return Err(SortError::FacilityClosed(facility)),
        }
    }
}

impl CoordinatorLink {
    pub fn recv_report(&self, sync: &PhaseSync) -> Result<PassReport, SortError> {
        recv_unless_closed(&self.reports, sync, Facility::ReportChannel)
    }

    pub fn send_offset(&self, msg: OffsetAssignment) -> Result<(), SortError> {
        self.offsets[msg.worker_id]
            .send(msg)
            .map_err(|_| SortError::FacilityClosed(Facility::OffsetChannel))
    }
}

impl WorkerLink {
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn send_report(&self, bucket_count: usize) -> Result<(), SortError> {
        self.reports
            .send(PassReport {
                worker_id: self.id,
                bucket_count,
            })
            .map_err(|_| SortError::FacilityClosed(Facility::ReportChannel))
    }

    pub fn recv_offset(&self, sync: &PhaseSync) -> Result<OffsetAssignment, SortError> {
        let msg = recv_unless_closed(&self.offsets, sync, Facility::OffsetChannel)?;
        debug_assert_eq!(msg.worker_id, self.id);
        Ok(msg)
    }
}
