use std::{
    fmt,
    sync::atomic::{AtomicU32, Ordering},
    thread,
    time::Instant,
};

use tracing::{info, trace};

use crate::{
    coordinator::{pass_count, Coordinator, CoordinatorSummary, PassRecord},
    error::{Facility, SortError},
    par::{Scheduler, Unit},
    shared::{BucketMatrix, DoneFlag, SharedArray},
    sync::{message_channel, PhaseSync},
    worker::{Worker, WorkerSummary},
    PrettyDuration,
};

static UNIT_SCHEDULER: AtomicU32 = AtomicU32::new(0);

/// Scheduler used by [`sort`].
pub fn unit_scheduler() -> Scheduler {
    Scheduler::from(UNIT_SCHEDULER.load(Ordering::Relaxed))
}

pub fn set_unit_scheduler(scheduler: Scheduler) {
    UNIT_SCHEDULER.store(scheduler as u32, Ordering::Relaxed);
}

/// The three facilities every unit can see. Nothing else is shared between units.
pub struct SharedState {
    pub numbers: SharedArray,
    pub buckets: BucketMatrix,
    pub done: DoneFlag,
    pub sync: PhaseSync,
}

impl SharedState {
    /// Creates every facility for a run over `values` with `base` workers. Anything allocated
    /// before a failure is released on return.
    pub fn new(base: usize, values: &[i64]) -> Result<Self, SortError> {
        crate::scope_print_major!("SharedState::new");
        let numbers = SharedArray::new(Facility::Numbers, values.len(), 0)?;
        for (i, &v) in values.iter().enumerate() {
            numbers.write(i, v);
        }
        Ok(Self {
            numbers,
            buckets: BucketMatrix::new(base, values.len())?,
            done: DoneFlag::new()?,
            sync: PhaseSync::new(base),
        })
    }
}

/// Result of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOutcome {
    pub sorted: Vec<u64>,
    /// Counts and offsets per pass, in pass order.
    pub passes: Vec<PassRecord>,
    pub barrier_rounds: usize,
    /// Per worker, indexed by worker id.
    pub workers: Vec<WorkerSummary>,
}

/// Formats a sorted array as the single result line.
pub struct SortedArray<'a>(pub &'a [u64]);

impl fmt::Display for SortedArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sorted array:")?;
        for v in self.0 {
            write!(f, " {v}")?;
        }
        Ok(())
    }
}

enum UnitSummary {
    Worker(WorkerSummary),
    Coordinator(CoordinatorSummary),
}

/// Closes the phase handshakes if the owning unit unwinds, so nobody waits on it forever.
struct CloseOnPanic<'a>(&'a PhaseSync);

impl Drop for CloseOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.close();
        }
    }
}

/// Sorts `values` in base `base` on the scheduler chosen with [`set_unit_scheduler`].
pub fn sort(base: usize, values: &[u64]) -> Result<SortOutcome, SortError> {
    sort_with(base, values, unit_scheduler())
}

/// Sorts `values` with `base` worker units and one coordinator running on `scheduler`.
pub fn sort_with(
    base: usize,
    values: &[u64],
    scheduler: Scheduler,
) -> Result<SortOutcome, SortError> {
    crate::scope_print_major!("sort");
    if base < 2 {
        return Err(SortError::InvalidBase(base));
    }
    if values.is_empty() {
        return Err(SortError::Empty);
    }
    let cells = values
        .iter()
        .map(|&v| i64::try_from(v).map_err(|_| SortError::KeyOutOfRange(v)))
        .collect::<Result<Vec<_>, _>>()?;

    let n = values.len();
    let max = values.iter().copied().max().unwrap_or(0);
    let passes = pass_count(max, base as u64);
    info!(base, n, passes, ?scheduler, "sorting");
    let start = Instant::now();

    let shared = SharedState::new(base, &cells)?;
    let (coordinator_link, worker_links) = message_channel(base);

    let mut units = Vec::with_capacity(base + 1);
    {
        let shared = &shared;
        for link in worker_links {
            let id = link.id();
            units.push(Unit::new(format!("radix-worker-{id}"), move || {
                let _guard = CloseOnPanic(&shared.sync);
                trace!(worker = id, "started");
                Worker::new(id, n, base)
                    .run(shared, link)
                    .map(UnitSummary::Worker)
                    .inspect_err(|_| shared.sync.close())
            }));
        }
        units.push(Unit::new("radix-coordinator", move || {
            let _guard = CloseOnPanic(&shared.sync);
            Coordinator::new(base, passes, n)
                .run(shared, coordinator_link)
                .map(UnitSummary::Coordinator)
                .inspect_err(|_| shared.sync.close())
        }));
    }

    let results = scheduler.run_units(units, &|| shared.sync.close())?;

    let mut workers = Vec::with_capacity(base);
    let mut coordinator = None;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(UnitSummary::Worker(w)) => workers.push(w),
            Ok(UnitSummary::Coordinator(c)) => coordinator = Some(c),
            // A closed facility is a consequence, keep looking for the cause.
            Err(err @ SortError::FacilityClosed(_)) => {
                first_error.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }
    let coordinator = coordinator.ok_or(SortError::MissingResult {
        unit: "radix-coordinator".to_string(),
    })?;

    let sorted = shared
        .numbers
        .snapshot()
        .into_iter()
        .map(|v| v as u64)
        .collect();
    info!(elapsed = %PrettyDuration(start.elapsed()), "sorted");

    Ok(SortOutcome {
        sorted,
        passes: coordinator.passes,
        barrier_rounds: coordinator.barrier_rounds,
        workers,
    })
}
