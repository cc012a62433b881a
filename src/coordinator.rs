use tracing::debug;

use crate::{
    error::SortError,
    sorter::SharedState,
    sync::{CoordinatorLink, OffsetAssignment, Phase},
};

/// Number of base-`base` digits in `max`, at least one.
pub fn pass_count(max: u64, base: u64) -> usize {
    debug_assert!(base > 1);
    let mut passes = 0;
    let mut rest = max;
    while rest > 0 {
        rest /= base;
        passes += 1;
    }
    passes.max(1)
}

/// Exclusive prefix sum: `sums[k] = counts[0] + .. + counts[k - 1]`.
#[inline]
pub fn get_prefix_sums(counts: &[usize]) -> Vec<usize> {
    crate::scope!("get_prefix_sums");
    let mut sums = vec![0usize; counts.len()];

    let mut running_total = 0;
    for (i, c) in counts.iter().enumerate() {
        sums[i] = running_total;
        running_total += c;
    }

    sums
}

/// Bucket counts and the offsets derived from them for one pass, indexed by worker id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassRecord {
    pub counts: Vec<usize>,
    pub offsets: Vec<usize>,
}

/// What the coordinator observed over a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorSummary {
    pub passes: Vec<PassRecord>,
    /// Full barrier rounds completed, including the final exit round.
    pub barrier_rounds: usize,
}

/// Drives the passes: barrier, collect, offsets, barrier, reset, release.
pub struct Coordinator {
    base: usize,
    passes: usize,
    n: usize,
}

impl Coordinator {
    pub fn new(base: usize, passes: usize, n: usize) -> Self {
        Self { base, passes, n }
    }

    /// Receives exactly one report per worker and orders the counts by worker id.
    fn collect_counts(
        &self,
        shared: &SharedState,
        link: &CoordinatorLink,
    ) -> Result<Vec<usize>, SortError> {
        let mut counts = vec![0usize; self.base];
        for _ in 0..self.base {
            let report = link.recv_report(&shared.sync)?;
            counts[report.worker_id] = report.bucket_count;
        }
        debug_assert_eq!(counts.iter().sum::<usize>(), self.n);
        Ok(counts)
    }

    pub fn run(
        self,
        shared: &SharedState,
        link: CoordinatorLink,
    ) -> Result<CoordinatorSummary, SortError> {
        let sync = &shared.sync;
        debug_assert_eq!(sync.participants(), self.base);
        let mut summary = CoordinatorSummary::default();

        for pass in 0..self.passes {
            crate::scope_print!("pass");
            // Every bucket is filled.
            sync.await_all()?;
            sync.release_all(Phase::Collect);

            let counts = self.collect_counts(shared, &link)?;
            let offsets = get_prefix_sums(&counts);
            for (worker_id, &start_offset) in offsets.iter().enumerate() {
                link.send_offset(OffsetAssignment {
                    worker_id,
                    start_offset,
                })?;
            }

            // Every bucket is written back.
            sync.await_all()?;
            summary.barrier_rounds += 1;

            // Must be visible before any worker re-checks its loop condition.
            if pass == self.passes - 1 {
                shared.done.set();
            }
            shared.buckets.reset();
            debug!(pass, ?counts, ?offsets, "pass complete");
            summary.passes.push(PassRecord { counts, offsets });

            sync.release_all(Phase::NextPass);
        }

        // Absorbs each worker's exit signal.
        sync.await_all()?;
        summary.barrier_rounds += 1;
        Ok(summary)
    }
}
