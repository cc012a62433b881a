use std::ops::RangeInclusive;

use tracing::trace;

use crate::{
    error::SortError,
    shared::EMPTY,
    sorter::SharedState,
    sync::{Phase, WorkerLink},
};

/// Positions of the numeric array worker `id` reads every pass, or `None` if it is idle.
///
/// The array is split into `base` equal windows with the last one absorbing the remainder. With
/// fewer elements than workers, worker `id` owns position `id` alone and workers past the end own
/// nothing.
pub fn scan_window(id: usize, n: usize, base: usize) -> Option<RangeInclusive<usize>> {
    debug_assert!(id < base);
    if n == 0 {
        return None;
    }
    if n < base {
        return (id < n).then_some(id..=id);
    }
    let step = n / base;
    let begin = step * id;
    let end = if id == base - 1 {
        n - 1
    } else {
        step * (id + 1) - 1
    };
    Some(begin..=end)
}

/// What a worker saw over its lifetime, returned once it exits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub id: usize,
    /// Number of values this worker deposited into the matrix, per pass.
    pub scanned: Vec<usize>,
    /// Number of values this worker wrote back into the numeric array, per pass.
    pub written: Vec<usize>,
}

/// One per digit value. Scans a fixed window, deposits by digit, then collects and writes back
/// the bucket row matching its id.
pub struct Worker {
    id: usize,
    base: u64,
    window: Option<RangeInclusive<usize>>,
    divisor: u64,
}

impl Worker {
    pub fn new(id: usize, n: usize, base: usize) -> Self {
        Self {
            id,
            base: base as u64,
            window: scan_window(id, n, base),
            divisor: 1,
        }
    }

    /// Extracts the digit of `value` selected by the current divisor.
    #[inline(always)]
    fn digit(&self, value: i64) -> usize {
        ((value as u64 / self.divisor) % self.base) as usize
    }

    /// Deposits every value of the window into the matrix row of its digit, at the column of its
    /// array position. Returns the number of values deposited.
    fn distribute(&self, shared: &SharedState) -> usize {
        crate::scope!("Worker::distribute");
        let Some(window) = self.window.clone() else {
            return 0;
        };
        let mut deposited = 0;
        let mut col = *window.start();
        for i in window {
            let value = shared.numbers.read(i);
            debug_assert_ne!(value, EMPTY);
            shared.buckets.set(self.digit(value), col, value);
            col += 1;
            deposited += 1;
        }
        deposited
    }

    /// Writes the occupied cells of this worker's row back into the array from `offset` on.
    fn write_back(&self, shared: &SharedState, offset: usize) -> usize {
        crate::scope!("Worker::write_back");
        let mut cursor = offset;
        for value in shared.buckets.occupied(self.id) {
            shared.numbers.write(cursor, value);
            cursor += 1;
        }
        cursor - offset
    }

    /// Runs the worker until the coordinator raises the completion flag.
    pub fn run(
        mut self,
        shared: &SharedState,
        link: WorkerLink,
    ) -> Result<WorkerSummary, SortError> {
        debug_assert_eq!(link.id(), self.id);
        let sync = &shared.sync;
        let mut summary = WorkerSummary {
            id: self.id,
            ..Default::default()
        };

        while !shared.done.is_set() {
            summary.scanned.push(self.distribute(shared));
            self.divisor = self.divisor.saturating_mul(self.base);

            sync.arrive_and_wait(Phase::Collect)?;

            let count = shared.buckets.occupancy(self.id);
            link.send_report(count)?;
            let assignment = link.recv_offset(sync)?;
            let written = self.write_back(shared, assignment.start_offset);
            debug_assert_eq!(written, count);
            trace!(
                worker = self.id,
                count,
                offset = assignment.start_offset,
                "wrote bucket back"
            );
            summary.written.push(written);

            sync.arrive_and_wait(Phase::NextPass)?;
        }

        // Balances the coordinator's final barrier.
        sync.arrive();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_cover_the_array_once() {
        for base in 2..9 {
            for n in 1..40 {
                let mut covered = vec![0u32; n];
                for id in 0..base {
                    if let Some(w) = scan_window(id, n, base) {
                        for i in w {
                            covered[i] += 1;
                        }
                    }
                }
                assert!(covered.iter().all(|&c| c == 1), "base {base} n {n}");
            }
        }
    }

    #[test]
    fn last_window_takes_remainder() {
        assert_eq!(scan_window(0, 10, 3), Some(0..=2));
        assert_eq!(scan_window(1, 10, 3), Some(3..=5));
        assert_eq!(scan_window(2, 10, 3), Some(6..=9));
    }

    #[test]
    fn small_arrays_leave_high_ids_idle() {
        assert_eq!(scan_window(0, 3, 10), Some(0..=0));
        assert_eq!(scan_window(2, 3, 10), Some(2..=2));
        assert_eq!(scan_window(3, 3, 10), None);
        assert_eq!(scan_window(9, 3, 10), None);
    }

    #[test]
    fn digit_follows_divisor() {
        let mut w = Worker::new(0, 4, 10);
        assert_eq!(w.digit(54), 4);
        w.divisor = 10;
        assert_eq!(w.digit(54), 5);
        w.divisor = 100;
        assert_eq!(w.digit(54), 0);
    }
}
