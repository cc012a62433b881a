//! Shared array facility.
//!
//! Every cell is an `AtomicI64` accessed with `Relaxed` ordering. Units never touch the same cell
//! within a phase, and the phase semaphores in [`crate::sync`] are what order one phase's writes
//! before the next phase's reads.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::{Facility, SortError};

/// Marks an unused bucket matrix cell.
pub const EMPTY: i64 = -1;

/// Fixed-size block of shared cells, indexable by position.
pub struct SharedArray {
    cells: Box<[AtomicI64]>,
}

impl SharedArray {
    /// Allocates `len` cells initialised to `fill`, reporting allocation failure instead of aborting.
    pub fn new(facility: Facility, len: usize, fill: i64) -> Result<Self, SortError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|source| SortError::Alloc { facility, source })?;
        cells.extend((0..len).map(|_| AtomicI64::new(fill)));
        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline(always)]
    pub fn read(&self, index: usize) -> i64 {
        self.cells[index].load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn write(&self, index: usize, value: i64) {
        self.cells[index].store(value, Ordering::Relaxed)
    }

    pub fn fill(&self, value: i64) {
        crate::scope!("SharedArray::fill");
        for cell in self.cells.iter() {
            cell.store(value, Ordering::Relaxed);
        }
    }

    /// Copies the current contents out. Only meaningful while no unit is writing.
    pub fn snapshot(&self) -> Vec<i64> {
        self.cells
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }
}

/// `rows x width` grid over one contiguous row-major [`SharedArray`].
///
/// Row `d` collects the values whose current digit is `d`. A value keeps the column of the
/// array position it was read from, so each row stays in array order and cells left at
/// [`EMPTY`] are skipped when the row is read back.
pub struct BucketMatrix {
    cells: SharedArray,
    rows: usize,
    width: usize,
}

impl BucketMatrix {
    pub fn new(rows: usize, width: usize) -> Result<Self, SortError> {
        let len = rows.checked_mul(width).ok_or(SortError::TooLarge {
            facility: Facility::Buckets,
        })?;
        Ok(Self {
            cells: SharedArray::new(Facility::Buckets, len, EMPTY)?,
            rows,
            width,
        })
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.width);
        self.width * row + col
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.cells.read(self.index(row, col))
    }

    #[inline(always)]
    pub fn set(&self, row: usize, col: usize, value: i64) {
        self.cells.write(self.index(row, col), value)
    }

    /// Non-empty cells of `row`, left to right.
    pub fn occupied(&self, row: usize) -> impl Iterator<Item = i64> + '_ {
        (0..self.width)
            .map(move |col| self.get(row, col))
            .filter(|&v| v != EMPTY)
    }

    /// Number of non-empty cells in `row`, found by scanning the whole row.
    pub fn occupancy(&self, row: usize) -> usize {
        self.occupied(row).count()
    }

    pub fn reset(&self) {
        crate::scope!("BucketMatrix::reset");
        self.cells.fill(EMPTY);
    }
}

/// Single shared cell: 0 while sorting continues, 1 once the coordinator has started the final
/// release.
pub struct DoneFlag {
    cell: SharedArray,
}

impl DoneFlag {
    pub fn new() -> Result<Self, SortError> {
        Ok(Self {
            cell: SharedArray::new(Facility::DoneFlag, 1, 0)?,
        })
    }

    #[inline(always)]
    pub fn is_set(&self) -> bool {
        self.cell.read(0) == 1
    }

    #[inline(always)]
    pub fn set(&self) {
        self.cell.write(0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_row_major() {
        let m = BucketMatrix::new(3, 4).unwrap();
        assert_eq!(m.index(0, 0), 0);
        assert_eq!(m.index(0, 3), 3);
        assert_eq!(m.index(1, 0), 4);
        assert_eq!(m.index(2, 3), 11);
    }

    #[test]
    fn occupancy_skips_sentinels() {
        let m = BucketMatrix::new(2, 5).unwrap();
        assert_eq!(m.occupancy(0), 0);
        m.set(0, 1, 7);
        m.set(0, 4, 0);
        m.set(1, 2, 3);
        assert_eq!(m.occupancy(0), 2);
        assert_eq!(m.occupied(0).collect::<Vec<_>>(), vec![7, 0]);
        assert_eq!(m.occupancy(1), 1);

        m.reset();
        assert_eq!(m.occupancy(0), 0);
        assert_eq!(m.occupancy(1), 0);
    }

    #[test]
    fn matrix_size_overflow_is_an_error() {
        assert!(matches!(
            BucketMatrix::new(usize::MAX, 2),
            Err(SortError::TooLarge {
                facility: Facility::Buckets
            })
        ));
    }

    #[test]
    fn done_flag_starts_clear() {
        let flag = DoneFlag::new().unwrap();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn array_read_write() {
        let a = SharedArray::new(Facility::Numbers, 3, 0).unwrap();
        a.write(2, 42);
        assert_eq!(a.snapshot(), vec![0, 0, 42]);
        a.fill(5);
        assert_eq!(a.read(1), 5);
        assert_eq!(a.len(), 3);
    }
}
