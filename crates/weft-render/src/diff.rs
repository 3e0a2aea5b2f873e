#![forbid(unsafe_code)]

//! Dirty-run extraction between two buffers.
//!
//! [`DirtyRuns`] compares the last flushed frame (`front`) against the frame
//! just drawn (`back`), visiting only rows whose dirty bit is set in `back`.
//! Changed cells on a row are coalesced into [`ChangeRun`]s so the sink can
//! position once and write the run.
//!
//! # Usage
//!
//! ```
//! use weft_render::buffer::CellBuffer;
//! use weft_render::cell::Cell;
//! use weft_render::diff::DirtyRuns;
//!
//! let front = CellBuffer::new(80, 24);
//! let mut back = front.clone();
//! back.clear_dirty();
//!
//! back.set(5, 5, Cell::from_char('X'));
//! back.set(6, 5, Cell::from_char('Y'));
//!
//! let runs = DirtyRuns::compute(&front, &back);
//! assert_eq!(runs.cell_count(), 2);
//! assert_eq!(runs.len(), 1); // Adjacent cells form one run
//! ```

use crate::buffer::CellBuffer;

/// A contiguous run of changed cells on a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRun {
    /// Row index.
    pub y: u16,
    /// Start column (inclusive).
    pub x0: u16,
    /// End column (inclusive).
    pub x1: u16,
}

impl ChangeRun {
    /// Create a new change run.
    #[inline]
    pub const fn new(y: u16, x0: u16, x1: u16) -> Self {
        debug_assert!(x0 <= x1);
        Self { y, x0, x1 }
    }

    /// Number of cells in this run.
    #[inline]
    pub const fn len(&self) -> u16 {
        self.x1 - self.x0 + 1
    }

    /// Check if this run is empty (should never happen in practice).
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x1 < self.x0
    }
}

/// Changed runs between two same-sized buffers.
#[derive(Debug, Clone, Default)]
pub struct DirtyRuns {
    runs: Vec<ChangeRun>,
    cells: usize,
}

impl DirtyRuns {
    /// Create an empty set of runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the runs that turn `front` into `back`.
    ///
    /// Only rows marked dirty in `back` are scanned.
    pub fn compute(front: &CellBuffer, back: &CellBuffer) -> Self {
        let mut runs = Self::new();
        runs.compute_into(front, back);
        runs
    }

    /// Like [`DirtyRuns::compute`], reusing this value's allocation.
    ///
    /// # Panics
    ///
    /// Debug-asserts that both buffers have identical dimensions.
    pub fn compute_into(&mut self, front: &CellBuffer, back: &CellBuffer) {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "dirty_runs",
            width = back.width(),
            dirty_rows = back.dirty_row_count()
        );
        #[cfg(feature = "tracing")]
        let _guard = _span.enter();

        debug_assert_eq!(front.width(), back.width(), "buffer widths must match");
        debug_assert_eq!(front.height(), back.height(), "buffer heights must match");

        self.runs.clear();
        self.cells = 0;

        for y in back.dirty_rows() {
            let old = front.row_cells(y);
            let new = back.row_cells(y);
            let mut x = 0usize;
            while x < new.len() {
                if old[x].bits_eq(&new[x]) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < new.len() && !old[x].bits_eq(&new[x]) {
                    x += 1;
                }
                self.push_run(back, y, start as u16, (x - 1) as u16);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(runs = self.runs.len(), cells = self.cells, "dirty runs computed");
    }

    /// One run per row covering the whole buffer (full repaint).
    pub fn full(back: &CellBuffer) -> Self {
        let runs: Vec<ChangeRun> = (0..back.height())
            .map(|y| ChangeRun::new(y, 0, back.width() - 1))
            .collect();
        Self {
            cells: back.len(),
            runs,
        }
    }

    /// Record a run, widening it left so it never starts on the tail of a
    /// wide character.
    fn push_run(&mut self, back: &CellBuffer, y: u16, mut x0: u16, x1: u16) {
        while x0 > 0 && back.get(x0, y).is_some_and(|c| c.is_continuation()) {
            x0 -= 1;
        }
        if let Some(last) = self.runs.last_mut()
            && last.y == y
            && last.x1 + 1 >= x0
        {
            self.cells += (x1 - last.x1) as usize;
            last.x1 = x1;
            return;
        }
        let run = ChangeRun::new(y, x0, x1);
        self.cells += run.len() as usize;
        self.runs.push(run);
    }

    /// Number of runs.
    #[inline]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Check if nothing changed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total cells covered by all runs.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells
    }

    /// The runs, ordered by row then column.
    #[inline]
    pub fn runs(&self) -> &[ChangeRun] {
        &self.runs
    }

    /// Iterate over the runs.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = ChangeRun> + '_ {
        self.runs.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, PackedRgba};

    fn pair(width: u16, height: u16) -> (CellBuffer, CellBuffer) {
        let front = CellBuffer::new(width, height);
        let mut back = front.clone();
        back.clear_dirty();
        (front, back)
    }

    #[test]
    fn identical_buffers_have_no_runs() {
        let (front, back) = pair(10, 10);
        let runs = DirtyRuns::compute(&front, &back);
        assert!(runs.is_empty());
        assert_eq!(runs.cell_count(), 0);
    }

    #[test]
    fn scattered_changes_make_separate_runs() {
        let (front, mut back) = pair(10, 10);
        back.set(0, 0, Cell::from_char('A'));
        back.set(9, 9, Cell::from_char('B'));
        back.set(5, 3, Cell::from_char('C'));

        let runs = DirtyRuns::compute(&front, &back);
        assert_eq!(
            runs.runs(),
            &[
                ChangeRun::new(0, 0, 0),
                ChangeRun::new(3, 5, 5),
                ChangeRun::new(9, 9, 9)
            ]
        );
    }

    #[test]
    fn gap_splits_runs_on_same_row() {
        let (front, mut back) = pair(10, 1);
        back.set(1, 0, Cell::from_char('a'));
        back.set(2, 0, Cell::from_char('b'));
        back.set(6, 0, Cell::from_char('c'));
        let runs = DirtyRuns::compute(&front, &back);
        assert_eq!(
            runs.runs(),
            &[ChangeRun::new(0, 1, 2), ChangeRun::new(0, 6, 6)]
        );
        assert_eq!(runs.cell_count(), 3);
    }

    #[test]
    fn clean_rows_are_not_scanned() {
        let (front, mut back) = pair(4, 2);
        back.set(0, 1, Cell::from_char('x'));
        back.clear_dirty();
        // Row 1 differs from front but is no longer dirty.
        assert!(DirtyRuns::compute(&front, &back).is_empty());
    }

    #[test]
    fn color_only_change_detected() {
        let (front, mut back) = pair(4, 1);
        back.set(2, 0, Cell::BLANK.with_bg(PackedRgba::BLUE));
        let runs = DirtyRuns::compute(&front, &back);
        assert_eq!(runs.runs(), &[ChangeRun::new(0, 2, 2)]);
    }

    #[test]
    fn run_includes_wide_head() {
        let (mut front, mut back) = pair(6, 1);
        front.set(2, 0, Cell::from_char('中'));
        back.set(2, 0, Cell::from_char('中').with_fg(PackedRgba::RED));
        let runs = DirtyRuns::compute(&front, &back);
        assert_eq!(runs.runs(), &[ChangeRun::new(0, 2, 2)]);
    }

    #[test]
    fn full_covers_every_row() {
        let back = CellBuffer::new(3, 4);
        let runs = DirtyRuns::full(&back);
        assert_eq!(runs.len(), 4);
        assert_eq!(runs.cell_count(), 12);
        assert!(runs.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn compute_into_reuses_and_resets() {
        let (front, mut back) = pair(4, 1);
        back.set(0, 0, Cell::from_char('q'));
        let mut runs = DirtyRuns::new();
        runs.compute_into(&front, &back);
        assert_eq!(runs.len(), 1);
        runs.compute_into(&front, &front);
        assert!(runs.is_empty());
    }
}
