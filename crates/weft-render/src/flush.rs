#![forbid(unsafe_code)]

//! Flush: hand dirty runs to an output sink.
//!
//! The [`Flusher`] owns a copy of the last flushed frame. Each call to
//! [`Flusher::flush`] diffs the dirty rows of the drawn buffer against that
//! copy, passes the changed runs to a [`CellSink`], syncs the copy and clears
//! the buffer's dirty flags. A size change (or the first flush) repaints
//! every row.
//!
//! Escape-sequence generation lives in the sink; this layer only decides
//! *what* to send.

use std::io;

use crate::buffer::CellBuffer;
use crate::cell::Cell;
use crate::diff::DirtyRuns;

/// Destination for flushed cells (a terminal writer, a test harness...).
pub trait CellSink {
    /// Called once before any runs of a frame.
    fn begin_frame(&mut self, _width: u16, _height: u16) -> io::Result<()> {
        Ok(())
    }

    /// Write `cells` starting at column `x` of row `y`.
    fn write_run(&mut self, x: u16, y: u16, cells: &[Cell]) -> io::Result<()>;

    /// Called once after the last run of a frame.
    fn end_frame(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counters from one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Runs handed to the sink.
    pub runs: usize,
    /// Cells handed to the sink.
    pub cells: usize,
    /// Whether the whole frame was repainted.
    pub full_repaint: bool,
}

/// Tracks the last flushed frame and emits only what changed.
#[derive(Debug, Default)]
pub struct Flusher {
    front: Option<CellBuffer>,
    runs: DirtyRuns,
}

impl Flusher {
    /// Create a flusher whose first flush repaints everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the last frame so the next flush repaints everything.
    pub fn invalidate(&mut self) {
        self.front = None;
    }

    /// Send the changes in `back` to `sink` and clear its dirty flags.
    ///
    /// On error the dirty flags are left set, so a retry resends the rows.
    pub fn flush<S: CellSink + ?Sized>(
        &mut self,
        back: &mut CellBuffer,
        sink: &mut S,
    ) -> io::Result<FlushStats> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "flush",
            width = back.width(),
            height = back.height(),
            dirty_rows = back.dirty_row_count()
        );
        #[cfg(feature = "tracing")]
        let _guard = _span.enter();

        let full_repaint = !matches!(
            &self.front,
            Some(front) if front.width() == back.width() && front.height() == back.height()
        );

        if full_repaint {
            self.runs = DirtyRuns::full(back);
        } else if let Some(front) = &self.front {
            self.runs.compute_into(front, back);
        }

        sink.begin_frame(back.width(), back.height())?;
        for run in self.runs.iter() {
            let row = back.row_cells(run.y);
            sink.write_run(run.x0, run.y, &row[run.x0 as usize..=run.x1 as usize])?;
        }
        sink.end_frame()?;

        if full_repaint {
            self.front = Some(back.clone());
        } else if let Some(front) = &mut self.front {
            for run in self.runs.iter() {
                front.blit(back, run.x0, run.y, run.x0, run.y, run.len(), 1);
            }
        }
        back.clear_dirty();

        let stats = FlushStats {
            runs: self.runs.len(),
            cells: self.runs.cell_count(),
            full_repaint,
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(
            runs = stats.runs,
            cells = stats.cells,
            full_repaint,
            "frame flushed"
        );

        Ok(stats)
    }
}
